use crate::acquisition::{AcquisitionSettings, TextAcquirer};
use crate::heuristics::{AnalyteRule, ContaminantExtractor, PatternError};
use crate::ocr::OcrSettings;
use crate::scoring::{LimitsTable, WaterMainInput, reference_limits};
use serde::Deserialize;
use std::{fs, path::Path};

/// Where the binary looks when no config path is given.
pub const DEFAULT_CONFIG_PATH: &str = ".config/clear_report.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Replaces the reference limits entirely when present.
    pub limits: LimitsTable,
    pub water_main: WaterMainInput,
    pub acquisition: AcquisitionSettings,
    pub ocr: OcrSettings,
    /// Replaces the built-in analyte table when present.
    pub analytes: Option<Vec<AnalyteRule>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            limits: reference_limits(),
            water_main: WaterMainInput::default(),
            acquisition: AcquisitionSettings::default(),
            ocr: OcrSettings::default(),
            analytes: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("limit for {name:?} must be a positive number, got {value}")]
    InvalidLimit { name: String, value: f64 },
    #[error(transparent)]
    Analytes(#[from] PatternError),
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let cfg: Config = toml::from_str(content)?;
        for (name, &value) in &cfg.limits {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidLimit {
                    name: name.clone(),
                    value,
                });
            }
        }
        Ok(cfg)
    }

    /// The analyte table in effect: the configured one or the built-in.
    pub fn extractor(&self) -> Result<ContaminantExtractor, ConfigError> {
        match &self.analytes {
            Some(rules) => Ok(ContaminantExtractor::new(rules)?),
            None => Ok(ContaminantExtractor::builtin().clone()),
        }
    }

    /// A text acquirer backed by the configured command-line OCR tools.
    pub fn acquirer(&self) -> TextAcquirer {
        TextAcquirer::with_cli_tools(&self.ocr, self.acquisition.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::Material;

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg = Config::from_toml("").unwrap();
        assert_eq!(cfg.limits, reference_limits());
        assert_eq!(cfg.water_main, WaterMainInput::default());
        assert_eq!(cfg.acquisition, AcquisitionSettings::default());
        assert_eq!(cfg.ocr, OcrSettings::default());
        assert_eq!(cfg.extractor().unwrap().names().count(), 7);
    }

    #[test]
    fn test_full_config() {
        let cfg = Config::from_toml(
            r#"
            [limits]
            "Lead (ppm)" = 0.01
            "Radon (pCi/L)" = 4

            [water_main]
            age_years = 75
            material = "galvanized"

            [acquisition]
            raster_scale = 3.0

            [ocr]
            tesseract_bin = "/opt/tesseract/bin/tesseract"

            [[analytes]]
            name = "Lead (ppm)"
            label = "Lead"
            unit = "ppm"

            [[analytes]]
            name = "Radon (pCi/L)"
            label = "Radon"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.limits.len(), 2);
        assert_eq!(cfg.limits["Radon (pCi/L)"], 4.0);
        assert_eq!(cfg.water_main.material, Material::Galvanized);
        assert_eq!(cfg.water_main.upgraded_pct, 10.0);
        assert_eq!(cfg.acquisition.raster_scale, 3.0);
        assert_eq!(cfg.acquisition.min_text_chars, 50);
        assert_eq!(cfg.ocr.language, "eng");

        let values = cfg.extractor().unwrap().extract("Radon: 5.5 and Lead 0.2 ppm");
        assert_eq!(values.get("Radon (pCi/L)"), Some(5.5));
        assert_eq!(values.get("Lead (ppm)"), Some(0.2));
    }

    #[test]
    fn test_non_positive_limit_rejected() {
        let err = Config::from_toml("[limits]\npH = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLimit { .. }));
    }

    #[test]
    fn test_duplicate_analyte_rejected() {
        let cfg = Config::from_toml(
            r#"
            [[analytes]]
            name = "pH"
            label = "pH"

            [[analytes]]
            name = "pH"
            label = "acidity"
            "#,
        )
        .unwrap();
        assert!(matches!(
            cfg.extractor(),
            Err(ConfigError::Analytes(PatternError::DuplicateName(_)))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load("/nonexistent/clear_report.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
