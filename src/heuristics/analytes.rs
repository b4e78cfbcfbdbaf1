use super::{ParsedValues, PatternError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;

/// Concentration unit that must follow a reading for the label to count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Ppm,
    Ppb,
    Ppt,
}

impl Unit {
    pub fn token(self) -> &'static str {
        match self {
            Unit::Ppm => "ppm",
            Unit::Ppb => "ppb",
            Unit::Ppt => "ppt",
        }
    }
}

/// One row of the analyte table, as written in code or in the config file.
///
/// `label` is a regex fragment (plain words in practice) matched
/// case-insensitively in front of the reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyteRule {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub unit: Option<Unit>,
}

// Enumeration order of ParsedValues follows this table.
const BUILTIN_ANALYTES: &[(&str, &str, Option<Unit>)] = &[
    ("Lead (ppm)", "Lead", Some(Unit::Ppm)),
    ("Copper (ppm)", "Copper", Some(Unit::Ppm)),
    ("Nitrate (ppm)", "Nitrate", Some(Unit::Ppm)),
    ("Arsenic (ppb)", "Arsenic", Some(Unit::Ppb)),
    ("PFOA (ppt)", "PFOA", Some(Unit::Ppt)),
    ("PFOS (ppt)", "PFOS", Some(Unit::Ppt)),
    ("pH", "pH", None),
];

/// The built-in analyte table.
pub fn builtin_rules() -> Vec<AnalyteRule> {
    BUILTIN_ANALYTES
        .iter()
        .map(|&(name, label, unit)| AnalyteRule {
            name: name.to_string(),
            label: label.to_string(),
            unit,
        })
        .collect()
}

/// A compiled table row.
#[derive(Debug, Clone)]
pub struct AnalytePattern {
    pub name: String,
    regex: Regex,
}

impl AnalytePattern {
    fn compile(rule: &AnalyteRule) -> Result<Self, PatternError> {
        // label, optional ':' or '-' separator, the reading, then the unit if any.
        // ASCII digits only: `\d` would also take other scripts' digits,
        // which f64 parsing rejects.
        let mut pattern = format!(r"(?i)(?:{})\s*[:\-]?\s*([0-9]+\.?[0-9]*)", rule.label);
        if let Some(unit) = rule.unit {
            pattern.push_str(r"\s*");
            pattern.push_str(&regex::escape(unit.token()));
        }

        let regex = Regex::new(&pattern).map_err(|source| PatternError::InvalidLabel {
            name: rule.name.clone(),
            source,
        })?;

        Ok(Self {
            name: rule.name.clone(),
            regex,
        })
    }

    /// First reading for this analyte in `text`, if any.
    pub fn find(&self, text: &str) -> Option<f64> {
        let caps = self.regex.captures(text)?;
        caps.get(1)?.as_str().parse::<f64>().ok()
    }
}

/// Ordered table of independent single-pass searches.
#[derive(Debug, Clone)]
pub struct ContaminantExtractor {
    patterns: Vec<AnalytePattern>,
}

static BUILTIN: LazyLock<ContaminantExtractor> = LazyLock::new(|| {
    ContaminantExtractor::new(&builtin_rules()).expect("built-in analyte table must compile")
});

impl ContaminantExtractor {
    pub fn new(rules: &[AnalyteRule]) -> Result<Self, PatternError> {
        let mut seen = HashSet::new();
        let mut patterns = Vec::with_capacity(rules.len());

        for rule in rules {
            if !seen.insert(rule.name.as_str()) {
                return Err(PatternError::DuplicateName(rule.name.clone()));
            }
            patterns.push(AnalytePattern::compile(rule)?);
        }

        Ok(Self { patterns })
    }

    /// Extractor over the built-in table, compiled once per process.
    pub fn builtin() -> &'static ContaminantExtractor {
        &BUILTIN
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.patterns.iter().map(|p| p.name.as_str())
    }

    /// Run every pattern over `text`; the first match of each wins.
    pub fn extract(&self, text: &str) -> ParsedValues {
        let mut values = ParsedValues::default();
        for pattern in &self.patterns {
            if let Some(value) = pattern.find(text) {
                debug!(analyte = %pattern.name, value, "Matched analyte");
                values.record(&pattern.name, value);
            }
        }
        values
    }

    /// Rebuild ParsedValues from stored pairs. Names outside the table
    /// are dropped and table order is restored.
    pub fn restore<'a, I>(&self, pairs: I) -> ParsedValues
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let pairs: Vec<(&str, f64)> = pairs.into_iter().collect();
        let mut values = ParsedValues::default();
        for pattern in &self.patterns {
            if let Some(&(_, value)) = pairs.iter().find(|(name, _)| *name == pattern.name) {
                values.record(&pattern.name, value);
            }
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn extract(text: &str) -> Vec<(String, f64)> {
        ContaminantExtractor::builtin()
            .extract(text)
            .iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[test]
    fn test_lead_and_ph() {
        let text = "Sample results\nLead: 0.02 ppm\npH 9.1\n";
        assert_eq!(
            extract(text),
            vec![("Lead (ppm)".to_string(), 0.02), ("pH".to_string(), 9.1)]
        );
    }

    #[test]
    fn test_separators_and_case() {
        let values = ContaminantExtractor::builtin()
            .extract("COPPER - 1.5 PPM, nitrate:3ppm, arsenic 12 ppb, PFOA-6.2ppt");
        assert_eq!(values.get("Copper (ppm)"), Some(1.5));
        assert_eq!(values.get("Nitrate (ppm)"), Some(3.0));
        assert_eq!(values.get("Arsenic (ppb)"), Some(12.0));
        assert_eq!(values.get("PFOA (ppt)"), Some(6.2));
        assert_eq!(values.get("PFOS (ppt)"), None);
    }

    #[test]
    fn test_unit_required() {
        // wrong unit for lead, no unit for arsenic
        let values = ContaminantExtractor::builtin().extract("Lead 15 ppb\nArsenic: 4");
        assert!(values.is_empty());
    }

    #[test]
    fn test_first_match_wins() {
        let values = ContaminantExtractor::builtin()
            .extract("Raw water Lead: 0.030 ppm\nTreated water Lead: 0.004 ppm");
        assert_eq!(values.get("Lead (ppm)"), Some(0.030));
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn test_results_follow_table_order() {
        let values = ContaminantExtractor::builtin().extract("pH 7.2 PFOS 1 ppt Lead 0.001 ppm");
        let names: Vec<&str> = values.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["Lead (ppm)", "PFOS (ppt)", "pH"]);
    }

    #[test]
    fn test_non_ascii_digits_are_skipped() {
        let values = ContaminantExtractor::builtin()
            .extract("Lead: \u{0663}\u{0660} ppm\nLead: 0.01 ppm\npH \u{0967}");
        assert_eq!(values.get("Lead (ppm)"), Some(0.01));
        assert_eq!(values.get("pH"), None);
    }

    #[test]
    fn test_empty_text() {
        assert!(ContaminantExtractor::builtin().extract("").is_empty());
    }

    #[test]
    fn test_custom_table() {
        let rules = vec![AnalyteRule {
            name: "Chlorine (ppm)".to_string(),
            label: "Chlorine|Free\\s+chlorine".to_string(),
            unit: Some(Unit::Ppm),
        }];
        let extractor = ContaminantExtractor::new(&rules).unwrap();
        let values = extractor.extract("Free chlorine: 0.8 ppm; Lead 1 ppm");
        assert_eq!(values.get("Chlorine (ppm)"), Some(0.8));
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn test_duplicate_rule_rejected() {
        let mut rules = builtin_rules();
        rules.push(rules[0].clone());
        assert!(matches!(
            ContaminantExtractor::new(&rules),
            Err(PatternError::DuplicateName(name)) if name == "Lead (ppm)"
        ));
    }

    #[test]
    fn test_bad_label_rejected() {
        let rules = vec![AnalyteRule {
            name: "Broken".to_string(),
            label: "(unclosed".to_string(),
            unit: None,
        }];
        assert!(matches!(
            ContaminantExtractor::new(&rules),
            Err(PatternError::InvalidLabel { .. })
        ));
    }

    #[test]
    fn test_restore_drops_unknown_names() {
        let values = ContaminantExtractor::builtin()
            .restore([("pH", 8.0), ("Radon (pCi/L)", 3.0), ("Lead (ppm)", 0.01)]);
        let names: Vec<&str> = values.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["Lead (ppm)", "pH"]);
    }
}
