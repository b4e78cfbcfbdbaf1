// src/ocr.rs

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use tokio::process::Command;
use tracing::{debug, info};

/// Resolution pdftoppm renders at when the scale factor is 1.
const BASE_DPI: f32 = 72.0;

#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("{0} produced no page images")]
    NoPages(String),
    #[error("OCR scratch file error: {0}")]
    Io(#[from] std::io::Error),
}

/// One rendered PDF page. `number` is 1-based.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub number: u32,
    pub png: Vec<u8>,
}

/// Turns a raster image into text.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, image: &[u8]) -> Result<String, OcrError>;
}

/// Renders every page of a PDF, returned in page order.
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    async fn rasterize(&self, pdf: &[u8], scale: f32) -> Result<Vec<PageImage>, OcrError>;
}

/// External tool locations, `[ocr]` in the config file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    pub tesseract_bin: PathBuf,
    pub pdftoppm_bin: PathBuf,
    pub language: String,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            tesseract_bin: PathBuf::from("tesseract"),
            pdftoppm_bin: PathBuf::from("pdftoppm"),
            language: "eng".to_string(),
        }
    }
}

/// Tesseract via its command-line interface.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    binary: PathBuf,
    language: String,
}

impl TesseractCli {
    pub fn new(binary: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
        }
    }

    pub fn from_settings(settings: &OcrSettings) -> Self {
        Self::new(&settings.tesseract_bin, &settings.language)
    }
}

#[async_trait]
impl TextRecognizer for TesseractCli {
    async fn recognize(&self, image: &[u8]) -> Result<String, OcrError> {
        let input = tempfile::Builder::new().prefix("clear-ocr-").tempfile()?;
        tokio::fs::write(input.path(), image).await?;

        let output = run_tool(
            Command::new(&self.binary)
                .arg(input.path())
                .arg("stdout")
                .arg("-l")
                .arg(&self.language),
            &self.binary,
        )
        .await?;

        let text = String::from_utf8_lossy(&output).into_owned();
        debug!(bytes = image.len(), chars = text.chars().count(), "Tesseract pass complete");
        Ok(text)
    }
}

/// Poppler's pdftoppm, rendering PNG pages into a scratch directory.
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    binary: PathBuf,
}

impl PdftoppmRasterizer {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn from_settings(settings: &OcrSettings) -> Self {
        Self::new(&settings.pdftoppm_bin)
    }
}

#[async_trait]
impl PageRasterizer for PdftoppmRasterizer {
    async fn rasterize(&self, pdf: &[u8], scale: f32) -> Result<Vec<PageImage>, OcrError> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("input.pdf");
        tokio::fs::write(&input, pdf).await?;

        let dpi = scale_to_dpi(scale);
        run_tool(
            Command::new(&self.binary)
                .arg("-r")
                .arg(dpi.to_string())
                .arg("-png")
                .arg(&input)
                .arg(dir.path().join("page")),
            &self.binary,
        )
        .await?;

        let mut rendered = Vec::new();
        let mut entries = tokio::fs::read_dir(dir.path()).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if let Some(number) = name.to_str().and_then(page_number) {
                rendered.push((number, entry.path()));
            }
        }
        // file names are zero-padded by page count, so sort numerically
        rendered.sort_by_key(|(number, _)| *number);

        if rendered.is_empty() {
            return Err(OcrError::NoPages(self.binary.display().to_string()));
        }

        let mut pages = Vec::with_capacity(rendered.len());
        for (number, path) in rendered {
            pages.push(PageImage {
                number,
                png: tokio::fs::read(&path).await?,
            });
        }

        info!(pages = pages.len(), dpi, "Rasterized PDF pages");
        Ok(pages)
    }
}

/// Page number from a pdftoppm output name such as `page-07.png`.
fn page_number(file_name: &str) -> Option<u32> {
    file_name
        .strip_prefix("page-")?
        .strip_suffix(".png")?
        .parse()
        .ok()
}

fn scale_to_dpi(scale: f32) -> u32 {
    (BASE_DPI * scale).round().max(1.0) as u32
}

/// Run an external tool to completion and hand back its stdout.
async fn run_tool(command: &mut Command, binary: &Path) -> Result<Vec<u8>, OcrError> {
    let tool = binary.display().to_string();
    let output = command
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| OcrError::Spawn {
            tool: tool.clone(),
            source,
        })?;

    if !output.status.success() {
        return Err(OcrError::ToolFailed {
            tool,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output.stdout)
}
