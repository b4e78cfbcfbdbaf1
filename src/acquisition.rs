// src/acquisition.rs

use crate::ocr::{OcrError, OcrSettings, PageRasterizer, PdftoppmRasterizer, TesseractCli, TextRecognizer};
use crate::pdf_text::{self, DEFAULT_MIN_TEXT_CHARS, PdfContent};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Upscaling applied to PDF pages before OCR (2x the 72 dpi base).
pub const DEFAULT_RASTER_SCALE: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Image,
}

impl DocumentKind {
    /// Classify a declared MIME type.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let ct = content_type.trim().to_ascii_lowercase();
        if ct == "application/pdf" {
            Some(DocumentKind::Pdf)
        } else if ct.starts_with("image/") {
            Some(DocumentKind::Image)
        } else {
            None
        }
    }

    /// Classify by file extension.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = Path::new(filename)
            .extension()?
            .to_str()?
            .to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "png" | "jpg" | "jpeg" | "tif" | "tiff" | "bmp" | "gif" | "webp" => {
                Some(DocumentKind::Image)
            }
            _ => None,
        }
    }
}

/// An uploaded report file.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub filename: String,
    pub kind: DocumentKind,
    pub bytes: Arc<[u8]>,
}

impl SourceDocument {
    pub fn new(filename: impl Into<String>, kind: DocumentKind, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            filename: filename.into(),
            kind,
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, classifying it by extension.
    pub async fn read(path: impl AsRef<Path>) -> Result<Self, AcquisitionError> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let kind = DocumentKind::from_filename(&filename)
            .ok_or_else(|| AcquisitionError::UnsupportedKind(filename.clone()))?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| AcquisitionError::Read {
                path: path.display().to_string(),
                source,
            })?;
        Ok(Self::new(filename, kind, bytes))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    #[error("cannot tell whether {0:?} is a PDF or an image")]
    UnsupportedKind(String),
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("rasterizing PDF pages failed: {0}")]
    Rasterize(#[source] OcrError),
    #[error("text recognition failed on page {page}: {source}")]
    RecognizePage {
        page: u32,
        #[source]
        source: OcrError,
    },
    #[error("text recognition failed: {0}")]
    Recognize(#[source] OcrError),
}

/// `[acquisition]` in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionSettings {
    pub min_text_chars: usize,
    pub raster_scale: f32,
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            min_text_chars: DEFAULT_MIN_TEXT_CHARS,
            raster_scale: DEFAULT_RASTER_SCALE,
        }
    }
}

/// Recovers plain text from a report: PDF text layer first, OCR otherwise.
pub struct TextAcquirer {
    recognizer: Box<dyn TextRecognizer>,
    rasterizer: Box<dyn PageRasterizer>,
    settings: AcquisitionSettings,
}

impl TextAcquirer {
    pub fn new(
        recognizer: Box<dyn TextRecognizer>,
        rasterizer: Box<dyn PageRasterizer>,
        settings: AcquisitionSettings,
    ) -> Self {
        Self {
            recognizer,
            rasterizer,
            settings,
        }
    }

    /// Tesseract + pdftoppm from the given tool settings.
    pub fn with_cli_tools(ocr: &OcrSettings, settings: AcquisitionSettings) -> Self {
        Self::new(
            Box::new(TesseractCli::from_settings(ocr)),
            Box::new(PdftoppmRasterizer::from_settings(ocr)),
            settings,
        )
    }

    pub fn settings(&self) -> &AcquisitionSettings {
        &self.settings
    }

    /// Produce the document's trimmed text, possibly empty.
    pub async fn acquire(&self, doc: &SourceDocument) -> Result<String, AcquisitionError> {
        match doc.kind {
            DocumentKind::Image => self.recognize_image(doc).await,
            DocumentKind::Pdf => {
                // attempt: embedded text layer
                match self.text_layer(doc).await {
                    PdfContent::Text(text) => return Ok(text),
                    PdfContent::ScannedImage => {
                        info!("No usable text layer, falling back to OCR");
                    }
                    PdfContent::Error(e) => {
                        warn!(error = %e, "Text-layer extraction failed, falling back to OCR");
                    }
                }
                // fallback: rasterize + recognize
                self.recognize_pages(doc).await
            }
        }
    }

    async fn text_layer(&self, doc: &SourceDocument) -> PdfContent {
        let bytes = Arc::clone(&doc.bytes);
        let min_chars = self.settings.min_text_chars;
        // pdf-extract can panic on malformed input; a worker contains it
        match tokio::task::spawn_blocking(move || pdf_text::extract_text_layer(&bytes, min_chars))
            .await
        {
            Ok(content) => content,
            Err(e) => PdfContent::Error(format!("text-layer worker failed: {e}")),
        }
    }

    async fn recognize_pages(&self, doc: &SourceDocument) -> Result<String, AcquisitionError> {
        info!(
            bytes = doc.bytes.len(),
            scale = self.settings.raster_scale,
            "Running OCR over rasterized pages"
        );

        let pages = self
            .rasterizer
            .rasterize(&doc.bytes, self.settings.raster_scale)
            .await
            .map_err(AcquisitionError::Rasterize)?;

        let mut all = String::new();
        for page in &pages {
            let text = self
                .recognizer
                .recognize(&page.png)
                .await
                .map_err(|source| AcquisitionError::RecognizePage {
                    page: page.number,
                    source,
                })?;
            info!(page = page.number, chars = text.chars().count(), "Page recognized");
            all.push_str(&text);
            all.push('\n');
        }

        Ok(all.trim().to_string())
    }

    async fn recognize_image(&self, doc: &SourceDocument) -> Result<String, AcquisitionError> {
        let text = self
            .recognizer
            .recognize(&doc.bytes)
            .await
            .map_err(AcquisitionError::Recognize)?;
        info!(chars = text.chars().count(), "Image recognized");
        Ok(text.trim().to_string())
    }
}
