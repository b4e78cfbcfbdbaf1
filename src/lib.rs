//! Water-quality report ingestion and CLEAR scoring.
//!
//! A report file goes through three stages:
//!
//! 1. [`acquisition`]: recover plain text, from the PDF text layer when it
//!    is usable and by OCR otherwise.
//! 2. [`heuristics`]: pull analyte readings out of that text with an
//!    ordered table of patterns.
//! 3. [`scoring`]: turn readings into the CLEAR score, and infrastructure
//!    facts into the water main score.
//!
//! [`report::analyze_report`] runs all three for one document.

pub mod acquisition;
pub mod config;
pub mod heuristics;
pub mod ocr;
pub mod pdf_text;
pub mod report;
pub mod scoring;

pub use acquisition::{AcquisitionError, DocumentKind, SourceDocument, TextAcquirer};
pub use config::Config;
pub use heuristics::{ContaminantExtractor, ParsedValues, parse_contaminant_values};
pub use report::{ReportAnalysis, analyze_report};
pub use scoring::{
    LimitsTable, Material, ScoreResult, WaterMainInput, compute_clear_score,
    compute_water_main_score, reference_limits,
};
