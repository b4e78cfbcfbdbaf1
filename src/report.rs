// src/report.rs

use crate::acquisition::{AcquisitionError, SourceDocument, TextAcquirer};
use crate::heuristics::{ContaminantExtractor, ParsedValues};
use crate::scoring::{LimitsTable, ScoreResult, compute_clear_score};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{Instrument, info, info_span};

/// Longest extracted text kept on the stored record.
pub const MAX_STORED_TEXT_CHARS: usize = 70_000;

/// Everything the storage and presentation layers need about one report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportAnalysis {
    pub filename: String,
    pub source_digest: String,
    pub extracted_text: String,
    pub parsed_values: ParsedValues,
    pub clear: ScoreResult,
}

/// SHA-256 of the uploaded bytes, hex encoded.
pub fn source_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Cut `text` to at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Recover text from `doc`, then extract and score it.
pub async fn analyze_report(
    acquirer: &TextAcquirer,
    extractor: &ContaminantExtractor,
    doc: &SourceDocument,
    limits: &LimitsTable,
) -> Result<ReportAnalysis, AcquisitionError> {
    let span = info_span!("report", filename = %doc.filename, kind = ?doc.kind);

    let text = acquirer.acquire(doc).instrument(span.clone()).await?;

    let _guard = span.enter();
    info!(chars = text.chars().count(), "Text acquired");
    Ok(analyze_text(
        &doc.filename,
        source_digest(&doc.bytes),
        &text,
        extractor,
        limits,
    ))
}

/// Extract and score text that was already recovered, e.g. a stored
/// record whose parsed values are missing.
pub fn analyze_text(
    filename: &str,
    source_digest: String,
    text: &str,
    extractor: &ContaminantExtractor,
    limits: &LimitsTable,
) -> ReportAnalysis {
    let parsed_values = extractor.extract(text);
    let (filled, total) = parsed_values.coverage(extractor);
    info!(filled, total, "Analyte coverage");

    for (analyte, value) in parsed_values.iter() {
        info!(analyte, value, "Reading");
    }

    let clear = compute_clear_score(&parsed_values, limits);
    for penalty in &clear.penalties {
        info!(penalty = %penalty, "Limit exceeded");
    }
    info!(score = clear.score, penalties = clear.penalties.len(), "CLEAR score");

    ReportAnalysis {
        filename: filename.to_string(),
        source_digest,
        extracted_text: truncate_chars(text, MAX_STORED_TEXT_CHARS).to_string(),
        parsed_values,
        clear,
    }
}
