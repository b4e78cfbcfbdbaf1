// src/pdf_text.rs

use lopdf::{Dictionary, Document, Object};
use tracing::{debug, info, warn};

/// Result of attempting to read a PDF's embedded text layer.
#[derive(Debug)]
pub enum PdfContent {
    /// The PDF has a genuine text layer.
    Text(String),
    /// The PDF appears to be scanned / image-only, or the text layer is
    /// too thin to trust.
    ScannedImage,
    /// The PDF could not be read by the text-layer parsers.
    Error(String),
}

/// A text layer must have more characters than this (after trimming)
/// to be trusted over OCR.
pub const DEFAULT_MIN_TEXT_CHARS: usize = 50;

/// Fraction of image-only pages at which the whole PDF counts as scanned.
const SCANNED_PAGE_RATIO: f64 = 0.8;

// Bound on Parent hops when looking for inherited page resources.
const MAX_INHERIT_DEPTH: usize = 32;

/// Read the native text of every page, in page order, joined by newlines.
///
/// Blocking and CPU-bound; callers on an async runtime should run it on a
/// blocking worker.
pub fn extract_text_layer(pdf_bytes: &[u8], min_text_chars: usize) -> PdfContent {
    // --- Phase 1: structural check with lopdf (diagnostic only) ---
    match Document::load_mem(pdf_bytes) {
        Ok(doc) => {
            if looks_like_scanned(&doc) {
                info!("PDF structural check: mostly image-only pages");
            }
        }
        Err(e) => {
            warn!(error = %e, "lopdf could not parse PDF");
        }
    }

    // --- Phase 2: per-page text extraction ---
    match pdf_extract::extract_text_from_mem_by_pages(pdf_bytes) {
        Ok(pages) => {
            let text = pages.join("\n").trim().to_string();
            let chars = text.chars().count();
            if chars > min_text_chars {
                info!(pages = pages.len(), chars, "Text layer extracted");
                PdfContent::Text(text)
            } else {
                info!(
                    chars,
                    min_text_chars, "Text layer too short, treating as scanned"
                );
                PdfContent::ScannedImage
            }
        }
        Err(e) => {
            warn!(error = %e, "pdf-extract failed, may be scanned or corrupted");
            PdfContent::Error(e.to_string())
        }
    }
}

/// Heuristic: a page that has XObject images but **no** Font resources
/// is almost certainly a scanned page.
///
/// Only logged; the text layer is always tried, since mixed documents
/// and fonts nested in form XObjects fool it.
pub fn looks_like_scanned(doc: &Document) -> bool {
    let pages = doc.get_pages();
    if pages.is_empty() {
        return false; // Can't tell, let text extraction try
    }

    let mut image_only_pages = 0;

    for (page_num, object_id) in &pages {
        let Some(page_dict) = doc
            .get_object(*object_id)
            .ok()
            .and_then(|obj| obj.as_dict().ok())
        else {
            continue;
        };

        let Some(resources) = page_resources(doc, page_dict) else {
            debug!(page = page_num, "Page has no resources");
            continue;
        };

        let has_fonts = non_empty_entry(doc, resources, b"Font");
        let has_images = non_empty_entry(doc, resources, b"XObject");

        if has_images && !has_fonts {
            image_only_pages += 1;
        }
    }

    let total = pages.len();
    let ratio = image_only_pages as f64 / total as f64;
    info!(
        total_pages = total,
        image_only = image_only_pages,
        ratio = format!("{ratio:.2}"),
        "Scanned-page analysis"
    );

    ratio >= SCANNED_PAGE_RATIO
}

/// The page's own Resources, or the nearest ones inherited through Parent.
fn page_resources<'a>(doc: &'a Document, page: &'a Dictionary) -> Option<&'a Dictionary> {
    let mut node = page;
    for _ in 0..MAX_INHERIT_DEPTH {
        if let Some(resources) = resolve_dict(doc, node.get(b"Resources").ok()) {
            return Some(resources);
        }
        node = resolve_dict(doc, node.get(b"Parent").ok())?;
    }
    None
}

fn non_empty_entry(doc: &Document, dict: &Dictionary, key: &[u8]) -> bool {
    resolve_dict(doc, dict.get(key).ok()).is_some_and(|d| !d.is_empty())
}

fn resolve_dict<'a>(doc: &'a Document, obj: Option<&'a Object>) -> Option<&'a Dictionary> {
    let (_, resolved) = doc.dereference(obj?).ok()?;
    resolved.as_dict().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Stream, dictionary};

    fn single_page(doc: &mut Document, resources: Dictionary) {
        let pages_id = doc.new_object_id();
        let resources_id = doc.add_object(resources);
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "Resources" => resources_id,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
    }

    fn image_stream() -> Stream {
        Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 1,
                "Height" => 1,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            vec![0u8],
        )
    }

    #[test]
    fn test_garbage_bytes() {
        let result = extract_text_layer(b"this is not a pdf", DEFAULT_MIN_TEXT_CHARS);
        assert!(matches!(result, PdfContent::Error(_)));
    }

    #[test]
    fn test_image_only_page_is_scanned() {
        let mut doc = Document::with_version("1.5");
        let image_id = doc.add_object(image_stream());
        single_page(
            &mut doc,
            dictionary! { "XObject" => dictionary! { "Im1" => image_id } },
        );
        assert!(looks_like_scanned(&doc));
    }

    #[test]
    fn test_page_with_fonts_is_not_scanned() {
        let mut doc = Document::with_version("1.5");
        single_page(
            &mut doc,
            dictionary! {
                "Font" => dictionary! {
                    "F1" => dictionary! {
                        "Type" => "Font",
                        "Subtype" => "Type1",
                        "BaseFont" => "Courier",
                    },
                },
            },
        );
        assert!(!looks_like_scanned(&doc));
    }

    #[test]
    fn test_empty_resources_are_not_scanned() {
        let mut doc = Document::with_version("1.5");
        single_page(&mut doc, Dictionary::new());
        assert!(!looks_like_scanned(&doc));
    }
}
