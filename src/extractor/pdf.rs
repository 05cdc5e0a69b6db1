use crate::error::ExtractionError;
use lopdf::Document;
use std::path::Path;
use tracing::debug;

/// Extract text from the first `max_pages` pages of a PDF
///
/// Uses lopdf page by page; when lopdf yields nothing (unusual font
/// encodings, broken xref) falls back to pdf-extract over the whole file.
/// Blocking: call from `spawn_blocking`.
pub fn extract_pdf(path: &Path, max_pages: usize) -> Result<String, ExtractionError> {
    let text = match Document::load(path) {
        Ok(doc) => {
            if doc.is_encrypted() {
                return Err(ExtractionError::Encrypted);
            }
            extract_with_lopdf(&doc, max_pages)
        }
        Err(e) => {
            debug!("lopdf could not load {}: {}", path.display(), e);
            String::new()
        }
    };

    if !text.trim().is_empty() {
        return Ok(text.trim().to_string());
    }

    pdf_extract::extract_text(path)
        .map(|t| t.trim().to_string())
        .map_err(|e| ExtractionError::Pdf(e.to_string()))
}

fn extract_with_lopdf(doc: &Document, max_pages: usize) -> String {
    let mut text_content = String::new();

    for page_num in doc.get_pages().keys().take(max_pages) {
        if let Ok(page_text) = doc.extract_text(&[*page_num]) {
            text_content.push_str(&page_text);
            text_content.push('\n');
        }
    }

    text_content
}
