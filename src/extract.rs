//! Text extraction from local document files.
//!
//! PDF files are read page by page; anything else is treated as UTF-8 text
//! with undecodable bytes replaced. The extractor never returns partial
//! output for a missing file: a nonexistent path is a hard error so the
//! ingestion state machine can record it verbatim.

use std::path::Path;
use thiserror::Error;

/// Errors raised while turning a storage path into text.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The storage path does not exist on this filesystem.
    #[error("file not found: {0}")]
    NotFound(String),
    /// The file exists but could not be read.
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),
    /// The PDF document could not be parsed.
    #[error("failed to parse PDF: {0}")]
    Pdf(#[from] lopdf::Error),
}

/// Extract the full text of the document at `path`.
///
/// PDF suffixes (case-insensitive) are parsed with `lopdf` and concatenated
/// page by page with newline separators; a page that yields no text
/// contributes an empty string. Every other file is read as UTF-8 with lossy
/// replacement of invalid bytes.
pub fn extract_text(path: &str) -> Result<String, ExtractError> {
    let p = Path::new(path);
    if !p.exists() {
        return Err(ExtractError::NotFound(path.to_string()));
    }

    let is_pdf = p
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    if is_pdf {
        extract_pdf_text(p)
    } else {
        let bytes = std::fs::read(p)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn extract_pdf_text(path: &Path) -> Result<String, ExtractError> {
    let document = lopdf::Document::load(path)?;
    let pages: Vec<String> = document
        .get_pages()
        .keys()
        .map(|page_number| {
            document
                .extract_text(&[*page_number])
                .unwrap_or_default()
        })
        .collect();
    Ok(pages.join("\n"))
}
