//! Text extraction for uploaded documents (PDF, plain text).
//!
//! Uploads arrive as bytes plus a filename; the extension selects the
//! extractor. The result is plain UTF-8 text ready for chunking.

use std::path::Path;

use thiserror::Error;

/// Extraction error. The upload handler maps unsupported types to 400.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported file type")]
    UnsupportedFileType(String),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
}

/// Supported upload kinds, derived from the filename extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Text,
}

impl FileKind {
    /// Classify a filename by its (case-insensitive) extension.
    pub fn from_filename(filename: &str) -> Result<Self, ExtractError> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("pdf") => Ok(FileKind::Pdf),
            Some("txt") => Ok(FileKind::Text),
            _ => Err(ExtractError::UnsupportedFileType(filename.to_string())),
        }
    }
}

/// Extracts plain text from an uploaded file's bytes.
pub fn extract_text(bytes: &[u8], filename: &str) -> Result<String, ExtractError> {
    match FileKind::from_filename(filename)? {
        FileKind::Pdf => extract_pdf(bytes),
        FileKind::Text => Ok(String::from_utf8_lossy(bytes).into_owned()),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}
