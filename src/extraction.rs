//! Text extraction for uploaded notes.
//!
//! PDFs are read page by page with `pdf-extract`; pages without extractable text (scans,
//! images, blank pages) are skipped rather than failing the document. Plain-text uploads must be
//! valid UTF-8.

use std::path::Path;
use thiserror::Error;

/// Errors raised while turning an upload into text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The upload is neither a PDF nor plain text.
    #[error("unsupported file type '{0}'; upload a PDF or TXT file")]
    UnsupportedType(String),
    /// The PDF could not be parsed.
    #[error("could not read PDF: {0}")]
    Pdf(String),
    /// The text file is not valid UTF-8.
    #[error("text file is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// Media types accepted by the notes summarizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// `application/pdf`
    Pdf,
    /// `text/plain`
    PlainText,
}

impl DocumentKind {
    /// Resolve the document kind from the declared content type, falling back to the file
    /// extension when the browser sent a generic type.
    pub fn detect(content_type: Option<&str>, file_name: Option<&str>) -> Result<Self, ExtractionError> {
        let declared = content_type
            .map(|value| {
                value
                    .split(';')
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_ascii_lowercase()
            })
            .filter(|value| !value.is_empty());

        match declared.as_deref() {
            Some("application/pdf") => return Ok(Self::Pdf),
            Some("text/plain") => return Ok(Self::PlainText),
            _ => {}
        }

        let extension = file_name
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("pdf") => Ok(Self::Pdf),
            Some("txt") => Ok(Self::PlainText),
            _ => Err(ExtractionError::UnsupportedType(
                declared
                    .or_else(|| file_name.map(str::to_string))
                    .unwrap_or_else(|| "unknown".into()),
            )),
        }
    }
}

/// Extract text from an upload synchronously.
pub fn extract_text(bytes: &[u8], kind: DocumentKind) -> Result<String, ExtractionError> {
    match kind {
        DocumentKind::PlainText => Ok(String::from_utf8(bytes.to_vec())?),
        DocumentKind::Pdf => {
            let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
                .map_err(|error| ExtractionError::Pdf(error.to_string()))?;
            Ok(join_pages(pages))
        }
    }
}

/// Extract text on the blocking pool.
///
/// PDF parsing is CPU-bound and the parser may panic on malformed input; both are kept off the
/// async workers and a panic surfaces as [`ExtractionError::Pdf`].
pub async fn extract_text_blocking(
    bytes: Vec<u8>,
    kind: DocumentKind,
) -> Result<String, ExtractionError> {
    tokio::task::spawn_blocking(move || extract_text(&bytes, kind))
        .await
        .map_err(|error| ExtractionError::Pdf(format!("extraction aborted: {error}")))?
}

/// Join page texts with newlines, skipping pages with no extractable text.
pub(crate) fn join_pages(pages: Vec<String>) -> String {
    pages
        .into_iter()
        .filter(|page| !page.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_prefers_declared_content_type() {
        assert_eq!(
            DocumentKind::detect(Some("application/pdf"), Some("notes.txt")).unwrap(),
            DocumentKind::Pdf
        );
        assert_eq!(
            DocumentKind::detect(Some("text/plain; charset=utf-8"), None).unwrap(),
            DocumentKind::PlainText
        );
    }

    #[test]
    fn detect_falls_back_to_extension() {
        assert_eq!(
            DocumentKind::detect(Some("application/octet-stream"), Some("Unit-3.PDF")).unwrap(),
            DocumentKind::Pdf
        );
        assert_eq!(
            DocumentKind::detect(None, Some("notes.txt")).unwrap(),
            DocumentKind::PlainText
        );
    }

    #[test]
    fn detect_rejects_other_types() {
        let error = DocumentKind::detect(Some("image/png"), Some("scan.png")).unwrap_err();
        assert!(matches!(error, ExtractionError::UnsupportedType(ref kind) if kind == "image/png"));
    }

    #[test]
    fn join_pages_skips_pages_without_text() {
        let pages = vec![
            "Chapter 1".to_string(),
            "   \n".to_string(),
            String::new(),
            "Chapter 2".to_string(),
        ];
        assert_eq!(join_pages(pages), "Chapter 1\nChapter 2");
    }

    #[test]
    fn plain_text_is_decoded() {
        let text = extract_text("Notes on Ohm's law".as_bytes(), DocumentKind::PlainText).unwrap();
        assert_eq!(text, "Notes on Ohm's law");
    }

    #[test]
    fn invalid_utf8_is_an_error() {
        let error = extract_text(&[0xff, 0xfe, 0x00], DocumentKind::PlainText).unwrap_err();
        assert!(matches!(error, ExtractionError::InvalidUtf8(_)));
    }

    #[tokio::test]
    async fn malformed_pdf_is_reported_not_panicked() {
        let error = extract_text_blocking(b"definitely not a pdf".to_vec(), DocumentKind::Pdf)
            .await
            .unwrap_err();
        assert!(matches!(error, ExtractionError::Pdf(_)));
    }
}
