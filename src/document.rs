//! Source document validation and text extraction

use crate::error::{FormatError, Result};
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

/// Signature every PDF file starts with
pub const PDF_MAGIC: &[u8] = b"%PDF";

/// Turns raw document bytes into page texts
pub trait DocumentExtractor: Send + Sync {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>>;
}

/// Text-layer extractor for digital PDFs
pub struct PdfTextExtractor;

impl DocumentExtractor for PdfTextExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>> {
        // pdf-extract can panic on malformed content streams
        let extracted = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(bytes)
        }));

        match extracted {
            Ok(Ok(pages)) => Ok(pages),
            Ok(Err(e)) => Err(FormatError::DocumentUnreadable(e.to_string()).into()),
            Err(_) => Err(FormatError::DocumentUnreadable("PDF parser aborted".to_string()).into()),
        }
    }
}

/// Check size and signature before any extraction work
pub fn validate_pdf(bytes: &[u8], max_bytes: usize) -> Result<()> {
    if bytes.len() > max_bytes {
        return Err(FormatError::DocumentTooLarge {
            size: bytes.len(),
            max: max_bytes,
        }
        .into());
    }
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(FormatError::NotAPdf.into());
    }
    Ok(())
}

/// Validate, extract and cap document text.
///
/// Pages are joined with a blank line; anything past `max_chars` is dropped.
pub fn extract_text(
    extractor: &dyn DocumentExtractor,
    bytes: &[u8],
    max_bytes: usize,
    max_chars: usize,
) -> Result<String> {
    validate_pdf(bytes, max_bytes)?;

    let pages = extractor.extract_pages(bytes)?;
    let text = pages.join("\n\n");
    let total_chars = text.chars().count();
    debug!("Extracted {} chars from {} pages", total_chars, pages.len());

    if total_chars > max_chars {
        warn!(
            "Document text truncated from {} to {} chars",
            total_chars, max_chars
        );
    }
    Ok(cap_chars(&text, max_chars))
}

/// Keep at most `max` characters, never splitting a code point
pub fn cap_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    /// Single-page PDF whose text layer holds `text`
    fn make_test_pdf(text: &str) -> Vec<u8> {
        use lopdf::dictionary;
        use lopdf::{Document, Object, Stream};

        let mut doc = Document::with_version("1.4");

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let content = format!("BT /F1 12 Tf 100 700 Td ({text}) Tj ET");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });

        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        });

        if let Ok(Object::Dictionary(dict)) = doc.get_object_mut(page_id) {
            dict.set("Parent", pages_id);
        }

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    struct FixedPages(Vec<&'static str>);

    impl DocumentExtractor for FixedPages {
        fn extract_pages(&self, _bytes: &[u8]) -> Result<Vec<String>> {
            Ok(self.0.iter().map(|p| p.to_string()).collect())
        }
    }

    #[test]
    fn test_extracts_text_layer() {
        let pdf = make_test_pdf("All staff must use MFA");
        let text = extract_text(&PdfTextExtractor, &pdf, 1024 * 1024, 50_000).unwrap();
        assert!(text.contains("MFA"), "unexpected text: {text}");
    }

    #[test]
    fn test_rejects_missing_signature() {
        let err = validate_pdf(b"PK\x03\x04 not a pdf", 1024).unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::NotAPdf)));
    }

    #[test]
    fn test_rejects_oversized_before_signature_check() {
        let bytes = vec![b'x'; 2048];
        let err = validate_pdf(&bytes, 1024).unwrap_err();
        assert!(matches!(
            err,
            Error::Format(FormatError::DocumentTooLarge { size: 2048, max: 1024 })
        ));
    }

    #[test]
    fn test_garbage_after_signature_is_unreadable() {
        let err = extract_text(&PdfTextExtractor, b"%PDF-1.4 garbage", 1024, 100).unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::DocumentUnreadable(_))));
    }

    #[test]
    fn test_pages_joined_with_blank_line() {
        let extractor = FixedPages(vec!["page one", "page two"]);
        let text = extract_text(&extractor, b"%PDF-1.7", 1024, 100).unwrap();
        assert_eq!(text, "page one\n\npage two");
    }

    #[test]
    fn test_text_beyond_cap_is_dropped() {
        let extractor = FixedPages(vec!["abcdefghij"]);
        let text = extract_text(&extractor, b"%PDF-1.7", 1024, 4).unwrap();
        assert_eq!(text, "abcd");
    }

    #[test]
    fn test_cap_chars_respects_code_points() {
        assert_eq!(cap_chars("héllo", 2), "hé");
        assert_eq!(cap_chars("short", 10), "short");
        assert_eq!(cap_chars("", 0), "");
    }
}
