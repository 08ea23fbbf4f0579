//! Text extraction from uploaded documents.
//!
//! Every extractor returns per-page text with Unicode space separators
//! already mapped to ASCII spaces. Line breaks are kept because the
//! care-plan and hydration extractors scan line by line.

use std::panic::{self, AssertUnwindSafe};

use thiserror::Error;

/// Extraction errors.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("Text encoding error: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("Document contains no text")]
    Empty,
}

pub type ExtractionResult<T> = Result<T, ExtractionError>;

/// Full text plus the ordered page texts of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfText {
    pub text: String,
    pub pages: Vec<String>,
}

impl PdfText {
    /// Build from page texts, normalizing whitespace on each page.
    pub fn from_pages(pages: Vec<String>) -> Self {
        let pages: Vec<String> = pages.iter().map(|p| normalize_page_whitespace(p)).collect();
        let text = pages.join("\n\x0C");
        Self { text, pages }
    }

    /// Build from one undivided text, splitting heuristically.
    pub fn from_text(text: &str) -> Self {
        Self::from_pages(split_into_pages(text))
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Source of page text for the extractors.
pub trait PageExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> ExtractionResult<PdfText>;
}

/// PDF extractor backed by `pdf-extract`.
pub struct PdfTextExtractor;

impl PageExtractor for PdfTextExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> ExtractionResult<PdfText> {
        match guarded(|| pdf_extract::extract_text_from_mem_by_pages(bytes)) {
            Ok(pages) if !pages.is_empty() => Ok(PdfText::from_pages(pages)),
            Ok(_) => Err(ExtractionError::Empty),
            Err(by_page_err) => {
                tracing::debug!(error = %by_page_err, "Per-page extraction failed, using whole-document text");
                let text = guarded(|| pdf_extract::extract_text_from_mem(bytes))?;
                if text.trim().is_empty() {
                    return Err(ExtractionError::Empty);
                }
                Ok(PdfText::from_text(&text))
            }
        }
    }
}

/// Run a pdf-extract call, turning both its errors and its panics
/// (missing fonts, broken CMaps) into `PdfParsing`.
fn guarded<T, E, F>(extract: F) -> ExtractionResult<T>
where
    E: std::fmt::Display,
    F: FnOnce() -> Result<T, E>,
{
    match panic::catch_unwind(AssertUnwindSafe(extract)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(ExtractionError::PdfParsing(e.to_string())),
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown".to_string());
            tracing::warn!(%reason, "PDF parser panicked");
            Err(ExtractionError::PdfParsing(format!("parser panicked: {reason}")))
        }
    }
}

/// Extractor for plain-text exports; pages separated by form feeds.
pub struct PlainTextExtractor;

impl PageExtractor for PlainTextExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> ExtractionResult<PdfText> {
        let text = String::from_utf8(bytes.to_vec())?;
        if text.trim().is_empty() {
            return Err(ExtractionError::Empty);
        }
        Ok(PdfText::from_text(&text))
    }
}

/// Dispatches on the `%PDF-` magic: PDFs go to pdf-extract, anything else
/// is read as a UTF-8 text export.
pub struct DocumentExtractor;

impl PageExtractor for DocumentExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> ExtractionResult<PdfText> {
        if is_pdf(bytes) {
            PdfTextExtractor.extract_pages(bytes)
        } else {
            PlainTextExtractor.extract_pages(bytes)
        }
    }
}

/// True if the buffer starts with a PDF header (leading whitespace allowed).
pub fn is_pdf(bytes: &[u8]) -> bool {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    bytes[start..].starts_with(b"%PDF-")
}

/// Split text into pages: form feeds, then runs of 3+ newlines, then one page.
pub fn split_into_pages(text: &str) -> Vec<String> {
    let non_empty = |parts: Vec<&str>| -> Vec<String> {
        parts
            .into_iter()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect()
    };

    if text.contains('\x0C') {
        let pages = non_empty(text.split('\x0C').collect());
        if !pages.is_empty() {
            return pages;
        }
    }

    let parts = split_on_newline_runs(text);
    if parts.len() > 1 {
        let pages = non_empty(parts);
        if !pages.is_empty() {
            return pages;
        }
    }

    vec![text.trim().to_string()]
}

fn split_on_newline_runs(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\n' {
            let run_start = i;
            while i < bytes.len() && bytes[i] == b'\n' {
                i += 1;
            }
            if i - run_start >= 3 {
                parts.push(&text[start..run_start]);
                start = i;
            }
        } else {
            i += 1;
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Unicode space separators that PDFs emit inside names and numbers.
pub fn is_unicode_space(c: char) -> bool {
    matches!(
        c,
        '\u{00A0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200B}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
    )
}

/// Map Unicode spaces to ASCII spaces, keeping line structure.
pub fn normalize_page_whitespace(text: &str) -> String {
    text.chars()
        .map(|c| if is_unicode_space(c) { ' ' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_on_form_feed() {
        let pages = split_into_pages("page one\x0Cpage two\x0C\x0C  \x0Cpage three");
        assert_eq!(pages, vec!["page one", "page two", "page three"]);
    }

    #[test]
    fn test_split_on_newline_runs() {
        let pages = split_into_pages("first\n\nstill first\n\n\nsecond\n\n\n\n\nthird");
        assert_eq!(pages, vec!["first\n\nstill first", "second", "third"]);
    }

    #[test]
    fn test_single_page_fallback() {
        let pages = split_into_pages("  one page\nonly  ");
        assert_eq!(pages, vec!["one page\nonly"]);
    }

    #[test]
    fn test_normalize_keeps_newlines() {
        let text = "Doe,\u{00A0}Jane\nFLUID\u{3000}TARGET 1500\u{202F}mL";
        assert_eq!(
            normalize_page_whitespace(text),
            "Doe, Jane\nFLUID TARGET 1500 mL"
        );
    }

    #[test]
    fn test_plain_text_extractor() {
        let doc = PlainTextExtractor
            .extract_pages("Doe,\u{00A0}Jane (1234)\x0CFLUID TARGET 1500mL".as_bytes())
            .unwrap();

        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.pages[0], "Doe, Jane (1234)");
        assert!(doc.text.contains("FLUID TARGET"));
    }

    #[test]
    fn test_plain_text_empty_is_error() {
        assert!(matches!(
            PlainTextExtractor.extract_pages(b"   \n "),
            Err(ExtractionError::Empty)
        ));
    }

    #[test]
    fn test_is_pdf() {
        assert!(is_pdf(b"%PDF-1.4\n..."));
        assert!(is_pdf(b"\n %PDF-1.7"));
        assert!(!is_pdf(b"FLUID TARGET"));
    }

    /// Minimal PDF, one page per entry, Helvetica as /F1. A page with
    /// `fonts = false` references /F9 without declaring any resources.
    fn build_pdf(pages: &[(&str, bool)]) -> Vec<u8> {
        let page_count = pages.len();
        let kids: Vec<String> = (0..page_count).map(|i| format!("{} 0 R", 4 + 2 * i)).collect();

        let mut objects = vec![
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), page_count),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
        ];
        for (i, (text, fonts)) in pages.iter().enumerate() {
            let (resources, font) = if *fonts {
                ("<< /Font << /F1 3 0 R >> >>", "F1")
            } else {
                ("<< >>", "F9")
            };
            let escaped = text.replace('(', "\\(").replace(')', "\\)");
            let stream = format!("BT /{font} 12 Tf 72 720 Td ({escaped}) Tj ET");
            objects.push(format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Resources {} /Contents {} 0 R >>",
                resources,
                5 + 2 * i
            ));
            objects.push(format!(
                "<< /Length {} >>\nstream\n{}\nendstream",
                stream.len(),
                stream
            ));
        }

        let mut out = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).into_bytes());
        }

        let xref_at = out.len();
        out.extend(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).into_bytes());
        for offset in offsets {
            out.extend(format!("{:010} 00000 n \n", offset).into_bytes());
        }
        out.extend(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                objects.len() + 1,
                xref_at
            )
            .into_bytes(),
        );
        out
    }

    #[test]
    fn test_pdf_per_page_text() {
        let pdf = build_pdf(&[("DOE, JANE (1234)", true), ("FLUID TARGET 1500mL", true)]);
        let doc = PdfTextExtractor.extract_pages(&pdf).unwrap();

        assert_eq!(doc.page_count(), 2);
        assert!(doc.pages[0].contains("DOE, JANE (1234)"), "page 1: {:?}", doc.pages[0]);
        assert!(doc.pages[1].contains("FLUID TARGET 1500mL"), "page 2: {:?}", doc.pages[1]);
        assert!(DocumentExtractor.extract_pages(&pdf).is_ok());
    }

    #[test]
    fn test_missing_font_is_error_not_panic() {
        let pdf = build_pdf(&[("DOE, JANE (1234)", false)]);
        let result = PdfTextExtractor.extract_pages(&pdf);
        assert!(matches!(result, Err(ExtractionError::PdfParsing(_))));
    }

    #[test]
    fn test_bad_pdf_does_not_stop_batch() {
        use crate::careplan::process_care_plans;
        use crate::config::PipelineConfig;
        use crate::models::FileInput;
        use crate::pipeline::RunLog;

        let files = vec![
            FileInput::new("bad.pdf", build_pdf(&[("ROE, RICHARD (5678)", false)])),
            FileInput::new(
                "good.pdf",
                build_pdf(&[("DOE, JANE (1234)", true), ("FLUID TARGET 1500mL", true)]),
            ),
        ];
        let mut log = RunLog::new();
        let residents =
            process_care_plans(&files, &DocumentExtractor, &PipelineConfig::default(), &mut log);

        assert_eq!(residents.len(), 1);
        assert_eq!(residents[0].name, "Doe, Jane");
        assert_eq!(residents[0].ml_goal, Some(1500));
        assert_eq!(log.errors().len(), 1);
        assert!(log.errors()[0].starts_with("Error processing bad.pdf"));
    }

    #[test]
    fn test_malformed_pdf_is_error() {
        let result = PdfTextExtractor.extract_pages(b"%PDF-1.4\nthis is not a real pdf");
        assert!(result.is_err());
    }
}
