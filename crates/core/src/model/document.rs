use std::fmt;

use crate::error::InputError;

const PDF_MAGIC: &[u8] = b"%PDF-";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Document types the exam can be generated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Pdf,
    PlainText,
}

impl DocumentKind {
    /// Sniff the type of an upload from its bytes.
    ///
    /// PDFs are recognized by their header. Anything else must be non-blank
    /// UTF-8 without NUL bytes to count as plain text.
    ///
    /// # Errors
    ///
    /// Returns `InputError::Empty` for empty input and
    /// `InputError::UnsupportedType` for anything unrecognized.
    pub fn detect(bytes: &[u8]) -> Result<Self, InputError> {
        if bytes.is_empty() {
            return Err(InputError::Empty);
        }
        if bytes.starts_with(PDF_MAGIC) {
            return Ok(Self::Pdf);
        }

        let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        if body.contains(&0) {
            return Err(InputError::UnsupportedType);
        }
        match std::str::from_utf8(body) {
            Ok(text) if text.trim().is_empty() => Err(InputError::Empty),
            Ok(_) => Ok(Self::PlainText),
            Err(_) => Err(InputError::UnsupportedType),
        }
    }

    /// MIME type used when handing the document to an external service.
    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::PlainText => "text/plain; charset=utf-8",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pdf => write!(f, "PDF"),
            Self::PlainText => write!(f, "plain text"),
        }
    }
}
