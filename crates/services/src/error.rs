//! Shared error types for the services crate.

use quiz_core::{DocumentKind, IngestionError};
use thiserror::Error;

/// Errors emitted by document extractors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExtractionError {
    #[error("no extractor is configured for {0} documents")]
    Unsupported(DocumentKind),
    #[error("document is not valid UTF-8 text")]
    InvalidEncoding,
    #[error("document contains no readable text")]
    NoText,
    #[error("extraction timed out after {secs}s")]
    TimedOut { secs: u64 },
    #[error("extraction service returned status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by question generators.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GenerationError {
    #[error("question generation is not configured")]
    Disabled,
    #[error("question generation timed out after {secs}s")]
    TimedOut { secs: u64 },
    #[error("generation service returned status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("generation service returned an empty response")]
    EmptyResponse,
    #[error("generation service returned malformed output: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl From<ExtractionError> for IngestionError {
    fn from(err: ExtractionError) -> Self {
        IngestionError::ExtractionFailed(err.to_string())
    }
}

impl From<GenerationError> for IngestionError {
    fn from(err: GenerationError) -> Self {
        IngestionError::GenerationFailed(err.to_string())
    }
}
