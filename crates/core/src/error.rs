use thiserror::Error;

/// Reasons an upload is refused before any asynchronous work starts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum InputError {
    #[error("uploaded document is empty")]
    Empty,

    #[error("unsupported document type (expected PDF or plain text)")]
    UnsupportedType,
}

/// Failures of the extract → generate → validate pipeline.
///
/// Every variant collapses the session back to `Idle` with a user-visible
/// message; no partially generated questions survive.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IngestionError {
    #[error("could not read text from the document: {0}")]
    ExtractionFailed(String),

    #[error("could not generate questions: {0}")]
    GenerationFailed(String),

    #[error("no usable questions could be generated from the document")]
    EmptyResult,
}
