//! Async adapters around `quiz_core`: configuration, document extraction,
//! question generation and the upload-to-exam workflow.

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod exam;
pub mod ingestion;

pub use config::{ExamConfig, GenerationConfig, IngestionSettings};
pub use error::{ExtractionError, GenerationError};
pub use exam::{CompletedIngestion, ExamLoopService, PendingIngestion};
pub use ingestion::{
    ChatQuestionGenerator, DocumentExtractor, DocumentExtractors, ExtractedText, IngestionAdapter,
    LocalTextExtractor, QuestionGenerator, RemoteExtractor,
};
