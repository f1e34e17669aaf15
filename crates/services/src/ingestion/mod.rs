mod adapter;
mod extract;
mod generate;

pub use adapter::{IngestionAdapter, cap_text};
pub use extract::{
    DocumentExtractor, DocumentExtractors, ExtractedText, LocalTextExtractor, RemoteExtractor,
};
pub use generate::{ChatQuestionGenerator, QuestionGenerator, build_prompt, parse_candidates};
