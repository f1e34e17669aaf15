use std::sync::Arc;
use std::time::Duration;

use quiz_core::{DocumentKind, IngestionError, QuestionSet};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::config::{ExamConfig, IngestionSettings};
use crate::error::{ExtractionError, GenerationError};
use crate::ingestion::extract::{DocumentExtractor, DocumentExtractors};
use crate::ingestion::generate::{ChatQuestionGenerator, QuestionGenerator};

/// Turns an uploaded document into a validated `QuestionSet`.
///
/// Pipeline: extract text → cap its length → generate candidates → validate.
/// Each external call runs under its own timeout so a hung collaborator
/// surfaces as a failure instead of blocking the exam forever.
#[derive(Clone)]
pub struct IngestionAdapter {
    extractor: Arc<dyn DocumentExtractor>,
    generator: Arc<dyn QuestionGenerator>,
    settings: IngestionSettings,
}

impl IngestionAdapter {
    #[must_use]
    pub fn new(
        extractor: Arc<dyn DocumentExtractor>,
        generator: Arc<dyn QuestionGenerator>,
        settings: IngestionSettings,
    ) -> Self {
        Self {
            extractor,
            generator,
            settings,
        }
    }

    /// Adapter wired to the standard extractors and the chat generator.
    #[must_use]
    pub fn from_config(config: &ExamConfig) -> Self {
        Self::new(
            Arc::new(DocumentExtractors::standard(config.extract_url.as_deref())),
            Arc::new(ChatQuestionGenerator::new(config.generation.clone())),
            config.ingestion.clone(),
        )
    }

    /// Run the full pipeline for one document.
    ///
    /// # Errors
    ///
    /// Returns `IngestionError::ExtractionFailed` or `GenerationFailed` when a
    /// collaborator fails or times out, and `EmptyResult` when no candidate
    /// survives validation.
    pub async fn ingest(
        &self,
        kind: DocumentKind,
        bytes: &[u8],
    ) -> Result<QuestionSet, IngestionError> {
        let extracted = timeout(
            self.settings.extract_timeout,
            self.extractor.extract(kind, bytes),
        )
        .await
        .map_err(|_| ExtractionError::TimedOut {
            secs: secs(self.settings.extract_timeout),
        })
        .and_then(|result| result)
        .inspect_err(|err| warn!(%kind, %err, "text extraction failed"))?;

        if extracted.is_blank() {
            return Err(ExtractionError::NoText.into());
        }

        let full_text = extracted.joined();
        let text = cap_text(&full_text, self.settings.max_text_chars);
        if text.len() < full_text.len() {
            info!(
                pages = extracted.pages().len(),
                limit = self.settings.max_text_chars,
                "document text truncated before generation"
            );
        }

        let candidates = timeout(
            self.settings.generate_timeout,
            self.generator.generate(text, self.settings.target_questions),
        )
        .await
        .map_err(|_| GenerationError::TimedOut {
            secs: secs(self.settings.generate_timeout),
        })
        .and_then(|result| result)
        .inspect_err(|err| warn!(%err, "question generation failed"))?;

        let received = candidates.len();
        let set = QuestionSet::from_candidates(candidates)?;
        info!(
            received,
            accepted = set.len(),
            rejected = set.rejected().len(),
            "questions ingested"
        );
        Ok(set)
    }
}

/// Longest prefix of `text` holding at most `max_chars` characters.
#[must_use]
pub fn cap_text(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

fn secs(duration: Duration) -> u64 {
    duration.as_secs()
}
