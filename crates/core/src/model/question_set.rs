use std::collections::HashSet;

use tracing::{debug, warn};

use crate::error::IngestionError;
use crate::model::ids::QuestionId;
use crate::model::question::{Question, QuestionDraft, QuestionError};

/// A candidate the generator produced that did not pass validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedCandidate {
    /// Index of the candidate in generator output order.
    pub index: usize,
    pub reason: QuestionError,
}

/// Non-empty, validated set of questions ready to start an exam.
///
/// Order is whatever the generator produced; sessions never present it as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSet {
    questions: Vec<Question>,
    rejected: Vec<RejectedCandidate>,
    duplicate_ids: Vec<QuestionId>,
}

impl QuestionSet {
    /// Validate generator candidates, dropping the ones that break a rule.
    ///
    /// # Errors
    ///
    /// Returns `IngestionError::EmptyResult` when no candidate survives.
    pub fn from_candidates(
        candidates: impl IntoIterator<Item = QuestionDraft>,
    ) -> Result<Self, IngestionError> {
        let mut questions = Vec::new();
        let mut rejected = Vec::new();

        for (index, draft) in candidates.into_iter().enumerate() {
            match draft.validate() {
                Ok(question) => questions.push(question),
                Err(reason) => {
                    debug!(index, %reason, "dropping question candidate");
                    rejected.push(RejectedCandidate { index, reason });
                }
            }
        }

        if questions.is_empty() {
            warn!(rejected = rejected.len(), "no question candidate passed validation");
            return Err(IngestionError::EmptyResult);
        }

        let mut seen = HashSet::new();
        let mut duplicate_ids = Vec::new();
        for id in questions.iter().map(Question::id) {
            if !seen.insert(id) && !duplicate_ids.contains(&id) {
                duplicate_ids.push(id);
            }
        }
        if !duplicate_ids.is_empty() {
            warn!(?duplicate_ids, "generator reused question ids");
        }

        Ok(Self {
            questions,
            rejected,
            duplicate_ids,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Whether the set holds no questions. False for any set built by
    /// `from_candidates`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn rejected(&self) -> &[RejectedCandidate] {
        &self.rejected
    }

    /// Ids that appear on more than one question. Informational only.
    #[must_use]
    pub fn duplicate_ids(&self) -> &[QuestionId] {
        &self.duplicate_ids
    }

    #[must_use]
    pub fn into_questions(self) -> Vec<Question> {
        self.questions
    }
}
