use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;
use crate::shuffle::Shuffler;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question id is missing")]
    MissingId,

    #[error("question text cannot be empty")]
    EmptyText,

    #[error("need at least {min} distinct options, got {count}")]
    TooFewOptions { count: usize, min: usize },

    #[error("correct answer is missing")]
    MissingCorrectAnswer,

    #[error("correct answer {answer:?} is not one of the options")]
    CorrectAnswerNotAnOption { answer: String },
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// A question candidate as produced by the generator, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDraft {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<u64>,
    #[serde(default, alias = "question")]
    pub text: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default, alias = "correctAnswer")]
    pub correct_answer: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
}

impl QuestionDraft {
    /// Minimum number of distinct options a question must offer.
    pub const MIN_OPTIONS: usize = 2;

    /// Validate the candidate into a `Question`.
    ///
    /// Text and options are trimmed. Blank options are dropped and exact
    /// duplicates collapsed (first occurrence wins) before the option count
    /// is checked.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` describing the first rule the candidate breaks.
    pub fn validate(self) -> Result<Question, QuestionError> {
        let id = self.id.map(QuestionId::new).ok_or(QuestionError::MissingId)?;

        let text = self.text.trim();
        if text.is_empty() {
            return Err(QuestionError::EmptyText);
        }

        let mut options: Vec<String> = Vec::with_capacity(self.options.len());
        for raw in &self.options {
            let option = raw.trim();
            if option.is_empty() {
                continue;
            }
            if !options.iter().any(|o| o == option) {
                options.push(option.to_string());
            }
        }
        if options.len() < Self::MIN_OPTIONS {
            return Err(QuestionError::TooFewOptions {
                count: options.len(),
                min: Self::MIN_OPTIONS,
            });
        }

        let correct_answer = self
            .correct_answer
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or(QuestionError::MissingCorrectAnswer)?;
        if !options.iter().any(|o| o == correct_answer) {
            return Err(QuestionError::CorrectAnswerNotAnOption {
                answer: correct_answer.to_string(),
            });
        }

        let explanation = self
            .explanation
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());

        Ok(Question {
            id,
            text: text.to_string(),
            options,
            correct_answer: correct_answer.to_string(),
            explanation,
        })
    }
}

/// Generators emit ids as numbers or numeric strings; anything else reads as
/// missing.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Option::<RawId>::deserialize(deserializer)? {
        Some(RawId::Number(n)) => Some(n),
        Some(RawId::Text(s)) => s.trim().parse().ok(),
        Some(RawId::Other(_)) | None => None,
    })
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A validated multiple-choice question.
///
/// `correct_answer` is always one of `options`. The option set never changes
/// after validation; only its order does, through `with_shuffled_options`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    id: QuestionId,
    text: String,
    options: Vec<String>,
    correct_answer: String,
    explanation: Option<String>,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    #[must_use]
    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }

    #[must_use]
    pub fn is_correct(&self, answer: &str) -> bool {
        self.correct_answer == answer
    }

    /// Returns a copy of this question with its options permuted.
    #[must_use]
    pub fn with_shuffled_options(&self, shuffler: &mut Shuffler) -> Self {
        Self {
            options: shuffler.permute(&self.options),
            ..self.clone()
        }
    }
}
