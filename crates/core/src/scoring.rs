//! Scoring of completed exam attempts.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{Question, QuestionId};
use crate::session::{Operation, Phase, Session, SessionError};

/// Points awarded per correct answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringPolicy {
    pub points_per_question: u32,
}

impl ScoringPolicy {
    pub const DEFAULT_POINTS_PER_QUESTION: u32 = 2;

    #[must_use]
    pub fn new(points_per_question: u32) -> Self {
        Self {
            points_per_question,
        }
    }
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_POINTS_PER_QUESTION)
    }
}

/// What the user chose for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "option", rename_all = "snake_case")]
pub enum UserAnswer {
    Answered(String),
    Unanswered,
}

impl UserAnswer {
    #[must_use]
    pub fn as_option(&self) -> Option<&str> {
        match self {
            UserAnswer::Answered(option) => Some(option),
            UserAnswer::Unanswered => None,
        }
    }
}

/// Breakdown row for one question position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemResult {
    pub position: usize,
    pub question_id: QuestionId,
    pub text: String,
    pub user_answer: UserAnswer,
    pub correct_answer: String,
    pub is_correct: bool,
    pub explanation: Option<String>,
}

impl ItemResult {
    /// The correct answer is always computed; displays only need it when the
    /// user got the item wrong.
    #[must_use]
    pub fn show_correct_answer(&self) -> bool {
        !self.is_correct
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreReport {
    pub correct_count: usize,
    pub total_questions: usize,
    pub total_points: u64,
    pub max_points: u64,
    /// Rounded half up; 0 for an empty exam.
    pub percentage: u32,
    pub attempt: u32,
    pub elapsed_secs: Option<u64>,
    pub items: Vec<ItemResult>,
}

impl ScoreReport {
    #[must_use]
    pub fn incorrect_count(&self) -> usize {
        self.total_questions - self.correct_count
    }

    #[must_use]
    pub fn unanswered_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.user_answer == UserAnswer::Unanswered)
            .count()
    }
}

/// Score a completed session.
///
/// # Errors
///
/// Returns `SessionError::InvalidTransition` unless the session is `Completed`.
pub fn score(session: &Session, policy: &ScoringPolicy) -> Result<ScoreReport, SessionError> {
    if session.phase() != Phase::Completed {
        return Err(SessionError::InvalidTransition {
            operation: Operation::Score,
            phase: session.phase(),
        });
    }

    let mut report = score_answers(session.questions(), session.answers(), policy);
    report.attempt = session.attempt();
    report.elapsed_secs = session.elapsed_secs();
    Ok(report)
}

/// Score answers against questions. Total and side-effect free; missing
/// answers count as incorrect.
#[must_use]
pub fn score_answers(
    questions: &[Question],
    answers: &BTreeMap<usize, String>,
    policy: &ScoringPolicy,
) -> ScoreReport {
    let items: Vec<ItemResult> = questions
        .iter()
        .enumerate()
        .map(|(position, question)| {
            let user_answer = answers
                .get(&position)
                .map_or(UserAnswer::Unanswered, |a| UserAnswer::Answered(a.clone()));
            let is_correct = user_answer
                .as_option()
                .is_some_and(|a| question.is_correct(a));
            ItemResult {
                position,
                question_id: question.id(),
                text: question.text().to_string(),
                user_answer,
                correct_answer: question.correct_answer().to_string(),
                is_correct,
                explanation: question.explanation().map(str::to_string),
            }
        })
        .collect();

    let correct_count = items.iter().filter(|i| i.is_correct).count();
    let total_questions = items.len();
    let points = u64::from(policy.points_per_question);

    ScoreReport {
        correct_count,
        total_questions,
        total_points: points * correct_count as u64,
        max_points: points * total_questions as u64,
        percentage: percentage(correct_count, total_questions),
        attempt: 0,
        elapsed_secs: None,
        items,
    }
}

fn percentage(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let (correct, total) = (correct as u64, total as u64);
    let rounded = (200 * correct + total) / (2 * total);
    u32::try_from(rounded).unwrap_or(100)
}
