//! Exam session state machine.
//!
//! A `Session` is the single source of truth for one exam attempt:
//!
//! ```text
//! Idle ──begin_ingestion──▶ Ingesting ──on_ingestion_succeeded──▶ Active ──advance(last)──▶ Completed
//!   ▲                          │                                     ▲                          │
//!   └──on_ingestion_failed─────┘                                     └──────────retake──────────┘
//! ```
//!
//! `restart` returns to `Idle` from anywhere and `begin_ingestion` is accepted
//! from every phase. Every operation validates before it mutates, so a
//! rejected call leaves the session exactly as it was.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info};

use crate::error::{IngestionError, InputError};
use crate::model::{DocumentKind, Question};
use crate::shuffle::Shuffler;
use crate::time::{Clock, elapsed_secs};

//
// ─── PHASES & OPERATIONS ───────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    #[default]
    Idle,
    Ingesting,
    Active,
    Completed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Ingesting => "ingesting",
            Phase::Active => "active",
            Phase::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// Operations the UI boundary can invoke, named in transition errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    BeginIngestion,
    IngestionSucceeded,
    IngestionFailed,
    SelectAnswer,
    Advance,
    Retreat,
    Retake,
    Restart,
    Score,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::BeginIngestion => "begin ingestion",
            Operation::IngestionSucceeded => "finish ingestion",
            Operation::IngestionFailed => "fail ingestion",
            Operation::SelectAnswer => "select answer",
            Operation::Advance => "advance",
            Operation::Retreat => "go back",
            Operation::Retake => "retake",
            Operation::Restart => "restart",
            Operation::Score => "score",
        };
        f.write_str(name)
    }
}

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("invalid upload: {0}")]
    InvalidInput(#[from] InputError),

    #[error("cannot {operation} while the session is {phase}")]
    InvalidTransition { operation: Operation, phase: Phase },

    #[error("{option:?} is not an option of the current question")]
    InvalidAnswer { option: String },

    #[error("question {} must be answered first", .position + 1)]
    Unanswered { position: usize },

    #[error(transparent)]
    Ingestion(#[from] IngestionError),
}

//
// ─── INGESTION TOKENS ──────────────────────────────────────────────────────────
//

/// Tag for one ingestion attempt. Tokens increase monotonically per session;
/// results carrying anything but the pending token are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IngestionToken(u64);

impl IngestionToken {
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for IngestionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handed out by `begin_ingestion`; the async side carries it back with the
/// result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionTicket {
    pub token: IngestionToken,
    pub kind: DocumentKind,
}

/// What happened to an ingestion result delivered to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionOutcome {
    /// The exam started with this many questions.
    Activated { questions: usize },
    /// The failure was recorded and the session is back to `Idle`.
    Failed,
    /// The result belonged to a superseded attempt and was ignored.
    Stale { token: IngestionToken },
}

/// Result of a successful `advance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The cursor moved to this position.
    Moved(usize),
    Completed,
}

/// Progress snapshot for the UI while an exam is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExamProgress {
    /// 1-based position of the current question.
    pub position: usize,
    pub total: usize,
    pub answered: usize,
    pub current_answered: bool,
    pub is_last: bool,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Default)]
pub struct Session {
    phase: Phase,
    questions: Vec<Question>,
    cursor: usize,
    answers: BTreeMap<usize, String>,
    last_error: Option<String>,
    attempt: u32,
    issued_tokens: u64,
    pending: Option<IngestionToken>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    shuffler: Shuffler,
    clock: Clock,
}

impl Session {
    /// Empty `Idle` session using the thread-local random source and system time.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_shuffler(mut self, shuffler: Shuffler) -> Self {
        self.shuffler = shuffler;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    // ── accessors ────────────────────────────────────────────────────────────

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Questions in presentation order. Empty unless `Active` or `Completed`.
    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Index of the current question; only defined while `Active`.
    #[must_use]
    pub fn cursor(&self) -> Option<usize> {
        (self.phase == Phase::Active).then_some(self.cursor)
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.cursor().and_then(|c| self.questions.get(c))
    }

    /// Selected options keyed by question position.
    #[must_use]
    pub fn answers(&self) -> &BTreeMap<usize, String> {
        &self.answers
    }

    #[must_use]
    pub fn answer_at(&self, position: usize) -> Option<&str> {
        self.answers.get(&position).map(String::as_str)
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// 1-based attempt number for the current question set; 0 when there is none.
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    #[must_use]
    pub fn pending_token(&self) -> Option<IngestionToken> {
        self.pending
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Seconds between the start and completion of the current attempt.
    #[must_use]
    pub fn elapsed_secs(&self) -> Option<u64> {
        Some(elapsed_secs(self.started_at?, self.completed_at?))
    }

    #[must_use]
    pub fn progress(&self) -> Option<ExamProgress> {
        let cursor = self.cursor()?;
        Some(ExamProgress {
            position: cursor + 1,
            total: self.questions.len(),
            answered: self.answers.len(),
            current_answered: self.answers.contains_key(&cursor),
            is_last: cursor + 1 == self.questions.len(),
        })
    }

    /// Whether `advance` would currently succeed.
    #[must_use]
    pub fn can_advance(&self) -> bool {
        self.cursor().is_some_and(|c| self.answers.contains_key(&c))
    }

    /// Whether `retreat` would currently succeed.
    #[must_use]
    pub fn can_retreat(&self) -> bool {
        self.cursor().is_some_and(|c| c > 0)
    }

    // ── ingestion ────────────────────────────────────────────────────────────

    /// Start ingesting an upload, abandoning whatever the session held.
    ///
    /// The document type is checked before anything changes. Any ingestion
    /// still in flight is superseded: its token stops matching.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidInput` for empty or unsupported uploads.
    pub fn begin_ingestion(&mut self, source: &[u8]) -> Result<IngestionTicket, SessionError> {
        let kind = DocumentKind::detect(source)?;

        if let Some(previous) = self.pending {
            debug!(%previous, "superseding in-flight ingestion");
        }
        self.issued_tokens += 1;
        let token = IngestionToken(self.issued_tokens);

        self.discard_exam();
        self.last_error = None;
        self.pending = Some(token);
        self.phase = Phase::Ingesting;
        info!(%token, %kind, bytes = source.len(), "ingestion started");

        Ok(IngestionTicket { token, kind })
    }

    /// Deliver generated questions for the attempt tagged `token`.
    ///
    /// Questions are shuffled and each question's options are shuffled
    /// independently before the exam becomes `Active`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Ingestion(EmptyResult)` when `questions` is
    /// empty; the session then collapses to `Idle` with `last_error` set.
    /// Returns `SessionError::InvalidTransition` if the session is not ingesting.
    pub fn on_ingestion_succeeded(
        &mut self,
        token: IngestionToken,
        questions: Vec<Question>,
    ) -> Result<IngestionOutcome, SessionError> {
        if self.pending != Some(token) {
            debug!(%token, "discarding stale ingestion result");
            return Ok(IngestionOutcome::Stale { token });
        }
        self.require(Operation::IngestionSucceeded, Phase::Ingesting)?;

        if questions.is_empty() {
            let err = IngestionError::EmptyResult;
            self.collapse(err.to_string());
            return Err(err.into());
        }

        self.pending = None;
        self.questions = self.present(&questions);
        self.start_attempt(1);
        info!(%token, questions = self.questions.len(), "exam started");

        Ok(IngestionOutcome::Activated {
            questions: self.questions.len(),
        })
    }

    /// Record a failed ingestion for the attempt tagged `token`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` if the session is not ingesting.
    pub fn on_ingestion_failed(
        &mut self,
        token: IngestionToken,
        message: impl Into<String>,
    ) -> Result<IngestionOutcome, SessionError> {
        if self.pending != Some(token) {
            debug!(%token, "discarding stale ingestion failure");
            return Ok(IngestionOutcome::Stale { token });
        }
        self.require(Operation::IngestionFailed, Phase::Ingesting)?;

        let message = message.into();
        info!(%token, %message, "ingestion failed");
        self.collapse(message);
        Ok(IngestionOutcome::Failed)
    }

    // ── exam traversal ───────────────────────────────────────────────────────

    /// Select `option` for the current question. Re-selecting the same option
    /// is a no-op; a different option replaces the previous selection.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` outside `Active` and
    /// `SessionError::InvalidAnswer` if `option` is not offered.
    pub fn select_answer(&mut self, option: &str) -> Result<(), SessionError> {
        self.require(Operation::SelectAnswer, Phase::Active)?;
        let question = self
            .questions
            .get(self.cursor)
            .ok_or_else(|| self.reject(Operation::SelectAnswer))?;

        if !question.has_option(option) {
            return Err(SessionError::InvalidAnswer {
                option: option.to_string(),
            });
        }

        if self.answer_at(self.cursor) != Some(option) {
            self.answers.insert(self.cursor, option.to_string());
        }
        Ok(())
    }

    /// Move to the next question, or complete the exam from the last one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` outside `Active` and
    /// `SessionError::Unanswered` while the current question has no answer.
    pub fn advance(&mut self) -> Result<Advance, SessionError> {
        self.require(Operation::Advance, Phase::Active)?;
        if !self.answers.contains_key(&self.cursor) {
            return Err(SessionError::Unanswered {
                position: self.cursor,
            });
        }

        if self.cursor + 1 < self.questions.len() {
            self.cursor += 1;
            return Ok(Advance::Moved(self.cursor));
        }

        self.phase = Phase::Completed;
        self.completed_at = Some(self.clock.now());
        info!(
            attempt = self.attempt,
            answered = self.answers.len(),
            "exam completed"
        );
        Ok(Advance::Completed)
    }

    /// Move back one question. Answers are kept.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` outside `Active` or on the
    /// first question.
    pub fn retreat(&mut self) -> Result<usize, SessionError> {
        self.require(Operation::Retreat, Phase::Active)?;
        if self.cursor == 0 {
            return Err(self.reject(Operation::Retreat));
        }
        self.cursor -= 1;
        Ok(self.cursor)
    }

    // ── rebuilds ─────────────────────────────────────────────────────────────

    /// Run the same questions again with fresh question and option order.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless the exam is `Completed`.
    pub fn retake(&mut self) -> Result<(), SessionError> {
        self.require(Operation::Retake, Phase::Completed)?;

        let previous = std::mem::take(&mut self.questions);
        self.questions = self.present(&previous);
        self.start_attempt(self.attempt.saturating_add(1));
        info!(attempt = self.attempt, "exam retake started");
        Ok(())
    }

    /// Discard everything and return to `Idle`. Valid from any phase; an
    /// in-flight ingestion becomes stale.
    pub fn restart(&mut self) {
        if let Some(token) = self.pending.take() {
            debug!(%token, "restart cancels in-flight ingestion");
        }
        self.discard_exam();
        self.last_error = None;
        self.phase = Phase::Idle;
        debug!("session restarted");
    }

    // ── internals ────────────────────────────────────────────────────────────

    fn reject(&self, operation: Operation) -> SessionError {
        SessionError::InvalidTransition {
            operation,
            phase: self.phase,
        }
    }

    fn require(&self, operation: Operation, phase: Phase) -> Result<(), SessionError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(self.reject(operation))
        }
    }

    /// Presentation order: questions permuted, then each option list permuted
    /// with its own draw.
    fn present(&mut self, questions: &[Question]) -> Vec<Question> {
        let ordered = self.shuffler.permute(questions);
        ordered
            .iter()
            .map(|q| q.with_shuffled_options(&mut self.shuffler))
            .collect()
    }

    fn start_attempt(&mut self, attempt: u32) {
        self.cursor = 0;
        self.answers.clear();
        self.attempt = attempt;
        self.started_at = Some(self.clock.now());
        self.completed_at = None;
        self.phase = Phase::Active;
    }

    fn discard_exam(&mut self) {
        self.questions.clear();
        self.answers.clear();
        self.cursor = 0;
        self.attempt = 0;
        self.started_at = None;
        self.completed_at = None;
    }

    fn collapse(&mut self, message: String) {
        self.discard_exam();
        self.pending = None;
        self.last_error = Some(message);
        self.phase = Phase::Idle;
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{QuestionDraft, QuestionId};
    use crate::time::fixed_now;

    const DOC: &[u8] = b"Cells are the basic unit of life.";

    fn question(id: u64) -> Question {
        QuestionDraft {
            id: Some(id),
            text: format!("Question {id}"),
            options: vec![
                format!("right {id}"),
                format!("wrong {id} a"),
                format!("wrong {id} b"),
                format!("wrong {id} c"),
            ],
            correct_answer: Some(format!("right {id}")),
            explanation: None,
        }
        .validate()
        .unwrap()
    }

    fn questions(n: u64) -> Vec<Question> {
        (1..=n).map(question).collect()
    }

    fn session() -> Session {
        Session::new()
            .with_shuffler(Shuffler::seeded(11))
            .with_clock(Clock::fixed(fixed_now()))
    }

    fn active(n: u64) -> Session {
        let mut s = session();
        let ticket = s.begin_ingestion(DOC).unwrap();
        s.on_ingestion_succeeded(ticket.token, questions(n)).unwrap();
        s
    }

    fn answer_current_correctly(s: &mut Session) {
        let right = s.current_question().unwrap().correct_answer().to_string();
        s.select_answer(&right).unwrap();
    }

    fn answer_current_wrongly(s: &mut Session) {
        let q = s.current_question().unwrap();
        let wrong = q
            .options()
            .iter()
            .find(|o| !q.is_correct(o))
            .unwrap()
            .clone();
        s.select_answer(&wrong).unwrap();
    }

    fn completed(n: u64) -> Session {
        let mut s = active(n);
        loop {
            answer_current_correctly(&mut s);
            if s.advance().unwrap() == Advance::Completed {
                return s;
            }
        }
    }

    type Snapshot = (
        Phase,
        Vec<Question>,
        Option<usize>,
        BTreeMap<usize, String>,
        Option<String>,
        u32,
        Option<IngestionToken>,
    );

    fn snapshot(s: &Session) -> Snapshot {
        (
            s.phase(),
            s.questions().to_vec(),
            s.cursor(),
            s.answers().clone(),
            s.last_error().map(str::to_string),
            s.attempt(),
            s.pending_token(),
        )
    }

    fn order_key(s: &Session) -> Vec<(QuestionId, Vec<String>)> {
        s.questions()
            .iter()
            .map(|q| (q.id(), q.options().to_vec()))
            .collect()
    }

    #[test]
    fn new_session_is_idle_and_empty() {
        let s = Session::new();
        assert_eq!(s.phase(), Phase::Idle);
        assert!(s.questions().is_empty());
        assert!(s.answers().is_empty());
        assert_eq!(s.cursor(), None);
        assert_eq!(s.progress(), None);
    }

    #[test]
    fn begin_ingestion_moves_to_ingesting_and_clears_error() {
        let mut s = session();
        let t = s.begin_ingestion(DOC).unwrap();
        s.on_ingestion_failed(t.token, "quota exceeded").unwrap();
        assert_eq!(s.last_error(), Some("quota exceeded"));

        let ticket = s.begin_ingestion(DOC).unwrap();
        assert_eq!(ticket.kind, DocumentKind::PlainText);
        assert_eq!(s.phase(), Phase::Ingesting);
        assert_eq!(s.last_error(), None);
        assert_eq!(s.pending_token(), Some(ticket.token));
    }

    #[test]
    fn unsupported_upload_is_rejected_without_state_change() {
        let mut s = active(3);
        let first = s.current_question().unwrap().options()[0].clone();
        s.select_answer(&first).unwrap();
        let before = snapshot(&s);

        let err = s.begin_ingestion(b"\x89PNG\r\n\x1a\n\0\0").unwrap_err();
        assert_eq!(err, SessionError::InvalidInput(InputError::UnsupportedType));
        let err = s.begin_ingestion(b"").unwrap_err();
        assert_eq!(err, SessionError::InvalidInput(InputError::Empty));
        assert_eq!(snapshot(&s), before);
    }

    #[test]
    fn successful_ingestion_activates_with_shuffled_questions() {
        let s = active(10);
        assert_eq!(s.phase(), Phase::Active);
        assert_eq!(s.cursor(), Some(0));
        assert!(s.answers().is_empty());
        assert_eq!(s.attempt(), 1);
        assert_eq!(s.started_at(), Some(fixed_now()));

        let mut ids: Vec<u64> = s.questions().iter().map(|q| q.id().value()).collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=10).collect::<Vec<_>>());
        for q in s.questions() {
            assert_eq!(q.options().len(), 4);
            assert!(q.has_option(q.correct_answer()));
        }
    }

    #[test]
    fn empty_success_is_treated_as_empty_result() {
        let mut s = session();
        let t = s.begin_ingestion(DOC).unwrap();
        let err = s.on_ingestion_succeeded(t.token, Vec::new()).unwrap_err();

        assert_eq!(err, SessionError::Ingestion(IngestionError::EmptyResult));
        assert_eq!(s.phase(), Phase::Idle);
        assert!(s.questions().is_empty());
        assert!(s.last_error().is_some());
        assert_eq!(s.pending_token(), None);
    }

    #[test]
    fn failed_ingestion_returns_to_idle_with_message() {
        let mut s = session();
        let t = s.begin_ingestion(DOC).unwrap();
        let outcome = s.on_ingestion_failed(t.token, "network unreachable").unwrap();

        assert_eq!(outcome, IngestionOutcome::Failed);
        assert_eq!(s.phase(), Phase::Idle);
        assert_eq!(s.last_error(), Some("network unreachable"));
        assert!(s.questions().is_empty());
    }

    #[test]
    fn superseded_ingestion_result_is_discarded() {
        let mut s = session();
        let first = s.begin_ingestion(DOC).unwrap();
        let second = s.begin_ingestion(DOC).unwrap();
        assert!(second.token > first.token);

        let late = s.on_ingestion_succeeded(first.token, questions(5)).unwrap();
        assert_eq!(late, IngestionOutcome::Stale { token: first.token });
        assert_eq!(s.phase(), Phase::Ingesting);

        let outcome = s.on_ingestion_succeeded(second.token, questions(2)).unwrap();
        assert_eq!(outcome, IngestionOutcome::Activated { questions: 2 });

        let late_failure = s.on_ingestion_failed(first.token, "timeout").unwrap();
        assert!(matches!(late_failure, IngestionOutcome::Stale { .. }));
        assert_eq!(s.phase(), Phase::Active);
        assert_eq!(s.questions().len(), 2);
        assert_eq!(s.last_error(), None);
    }

    #[test]
    fn restart_makes_in_flight_result_stale() {
        let mut s = session();
        let t = s.begin_ingestion(DOC).unwrap();
        s.restart();
        let outcome = s.on_ingestion_succeeded(t.token, questions(3)).unwrap();
        assert!(matches!(outcome, IngestionOutcome::Stale { .. }));
        assert_eq!(s.phase(), Phase::Idle);
        assert!(s.questions().is_empty());
    }

    #[test]
    fn begin_ingestion_abandons_active_exam() {
        let mut s = active(4);
        answer_current_correctly(&mut s);
        s.begin_ingestion(DOC).unwrap();
        assert_eq!(s.phase(), Phase::Ingesting);
        assert!(s.questions().is_empty());
        assert!(s.answers().is_empty());
        assert_eq!(s.attempt(), 0);
    }

    #[test]
    fn traversal_is_rejected_while_ingesting() {
        let mut s = session();
        s.begin_ingestion(DOC).unwrap();
        let before = snapshot(&s);

        assert!(matches!(
            s.select_answer("x"),
            Err(SessionError::InvalidTransition { phase: Phase::Ingesting, .. })
        ));
        assert!(matches!(s.advance(), Err(SessionError::InvalidTransition { .. })));
        assert!(matches!(s.retreat(), Err(SessionError::InvalidTransition { .. })));
        assert!(matches!(s.retake(), Err(SessionError::InvalidTransition { .. })));
        assert_eq!(snapshot(&s), before);
    }

    #[test]
    fn consumed_token_is_stale() {
        let mut s = session();
        let t = s.begin_ingestion(DOC).unwrap();
        s.on_ingestion_succeeded(t.token, questions(2)).unwrap();
        // The token is consumed once the exam is active.
        let again = s.on_ingestion_succeeded(t.token, questions(3)).unwrap();
        assert!(matches!(again, IngestionOutcome::Stale { .. }));
        assert_eq!(s.questions().len(), 2);
    }

    #[test]
    fn select_answer_validates_membership() {
        let mut s = active(2);
        let before = snapshot(&s);
        let err = s.select_answer("not an option").unwrap_err();
        assert_eq!(
            err,
            SessionError::InvalidAnswer {
                option: "not an option".into()
            }
        );
        assert_eq!(snapshot(&s), before);
    }

    #[test]
    fn select_answer_is_idempotent_and_overwrites() {
        let mut s = active(2);
        let options = s.current_question().unwrap().options().to_vec();

        s.select_answer(&options[0]).unwrap();
        let once = snapshot(&s);
        s.select_answer(&options[0]).unwrap();
        assert_eq!(snapshot(&s), once);

        s.select_answer(&options[1]).unwrap();
        assert_eq!(s.answer_at(0), Some(options[1].as_str()));
        assert_eq!(s.answers().len(), 1);
        assert_eq!(s.cursor(), Some(0));
    }

    #[test]
    fn advance_requires_an_answer() {
        let mut s = active(3);
        assert!(!s.can_advance());
        let before = snapshot(&s);
        assert_eq!(s.advance().unwrap_err(), SessionError::Unanswered { position: 0 });
        assert_eq!(snapshot(&s), before);

        answer_current_correctly(&mut s);
        assert!(s.can_advance());
        assert_eq!(s.advance().unwrap(), Advance::Moved(1));
        assert_eq!(s.cursor(), Some(1));
    }

    #[test]
    fn retreat_keeps_answers_and_rejects_at_start() {
        let mut s = active(3);
        assert!(!s.can_retreat());
        assert!(matches!(
            s.retreat(),
            Err(SessionError::InvalidTransition {
                operation: Operation::Retreat,
                ..
            })
        ));

        answer_current_correctly(&mut s);
        s.advance().unwrap();
        assert_eq!(s.retreat().unwrap(), 0);
        assert!(s.answer_at(0).is_some());
        // Going back never requires the target to be answered.
        s.advance().unwrap();
        s.advance().unwrap_err();
        assert_eq!(s.retreat().unwrap(), 0);
    }

    #[test]
    fn last_question_must_be_answered_before_completion() {
        let mut s = active(2);
        answer_current_correctly(&mut s);
        s.advance().unwrap();

        assert_eq!(s.advance().unwrap_err(), SessionError::Unanswered { position: 1 });
        assert_eq!(s.phase(), Phase::Active);

        answer_current_correctly(&mut s);
        assert_eq!(s.advance().unwrap(), Advance::Completed);
        assert_eq!(s.phase(), Phase::Completed);
        assert_eq!(s.completed_at(), Some(fixed_now()));
    }

    #[test]
    fn completed_session_rejects_traversal() {
        let mut s = completed(3);
        let before = snapshot(&s);

        for result in [
            s.select_answer("right 1").map(|()| 0),
            s.advance().map(|_| 0),
            s.retreat(),
        ] {
            assert!(matches!(
                result,
                Err(SessionError::InvalidTransition {
                    phase: Phase::Completed,
                    ..
                })
            ));
        }
        assert_eq!(snapshot(&s), before);
        assert_eq!(s.cursor(), None);
    }

    #[test]
    fn retake_resets_and_reshuffles() {
        let mut s = completed(10);
        let mut previous = order_key(&s);
        let mut changed = 0;

        for round in 0..50 {
            s.retake().unwrap();
            assert_eq!(s.phase(), Phase::Active);
            assert_eq!(s.cursor(), Some(0));
            assert!(s.answers().is_empty());
            assert_eq!(s.attempt(), round + 2);

            let current = order_key(&s);
            if current != previous {
                changed += 1;
            }
            previous = current;

            while s.phase() == Phase::Active {
                answer_current_correctly(&mut s);
                s.advance().unwrap();
            }
        }
        assert!(changed > 0, "retake never changed the order");
    }

    #[test]
    fn retake_is_only_valid_from_completed() {
        let mut s = active(2);
        assert!(matches!(
            s.retake(),
            Err(SessionError::InvalidTransition {
                operation: Operation::Retake,
                phase: Phase::Active
            })
        ));
        let mut idle = session();
        assert!(idle.retake().is_err());
    }

    #[test]
    fn restart_from_any_phase_is_idle_and_empty() {
        let mut ingesting = session();
        ingesting.begin_ingestion(DOC).unwrap();

        let mut with_answers = active(3);
        answer_current_correctly(&mut with_answers);

        for mut s in [ingesting, with_answers, completed(3), session()] {
            s.restart();
            assert_eq!(s.phase(), Phase::Idle);
            assert!(s.questions().is_empty());
            assert!(s.answers().is_empty());
            assert_eq!(s.last_error(), None);
            assert_eq!(s.pending_token(), None);
        }
    }

    #[test]
    fn restart_clears_a_recorded_failure() {
        let mut s = session();
        let t = s.begin_ingestion(DOC).unwrap();
        s.on_ingestion_failed(t.token, "generation service returned status 429")
            .unwrap();
        assert!(s.last_error().is_some());

        s.restart();
        assert_eq!(s.phase(), Phase::Idle);
        assert_eq!(s.last_error(), None);
    }

    #[test]
    fn progress_tracks_position_and_answers() {
        let mut s = active(3);
        answer_current_correctly(&mut s);
        s.advance().unwrap();

        let p = s.progress().unwrap();
        assert_eq!(p.position, 2);
        assert_eq!(p.total, 3);
        assert_eq!(p.answered, 1);
        assert!(!p.current_answered);
        assert!(!p.is_last);

        answer_current_wrongly(&mut s);
        s.advance().unwrap();
        assert!(s.progress().unwrap().is_last);
    }

    #[test]
    fn answers_never_exceed_question_range() {
        let mut s = active(4);
        while s.phase() == Phase::Active {
            answer_current_wrongly(&mut s);
            s.advance().unwrap();
        }
        assert!(s.answers().keys().all(|&k| k < s.questions().len()));
    }

    #[test]
    fn elapsed_time_uses_the_clock() {
        let mut s = Session::new()
            .with_shuffler(Shuffler::seeded(1))
            .with_clock(Clock::fixed(fixed_now()));
        let t = s.begin_ingestion(DOC).unwrap();
        s.on_ingestion_succeeded(t.token, questions(1)).unwrap();
        let mut later = Clock::fixed(fixed_now());
        later.advance(chrono::Duration::seconds(42));
        s.clock = later;

        answer_current_correctly(&mut s);
        s.advance().unwrap();
        assert_eq!(s.elapsed_secs(), Some(42));
    }
}
