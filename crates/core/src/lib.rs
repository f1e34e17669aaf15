//! Domain core for randomized document exams.
//!
//! Everything in this crate is synchronous and free of I/O: the question
//! store, the shuffle primitive, the exam session state machine and the
//! scoring engine. Talking to extraction and generation services lives in the
//! `services` crate.

#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod scoring;
pub mod session;
pub mod shuffle;
pub mod time;

pub use error::{IngestionError, InputError};
pub use model::{DocumentKind, Question, QuestionDraft, QuestionError, QuestionId, QuestionSet};
pub use scoring::{ItemResult, ScoreReport, ScoringPolicy, UserAnswer, score, score_answers};
pub use session::{
    Advance, ExamProgress, IngestionOutcome, IngestionTicket, IngestionToken, Operation, Phase, Session,
    SessionError,
};
pub use shuffle::{Shuffler, shuffle, shuffle_with};
pub use time::Clock;
