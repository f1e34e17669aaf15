mod document;
mod ids;
mod question;
mod question_set;

pub use document::DocumentKind;
pub use ids::QuestionId;
pub use question::{Question, QuestionDraft, QuestionError};
pub use question_set::{QuestionSet, RejectedCandidate};
