mod workflow;

pub use workflow::{CompletedIngestion, ExamLoopService, PendingIngestion};
