use std::sync::Arc;

use quiz_core::{
    IngestionError, IngestionOutcome, IngestionTicket, IngestionToken, QuestionSet,
    ScoreReport, ScoringPolicy, Session, SessionError, Shuffler, score,
};
use tracing::{debug, info};

use crate::config::ExamConfig;
use crate::ingestion::IngestionAdapter;

/// An upload accepted by the session, waiting for the async pipeline.
///
/// Owns its bytes and does not borrow the session, so the UI keeps driving the
/// session (or starts another upload) while this runs.
#[derive(Debug, Clone)]
pub struct PendingIngestion {
    ticket: IngestionTicket,
    bytes: Vec<u8>,
}

impl PendingIngestion {
    #[must_use]
    pub fn token(&self) -> IngestionToken {
        self.ticket.token
    }
}

/// Pipeline result tagged with the attempt it belongs to.
#[derive(Debug, Clone)]
pub struct CompletedIngestion {
    pub token: IngestionToken,
    pub result: Result<QuestionSet, IngestionError>,
}

/// Orchestrates uploads, ingestion and scoring around a caller-owned `Session`.
#[derive(Clone)]
pub struct ExamLoopService {
    adapter: Arc<IngestionAdapter>,
    scoring: ScoringPolicy,
    shuffle_seed: Option<u64>,
}

impl ExamLoopService {
    #[must_use]
    pub fn new(adapter: Arc<IngestionAdapter>, scoring: ScoringPolicy) -> Self {
        Self {
            adapter,
            scoring,
            shuffle_seed: None,
        }
    }

    #[must_use]
    pub fn from_config(config: &ExamConfig) -> Self {
        Self::new(
            Arc::new(IngestionAdapter::from_config(config)),
            config.scoring,
        )
        .with_shuffle_seed(config.shuffle_seed)
    }

    #[must_use]
    pub fn with_shuffle_seed(mut self, seed: Option<u64>) -> Self {
        self.shuffle_seed = seed;
        self
    }

    /// A fresh `Idle` session using this service's shuffle seed.
    #[must_use]
    pub fn new_session(&self) -> Session {
        let shuffler = self.shuffle_seed.map_or(Shuffler::Random, Shuffler::seeded);
        Session::new().with_shuffler(shuffler)
    }

    /// Accept an upload: validates the document type and moves the session to
    /// `Ingesting`, superseding any ingestion still in flight.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidInput` for unsupported uploads.
    pub fn begin_upload(
        &self,
        session: &mut Session,
        bytes: Vec<u8>,
    ) -> Result<PendingIngestion, SessionError> {
        let ticket = session.begin_ingestion(&bytes)?;
        Ok(PendingIngestion { ticket, bytes })
    }

    /// Run extraction and generation for a pending upload.
    pub async fn ingest(&self, pending: PendingIngestion) -> CompletedIngestion {
        let PendingIngestion { ticket, bytes } = pending;
        debug!(token = %ticket.token, kind = %ticket.kind, "running ingestion pipeline");
        let result = self.adapter.ingest(ticket.kind, &bytes).await;
        CompletedIngestion {
            token: ticket.token,
            result,
        }
    }

    /// Apply a pipeline result to the session. Results for superseded
    /// uploads come back as `IngestionOutcome::Stale` and change nothing;
    /// failures leave the session `Idle` with `last_error` set.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` only for contract violations (for example a
    /// session that is no longer ingesting for this token).
    pub fn finish_ingestion(
        &self,
        session: &mut Session,
        completed: CompletedIngestion,
    ) -> Result<IngestionOutcome, SessionError> {
        let CompletedIngestion { token, result } = completed;
        let outcome = match result {
            Ok(set) => session.on_ingestion_succeeded(token, set.into_questions())?,
            Err(err) => session.on_ingestion_failed(token, err.to_string())?,
        };
        if let IngestionOutcome::Stale { token } = outcome {
            info!(%token, "ignored result of a superseded upload");
        }
        Ok(outcome)
    }

    /// Upload, ingest and apply in one call.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidInput` for unsupported uploads.
    pub async fn upload(
        &self,
        session: &mut Session,
        bytes: Vec<u8>,
    ) -> Result<IngestionOutcome, SessionError> {
        let pending = self.begin_upload(session, bytes)?;
        let completed = self.ingest(pending).await;
        self.finish_ingestion(session, completed)
    }

    /// Score a completed session with this service's policy.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless the session is completed.
    pub fn score(&self, session: &Session) -> Result<ScoreReport, SessionError> {
        score(session, &self.scoring)
    }
}
