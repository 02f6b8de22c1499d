//! Transcript persistence and the finalize convergence point.
//!
//! Every completion trigger (agent completion detection, agent disconnect
//! handler, client-invoked finish, client-invoked report-on-demand) funnels
//! through [`Finalizer::finalize`]; the store's conditional write decides
//! the single winner and everyone returns the committed report.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument, warn};

use intervue_ai::{AiServices, ScriptedSummaryInput, TranscriptSummaryInput};
use intervue_core::error::IntervueError;
use intervue_core::types::{Report, Session, SessionId, SessionMode, SessionStatus, TranscriptEntry};
use intervue_store::{SessionStore, StoreError};

#[derive(Debug, Error)]
pub enum FinalizeError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invariant violation: {0}")]
    Invariant(String),
}

impl From<FinalizeError> for IntervueError {
    fn from(e: FinalizeError) -> Self {
        match e {
            FinalizeError::Store(e) => e.into(),
            FinalizeError::Invariant(msg) => IntervueError::Internal(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, FinalizeError>;

/// The only writer of `Session.summary`.
#[derive(Clone)]
pub struct Finalizer {
    store: Arc<SessionStore>,
    ai: Arc<AiServices>,
}

impl Finalizer {
    pub fn new(store: Arc<SessionStore>, ai: Arc<AiServices>) -> Self {
        Self { store, ai }
    }

    /// Idempotent transcript snapshot. Safe under concurrent calls; the
    /// agent is the sole writer per session, so last-writer-wins on the
    /// whole-snapshot column is correct.
    pub fn persist_partial_transcript(
        &self,
        session_id: &SessionId,
        entries: &[TranscriptEntry],
        questions_asked: u32,
    ) -> Result<()> {
        self.store
            .append_or_replace_transcript(session_id, entries, questions_asked)?;
        Ok(())
    }

    /// Mark an active session failed. Sessions are only ever mutated through
    /// the orchestrator and this component.
    pub fn mark_failed(&self, session_id: &SessionId) -> Result<()> {
        self.store.mark_failed(session_id)?;
        Ok(())
    }

    /// Converge on the session's one report.
    ///
    /// Already-completed sessions return the stored summary unchanged.
    /// Otherwise a report is produced (LLM, falling back in-process) over
    /// whatever data exists, and the store's conditional write resolves any
    /// race. Empty sessions get a degenerate zero-score report rather than
    /// an error, so a completed session always carries a summary.
    #[instrument(skip(self))]
    pub async fn finalize(&self, session_id: &SessionId) -> Result<Report> {
        let session = self.store.get_session(session_id)?;

        if let Some(summary) = stored_summary(&session)? {
            return Ok(summary);
        }

        let report = self.build_report(&session).await?;
        let committed = match session.status {
            SessionStatus::Active => self.store.finalize_session(session_id, &report)?,
            // Terminal failure stays terminal, but the report is preserved
            // so a retried report request eventually observes it.
            SessionStatus::Failed => self.store.attach_report_to_failed(session_id, &report)?,
            SessionStatus::Completed => unreachable!("handled above"),
        };
        info!(
            session_id = %session_id,
            overall = committed.overall_score,
            partial = committed.is_partial(),
            "session finalized"
        );
        Ok(committed)
    }

    async fn build_report(&self, session: &Session) -> Result<Report> {
        let transcript = session.transcript.clone().unwrap_or_default();

        match session.mode {
            SessionMode::Scripted => {
                let pairs = self.store.answered_pairs(&session.id)?;
                let unanswered = self.store.unanswered_indices(&session.id)?;
                if transcript.is_empty() && pairs.is_empty() {
                    warn!(session_id = %session.id, "finalizing a session with no interview data");
                    return Ok(self
                        .ai
                        .empty_session_report(&session.job_title, session.seniority));
                }
                let input = ScriptedSummaryInput {
                    job_title: session.job_title.clone(),
                    seniority: session.seniority,
                    pairs,
                    unanswered,
                };
                Ok(self.ai.summarize_session(&input).await)
            }
            SessionMode::Conversational => {
                if transcript.is_empty() {
                    warn!(session_id = %session.id, "finalizing a session with no interview data");
                    return Ok(self
                        .ai
                        .empty_session_report(&session.job_title, session.seniority));
                }
                let input = TranscriptSummaryInput {
                    job_title: session.job_title.clone(),
                    seniority: session.seniority,
                    transcript,
                    questions_asked: session.questions_asked,
                    target_questions: session.num_questions,
                };
                Ok(self.ai.summarize_transcript(&input).await)
            }
        }
    }
}

/// The summary of a session that already left `active` with one, if any.
fn stored_summary(session: &Session) -> Result<Option<Report>> {
    match session.status {
        SessionStatus::Completed => match &session.summary {
            Some(summary) => Ok(Some(summary.clone())),
            None => Err(FinalizeError::Invariant(format!(
                "session {} is completed without a summary",
                session.id
            ))),
        },
        SessionStatus::Failed => Ok(session.summary.clone()),
        SessionStatus::Active => Ok(None),
    }
}
