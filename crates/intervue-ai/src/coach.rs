use async_trait::async_trait;

use intervue_core::types::{AnswerScores, Report};

use crate::error::Result;
use crate::types::{EvalContext, PlanRequest, PlannedQuestion, ScriptedSummaryInput, TranscriptSummaryInput};

/// Generates the ordered question list for a scripted session.
///
/// Implementations must return exactly `req.num_questions` entries.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn generate_interview_plan(&self, req: &PlanRequest) -> Result<Vec<PlannedQuestion>>;
}

/// Scores one answer against its question.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate_answer(
        &self,
        question: &str,
        answer: &str,
        ctx: &EvalContext,
    ) -> Result<AnswerScores>;
}

/// Produces the structured end-of-session report.
///
/// `completion_note` must be present iff the input is partial.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize_session(&self, input: &ScriptedSummaryInput) -> Result<Report>;
    async fn summarize_transcript(&self, input: &TranscriptSummaryInput) -> Result<Report>;
}
