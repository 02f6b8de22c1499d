use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use intervue_core::config::{IntervueConfig, SERVICE_CALL_TIMEOUT_SECS};
use intervue_core::types::{AnswerScores, Report, Seniority};

use crate::coach::{Evaluator, Planner, Summarizer};
use crate::error::AiError;
use crate::fallback::FallbackCoach;
use crate::llm::LlmClient;
use crate::types::{
    EvalContext, PlanRequest, PlannedQuestion, ScriptedSummaryInput, TranscriptSummaryInput,
};

/// The AI service layer handed to the orchestrator, the finalizer and the
/// agent.
///
/// Holds the primary implementation (when an LLM is configured) and the
/// in-process fallback, both selected once at startup. Every primary call is
/// bounded by a timeout; quota errors, transport failures and timeouts all
/// degrade to the fallback instead of reaching the caller, so the public
/// methods are infallible.
pub struct AiServices {
    primary: Option<Arc<LlmClient>>,
    fallback: FallbackCoach,
    call_timeout: Duration,
}

impl AiServices {
    pub fn from_config(config: &IntervueConfig) -> Self {
        let primary = match &config.llm {
            Some(llm) => match LlmClient::from_config(llm) {
                Ok(client) => {
                    info!(provider = %llm.provider, model = %llm.model, "LLM coach enabled");
                    Some(Arc::new(client))
                }
                Err(e) => {
                    warn!(error = %e, "LLM config rejected, using fallback coach");
                    None
                }
            },
            None => {
                info!("no LLM configured, using fallback coach");
                None
            }
        };
        Self {
            primary,
            fallback: FallbackCoach::new(),
            call_timeout: Duration::from_secs(SERVICE_CALL_TIMEOUT_SECS),
        }
    }

    /// Fallback-only services, for tests and for deployments with no keys.
    pub fn fallback_only() -> Self {
        Self {
            primary: None,
            fallback: FallbackCoach::new(),
            call_timeout: Duration::from_secs(SERVICE_CALL_TIMEOUT_SECS),
        }
    }

    pub fn llm_client(&self) -> Option<Arc<LlmClient>> {
        self.primary.clone()
    }

    pub async fn plan(&self, req: &PlanRequest) -> Vec<PlannedQuestion> {
        if let Some(primary) = &self.primary {
            match self.bounded(primary.generate_interview_plan(req)).await {
                Ok(plan) => return plan,
                Err(e) => warn!(error = %e, "planner unavailable, falling back"),
            }
        }
        self.fallback.plan(req)
    }

    pub async fn evaluate(
        &self,
        question: &str,
        answer: &str,
        ctx: &EvalContext,
    ) -> AnswerScores {
        if let Some(primary) = &self.primary {
            match self.bounded(primary.evaluate_answer(question, answer, ctx)).await {
                Ok(scores) => return scores,
                Err(e) => warn!(error = %e, "evaluator unavailable, falling back"),
            }
        }
        self.fallback.evaluate(question, answer, ctx)
    }

    pub async fn summarize_session(&self, input: &ScriptedSummaryInput) -> Report {
        if let Some(primary) = &self.primary {
            match self.bounded(primary.summarize_session(input)).await {
                Ok(report) => return report,
                Err(e) => warn!(error = %e, "summarizer unavailable, falling back"),
            }
        }
        self.fallback.summarize_scripted(input)
    }

    pub async fn summarize_transcript(&self, input: &TranscriptSummaryInput) -> Report {
        if let Some(primary) = &self.primary {
            match self.bounded(primary.summarize_transcript(input)).await {
                Ok(report) => return report,
                Err(e) => warn!(error = %e, "summarizer unavailable, falling back"),
            }
        }
        self.fallback.summarize_conversational(input)
    }

    /// Degenerate report for sessions with no data at all.
    pub fn empty_session_report(&self, job_title: &str, seniority: Seniority) -> Report {
        self.fallback.empty_session_report(job_title, seniority)
    }

    async fn bounded<T>(
        &self,
        fut: impl std::future::Future<Output = crate::error::Result<T>>,
    ) -> crate::error::Result<T> {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(AiError::Timeout {
                ms: self.call_timeout.as_millis() as u64,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intervue_core::types::ReportSource;

    #[tokio::test]
    async fn fallback_only_services_always_answer() {
        let services = AiServices::fallback_only();
        let req = PlanRequest {
            job_title: "QA Engineer".into(),
            seniority: Seniority::Junior,
            language: "en".into(),
            num_questions: 4,
        };
        let plan = services.plan(&req).await;
        assert_eq!(plan.len(), 4);

        let scores = services
            .evaluate(
                &plan[0].text,
                "I would reproduce the bug, write a failing test, then fix it.",
                &EvalContext {
                    job_title: req.job_title.clone(),
                    seniority: req.seniority,
                    question_index: 1,
                    total_questions: 4,
                },
            )
            .await;
        assert!(scores.overall <= 100);

        let report = services
            .summarize_session(&ScriptedSummaryInput {
                job_title: req.job_title,
                seniority: req.seniority,
                pairs: vec![],
                unanswered: vec![1, 2, 3, 4],
            })
            .await;
        assert_eq!(report.generated_by, ReportSource::Fallback);
    }
}
