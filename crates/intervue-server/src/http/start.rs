//! POST /interview/start — create a session and, in scripted mode, its
//! pre-generated question list.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use intervue_ai::PlanRequest;
use intervue_core::types::{Seniority, SessionMode};
use intervue_store::store::{NewQuestion, NewSession};

use crate::app::AppState;
use crate::http::{error_response, validation, ApiError, QuestionView};

/// Inclusive bounds on the question budget.
const MAX_QUESTIONS: u32 = 20;

#[derive(Deserialize)]
pub struct StartRequest {
    pub job_title: String,
    pub seniority: String,
    #[serde(default = "default_language")]
    pub language: String,
    pub num_questions: u32,
    /// `scripted` (default) or `conversational`.
    #[serde(default)]
    pub mode: Option<String>,
}

fn default_language() -> String {
    "en".to_string()
}

#[derive(Serialize)]
pub struct StartResponse {
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_question: Option<QuestionView>,
}

pub async fn start_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StartRequest>,
) -> Result<Json<StartResponse>, ApiError> {
    let job_title = req.job_title.trim().to_string();
    if job_title.is_empty() {
        return Err(validation("job_title must not be empty"));
    }
    let seniority: Seniority = req
        .seniority
        .parse()
        .map_err(|e: String| validation(e))?;
    if req.num_questions < 1 || req.num_questions > MAX_QUESTIONS {
        return Err(validation(format!(
            "num_questions must be within 1..={MAX_QUESTIONS}"
        )));
    }
    let mode: SessionMode = match req.mode.as_deref() {
        None => SessionMode::default(),
        Some(raw) => raw.parse().map_err(|e: String| validation(e))?,
    };

    let session = state
        .store
        .create_session(NewSession {
            job_title: job_title.clone(),
            seniority,
            language: req.language.clone(),
            mode,
            num_questions: req.num_questions as u8,
        })
        .map_err(error_response)?;

    // Scripted sessions get their questions up front; the planner degrades
    // to the template bank internally, so this cannot fail on LLM trouble.
    let first_question = match mode {
        SessionMode::Scripted => {
            let plan = state
                .ai
                .plan(&PlanRequest {
                    job_title,
                    seniority,
                    language: req.language,
                    num_questions: session.num_questions,
                })
                .await;
            let planned: Vec<NewQuestion> = plan
                .into_iter()
                .map(|q| NewQuestion {
                    kind: q.kind,
                    competency: q.competency,
                    text: q.text,
                })
                .collect();
            let questions = state
                .store
                .insert_questions(&session.id, &planned)
                .map_err(error_response)?;
            questions.into_iter().next().map(QuestionView::from)
        }
        SessionMode::Conversational => None,
    };

    info!(session_id = %session.id, %mode, n = session.num_questions, "session created");
    Ok(Json(StartResponse {
        session_id: session.id.to_string(),
        first_question,
    }))
}
