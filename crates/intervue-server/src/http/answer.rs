//! POST /interview/answer — evaluate and persist one scripted-mode answer.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use intervue_ai::EvalContext;
use intervue_core::error::IntervueError;
use intervue_core::types::{SessionId, SessionStatus};

use crate::app::AppState;
use crate::http::{error_response, validation, ApiError, QuestionView};

#[derive(Deserialize)]
pub struct AnswerRequest {
    pub session_id: String,
    pub question_id: String,
    pub user_answer_text: String,
}

#[derive(Serialize)]
pub struct DimensionScores {
    pub relevance: u8,
    pub clarity: u8,
    pub structure: u8,
    pub impact: u8,
}

#[derive(Serialize)]
pub struct AnswerResponse {
    pub score_overall: u8,
    pub dimension_scores: DimensionScores,
    pub coach_notes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_question: Option<QuestionView>,
    pub is_last_question: bool,
}

pub async fn answer_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let answer_text = req.user_answer_text.trim();
    if answer_text.is_empty() {
        return Err(validation("user_answer_text must not be empty"));
    }

    let session_id = SessionId::from(req.session_id);
    let session = state.store.get_session(&session_id).map_err(error_response)?;
    if session.status != SessionStatus::Active {
        return Err(error_response(IntervueError::Conflict(format!(
            "session {} is {}",
            session.id, session.status
        ))));
    }

    let question = state
        .store
        .get_question(&req.question_id)
        .map_err(error_response)?;
    if question.session_id != session.id {
        // A question id from another session is indistinguishable from an
        // unknown one as far as this caller is concerned.
        return Err(error_response(IntervueError::NotFound {
            what: "question",
            id: req.question_id,
        }));
    }

    let scores = state
        .ai
        .evaluate(
            &question.text,
            answer_text,
            &EvalContext {
                job_title: session.job_title.clone(),
                seniority: session.seniority,
                question_index: question.index,
                total_questions: session.num_questions,
            },
        )
        .await;

    // Write-once: a concurrent duplicate surfaces as Conflict here.
    state
        .store
        .insert_answer(&question.id, answer_text, &scores)
        .map_err(error_response)?;

    let next_question = state
        .store
        .question_by_index(&session.id, question.index + 1)
        .map_err(error_response)?;
    let is_last_question = next_question.is_none();
    debug!(
        session_id = %session.id,
        index = question.index,
        overall = scores.overall,
        is_last_question,
        "answer evaluated"
    );

    Ok(Json(AnswerResponse {
        score_overall: scores.overall,
        dimension_scores: DimensionScores {
            relevance: scores.relevance,
            clarity: scores.clarity,
            structure: scores.structure,
            impact: scores.impact,
        },
        coach_notes: scores.coach_notes,
        next_question: next_question.map(QuestionView::from),
        is_last_question,
    }))
}
