//! POST /interview/finish — summarize a fully answered scripted session.

use axum::http::StatusCode;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

use intervue_core::types::{Report, SessionId, SessionStatus};

use crate::app::AppState;
use crate::http::{error_response, ApiError};

#[derive(Deserialize)]
pub struct FinishRequest {
    pub session_id: String,
}

#[derive(Serialize)]
pub struct FinishResponse {
    pub session_id: String,
    pub summary: Report,
}

pub async fn finish_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FinishRequest>,
) -> Result<Json<FinishResponse>, ApiError> {
    let session_id = SessionId::from(req.session_id);
    let session = state.store.get_session(&session_id).map_err(error_response)?;

    // Still-active sessions must be fully answered; finished ones fall
    // through to the idempotent finalize and return the stored report.
    if session.status == SessionStatus::Active {
        let unanswered = state
            .store
            .unanswered_indices(&session_id)
            .map_err(error_response)?;
        if !unanswered.is_empty() {
            warn!(session_id = %session_id, ?unanswered, "finish before all questions answered");
            return Err((
                StatusCode::CONFLICT,
                Json(json!({
                    "error": "not all questions have been answered",
                    "code": "CONFLICT",
                    "unanswered": unanswered,
                })),
            ));
        }
    }

    let summary = state
        .finalizer
        .finalize(&session_id)
        .await
        .map_err(error_response)?;
    Ok(Json(FinishResponse {
        session_id: session_id.to_string(),
        summary,
    }))
}
