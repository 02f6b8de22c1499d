//! GET /interview/session/{id} — current session snapshot.

use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;

use intervue_core::types::{Session, SessionId};

use crate::app::AppState;
use crate::http::{error_response, ApiError};

pub async fn session_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    let session = state
        .store
        .get_session(&SessionId::from(id))
        .map_err(error_response)?;
    Ok(Json(session))
}
