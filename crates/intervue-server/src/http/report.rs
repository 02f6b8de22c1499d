//! GET /interview/session/{id}/report — report on demand.
//!
//! Callable at any time, including mid-interview. Finalizes over whatever
//! data exists; an already-finalized session returns its stored report
//! unchanged.

use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;

use intervue_core::types::{Report, SessionId};

use crate::app::AppState;
use crate::http::{error_response, ApiError};

pub async fn report_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Report>, ApiError> {
    let report = state
        .finalizer
        .finalize(&SessionId::from(id))
        .await
        .map_err(error_response)?;
    Ok(Json(report))
}
