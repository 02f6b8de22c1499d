pub mod answer;
pub mod finish;
pub mod health;
pub mod report;
pub mod session;
pub mod start;
pub mod token;

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, warn};

use intervue_core::error::IntervueError;
use intervue_core::types::Question;

pub(crate) type ApiError = (StatusCode, Json<Value>);

/// Map the error taxonomy onto HTTP status codes, logging server-side
/// failures on the way out.
pub(crate) fn error_response(e: impl Into<IntervueError>) -> ApiError {
    let e = e.into();
    let status = match &e {
        IntervueError::Validation(_) => StatusCode::BAD_REQUEST,
        IntervueError::NotFound { .. } => StatusCode::NOT_FOUND,
        IntervueError::Conflict(_) => StatusCode::CONFLICT,
        IntervueError::Unavailable(_) | IntervueError::Timeout { .. } => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!(code = e.code(), error = %e, "request failed");
    } else {
        warn!(code = e.code(), error = %e, "request rejected");
    }
    (status, Json(json!({ "error": e.to_string(), "code": e.code() })))
}

pub(crate) fn validation(message: impl Into<String>) -> ApiError {
    error_response(IntervueError::Validation(message.into()))
}

/// Question shape returned to clients.
#[derive(Debug, Serialize)]
pub struct QuestionView {
    pub question_id: String,
    pub index: u32,
    pub kind: String,
    pub competency: String,
    pub text: String,
}

impl From<Question> for QuestionView {
    fn from(q: Question) -> Self {
        Self {
            question_id: q.id,
            index: q.index,
            kind: q.kind.to_string(),
            competency: q.competency,
            text: q.text,
        }
    }
}
