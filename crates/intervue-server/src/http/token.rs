//! POST /livekit/token — mint scoped room credentials for a participant.
//!
//! Returns 503 with a text-only hint when no broker is configured: the
//! session itself keeps working over the HTTP answer flow.

use axum::http::StatusCode;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use intervue_broker::{room_name_for, RoomGrants};
use intervue_core::config::ROOM_TOKEN_TTL_SECS;
use intervue_core::types::SessionId;

use crate::app::AppState;
use crate::http::{error_response, validation, ApiError};

#[derive(Deserialize)]
pub struct TokenRequest {
    pub session_id: String,
    pub participant_name: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub url: String,
    pub room_name: String,
}

pub async fn token_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let participant = req.participant_name.trim();
    if participant.is_empty() {
        return Err(validation("participant_name must not be empty"));
    }

    let session_id = SessionId::from(req.session_id);
    let session = state.store.get_session(&session_id).map_err(error_response)?;

    let (minter, broker_url) = match (&state.minter, &state.config.broker) {
        (Some(minter), Some(broker)) => (minter, broker.url.clone()),
        _ => {
            warn!(session_id = %session.id, "token requested but broker is unconfigured");
            return Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": "video unavailable: transport broker is not configured",
                    "code": "UNAVAILABLE",
                    "text_only": true,
                })),
            ));
        }
    };

    let room_name = room_name_for(session.id.as_str());
    // Suffix keeps identities collision-free when the same display name
    // joins twice.
    let identity = format!("{}-{}", participant, &uuid::Uuid::new_v4().to_string()[..8]);
    let token = minter
        .mint(
            &identity,
            chrono::Duration::seconds(ROOM_TOKEN_TTL_SECS as i64),
            RoomGrants::participant(&room_name),
        )
        .map_err(error_response)?;

    info!(session_id = %session.id, identity = %identity, "room credentials minted");
    Ok(Json(TokenResponse {
        token: token.token,
        url: broker_url,
        room_name,
    }))
}
