use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tracing::info;

use intervue_ai::AiServices;
use intervue_broker::TokenMinter;
use intervue_core::config::IntervueConfig;
use intervue_report::Finalizer;
use intervue_store::SessionStore;

/// Central shared state — passed as Arc<AppState> to all handlers.
pub struct AppState {
    pub config: IntervueConfig,
    pub store: Arc<SessionStore>,
    pub ai: Arc<AiServices>,
    pub finalizer: Finalizer,
    /// Absent when the broker is unconfigured; the token endpoint then
    /// reports text-only mode instead of minting.
    pub minter: Option<TokenMinter>,
}

impl AppState {
    pub fn new(config: IntervueConfig) -> anyhow::Result<Self> {
        let store = Arc::new(SessionStore::open(&config.storage.url)?);
        let ai = Arc::new(AiServices::from_config(&config));
        let finalizer = Finalizer::new(Arc::clone(&store), Arc::clone(&ai));
        let minter = match &config.broker {
            Some(broker) => Some(TokenMinter::new(
                broker.api_key.clone(),
                broker.api_secret.clone(),
            )),
            None => {
                info!("broker not configured; sessions run text-only");
                None
            }
        };
        Ok(Self {
            config,
            store,
            ai,
            finalizer,
            minter,
        })
    }
}

/// Assemble the full router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/interview/start", post(crate::http::start::start_handler))
        .route("/interview/answer", post(crate::http::answer::answer_handler))
        .route("/interview/finish", post(crate::http::finish::finish_handler))
        .route(
            "/interview/session/{id}",
            get(crate::http::session::session_handler),
        )
        .route(
            "/interview/session/{id}/report",
            get(crate::http::report::report_handler),
        )
        .route("/livekit/token", post(crate::http::token::token_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive())
}
