use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use intervue_server::app;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "intervue_server=info,tower_http=debug".into()),
        )
        .init();

    // load config: explicit INTERVUE_CONFIG path > ~/.intervue/intervue.toml
    let config_path = std::env::var("INTERVUE_CONFIG").ok();
    let config = intervue_core::config::IntervueConfig::load(config_path.as_deref())
        .unwrap_or_else(|e| {
            tracing::warn!("config load failed ({}), using defaults", e);
            intervue_core::config::IntervueConfig::default()
        });

    let bind = config.server.bind.clone();
    let port = config.server.port;
    let state = Arc::new(app::AppState::new(config)?);
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    info!("intervue orchestrator listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;

    Ok(())
}
