//! Agent entrypoint — the binary the broker's `interview-*` dispatch rule
//! spawns. Takes the room it was dispatched into, extracts the session id,
//! builds its service handles from config and runs exactly one interview.

use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use intervue_agent::{AgentSettings, AgentState, InterviewAgent};
use intervue_ai::AiServices;
use intervue_broker::{session_id_from_room, RoomClient, RoomGrants, TokenMinter};
use intervue_core::config::{IntervueConfig, ROOM_TOKEN_TTL_SECS};
use intervue_report::Finalizer;
use intervue_store::SessionStore;

#[derive(Parser)]
#[command(name = "intervue-agent", about = "Per-session interview agent worker")]
struct Args {
    /// Room name the broker dispatched us into (e.g. interview-<session-id>).
    #[arg(long, env = "BROKER_ROOM")]
    room: String,

    /// Path to intervue.toml.
    #[arg(long, env = "INTERVUE_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "intervue_agent=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = IntervueConfig::load(args.config.as_deref()).unwrap_or_else(|e| {
        warn!("config load failed ({e}), using defaults");
        IntervueConfig::default()
    });

    let session_id: intervue_core::types::SessionId = session_id_from_room(&args.room)
        .ok_or_else(|| anyhow::anyhow!("room '{}' is not an interview room", args.room))?
        .into();

    // An agent that cannot reach the broker exits; the session continues in
    // text-only mode.
    let broker = config
        .broker
        .clone()
        .ok_or_else(|| anyhow::anyhow!("no broker configured, agent cannot join a room"))?;

    let store = Arc::new(SessionStore::open(&config.storage.url)?);
    let session = store.get_session(&session_id)?;
    let ai = Arc::new(AiServices::from_config(&config));
    let finalizer = Finalizer::new(Arc::clone(&store), Arc::clone(&ai));
    let voice = intervue_ai::build_realtime(&config);
    let settings = AgentSettings::from_config(&config);

    let minter = TokenMinter::new(broker.api_key, broker.api_secret);
    let identity = format!("agent-{}", uuid::Uuid::new_v4());
    let token = minter.mint(
        &identity,
        chrono::Duration::seconds(ROOM_TOKEN_TTL_SECS as i64),
        RoomGrants::participant(&args.room),
    )?;
    let client = RoomClient::new(broker.url);
    let connect = client.connect(&args.room, &token.token);

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_cancel.cancel();
        }
    });

    let agent = InterviewAgent::new(session, voice, finalizer, settings);
    let state = agent.run(connect, cancel).await;
    info!(session_id = %session_id, state = ?state, "agent finished");

    if state == AgentState::Done {
        Ok(())
    } else {
        std::process::exit(1);
    }
}
