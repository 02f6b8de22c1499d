//! Realtime voice model abstraction.
//!
//! The agent hands a connected room's audio channels plus a per-session
//! instructions string to a [`RealtimeVoice`]; the model drives spoken turns
//! and emits one [`Utterance`] per committed user or assistant turn. Two
//! implementations: the combined OpenAI realtime model, and a local
//! STT+LLM+TTS pipeline that also covers the fully mute degenerate case when
//! no speech services are configured.

pub mod openai;
pub mod pipeline;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::info;

use intervue_broker::AudioFrame;
use intervue_core::config::IntervueConfig;
use intervue_core::types::Role;

use crate::error::Result;
use crate::speech::OpenAiSpeech;

/// One committed spoken turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Utterance {
    pub fn now(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// The audio half of a room handle: inbound participant audio, outbound
/// agent audio.
pub struct RoomAudio {
    pub inbound: mpsc::Receiver<AudioFrame>,
    pub outbound: mpsc::Sender<AudioFrame>,
}

/// A voice backend factory. `start` wires the model to the room and begins
/// driving turns under `instructions`.
#[async_trait]
pub trait RealtimeVoice: Send + Sync {
    async fn start(
        &self,
        audio: RoomAudio,
        instructions: &str,
        utterances: mpsc::Sender<Utterance>,
    ) -> Result<Box<dyn VoiceSession>>;
}

/// A started per-session voice. `say` initiates speech; the spoken text is
/// also emitted as a committed assistant utterance on the event channel.
#[async_trait]
pub trait VoiceSession: Send + Sync {
    async fn say(&self, text: &str) -> Result<()>;
    /// Stop driving turns and release the backend connection.
    async fn close(&self);
}

/// Select the voice backend once at startup.
///
/// Realtime config wins; otherwise the pipeline runs with whatever speech
/// and LLM pieces exist, down to fully mute capture-only when none do.
pub fn build_realtime(config: &IntervueConfig) -> Arc<dyn RealtimeVoice> {
    if let Some(realtime) = &config.realtime {
        info!(model = %realtime.model, voice = %realtime.voice, "realtime voice enabled");
        return Arc::new(openai::OpenAiRealtimeVoice::from_config(realtime));
    }

    let speech = config.speech.as_ref().map(|s| Arc::new(OpenAiSpeech::from_config(s)));
    let llm = config
        .llm
        .as_ref()
        .and_then(|l| crate::llm::LlmClient::from_config(l).ok())
        .map(Arc::new);
    if speech.is_some() {
        info!("no realtime model; using STT+LLM+TTS pipeline voice");
    } else {
        info!("no realtime model and no speech services; agent will run mute");
    }
    Arc::new(pipeline::PipelineVoice::new(speech, llm))
}
