use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8321;
pub const DEFAULT_BIND: &str = "127.0.0.1";
/// Agent room-connect timeout before giving up and exiting Failed.
pub const CONNECT_TIMEOUT_SECS: u64 = 30;
/// Per-call timeout for every external service call (broker, LLM, speech).
pub const SERVICE_CALL_TIMEOUT_SECS: u64 = 30;
/// Deadline for the in-flight snapshot when the participant disconnects.
pub const DISCONNECT_DRAIN_SECS: u64 = 5;
/// Minted room credentials expire after this many seconds (2 hours).
pub const ROOM_TOKEN_TTL_SECS: u64 = 2 * 60 * 60;

/// Top-level config (intervue.toml + env overrides).
///
/// The environment variables recognized are exactly the deployment surface:
/// `STORAGE_URL`, `BROKER_URL`, `BROKER_API_KEY`, `BROKER_API_SECRET`,
/// `LLM_PROVIDER`, `LLM_MODEL`, `LLM_API_KEY`, `LLM_TEMPERATURE`,
/// `REALTIME_API_KEY`, `REALTIME_VOICE`, `SNAPSHOT_INTERVAL_SECONDS`.
/// A missing `broker` section means text-only mode; a missing `llm` section
/// selects the in-process fallbacks; a missing `realtime` section leaves the
/// agent mute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntervueConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub broker: Option<BrokerConfig>,
    #[serde(default)]
    pub llm: Option<LlmConfig>,
    #[serde(default)]
    pub realtime: Option<RealtimeConfig>,
    #[serde(default)]
    pub speech: Option<SpeechConfig>,
    /// Period of the agent's transcript snapshot task.
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval_seconds: u64,
    /// Case-insensitive substrings that mark an assistant utterance as the
    /// interview's closing line. Configurable because the canonical list is
    /// model-dependent.
    #[serde(default = "default_closing_phrases")]
    pub closing_phrases: Vec<String>,
}

impl Default for IntervueConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            broker: None,
            llm: None,
            realtime: None,
            speech: None,
            snapshot_interval_seconds: default_snapshot_interval(),
            closing_phrases: default_closing_phrases(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database path, or `:memory:` for tests.
    #[serde(default = "default_storage_url")]
    pub url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            url: default_storage_url(),
        }
    }
}

/// Real-time transport broker credentials. Absence means the session core
/// runs in text-only mode: `/livekit/token` returns 503, everything else
/// keeps working.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Broker endpoint, e.g. `wss://broker.example.com`.
    pub url: String,
    pub api_key: String,
    pub api_secret: String,
}

/// Planner/Evaluator/Summarizer backend. Absence selects the fallbacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider id (`openai`, `groq`, `openrouter`) or a custom label with
    /// `base_url` set.
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    pub api_key: String,
    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,
    /// Override for custom OpenAI-compatible endpoints (no trailing slash).
    pub base_url: Option<String>,
}

/// Realtime voice model backend (combined STT+LLM+TTS). Absence means the
/// agent runs mute and captures only what the speech adapters can transcribe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    pub api_key: String,
    #[serde(default = "default_realtime_voice")]
    pub voice: String,
    #[serde(default = "default_realtime_model")]
    pub model: String,
}

/// Optional separate speech services used when the combined realtime model is
/// unconfigured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    pub api_key: String,
    #[serde(default = "default_stt_model")]
    pub stt_model: String,
    #[serde(default = "default_tts_model")]
    pub tts_model: String,
    #[serde(default = "default_realtime_voice")]
    pub voice: String,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_storage_url() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.intervue/intervue.db", home)
}
fn default_snapshot_interval() -> u64 {
    30
}
fn default_closing_phrases() -> Vec<String> {
    [
        "thank you for completing",
        "that concludes",
        "wraps up",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_llm_provider() -> String {
    "openai".to_string()
}
fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_llm_temperature() -> f32 {
    0.4
}
fn default_realtime_voice() -> String {
    "alloy".to_string()
}
fn default_realtime_model() -> String {
    "gpt-4o-realtime-preview".to_string()
}
fn default_stt_model() -> String {
    "whisper-1".to_string()
}
fn default_tts_model() -> String {
    "tts-1".to_string()
}

impl IntervueConfig {
    /// Load config from a TOML file with env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.intervue/intervue.toml
    /// then merges the recognized environment variables on top.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: IntervueConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(env_overrides())
            .extract()
            .map_err(|e| crate::error::IntervueError::Config(e.to_string()))?;

        Ok(config)
    }

    pub fn snapshot_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.snapshot_interval_seconds.max(1))
    }
}

/// The deployment env vars are flat names, not `INTERVUE_`-prefixed nested
/// paths, so each one is mapped to its config key explicitly.
fn env_overrides() -> Env {
    Env::raw()
        .only(&[
            "STORAGE_URL",
            "BROKER_URL",
            "BROKER_API_KEY",
            "BROKER_API_SECRET",
            "LLM_PROVIDER",
            "LLM_MODEL",
            "LLM_API_KEY",
            "LLM_TEMPERATURE",
            "REALTIME_API_KEY",
            "REALTIME_VOICE",
            "SNAPSHOT_INTERVAL_SECONDS",
        ])
        .map(|key| {
            let mapped = match key.as_str().to_ascii_uppercase().as_str() {
                "STORAGE_URL" => "storage.url",
                "BROKER_URL" => "broker.url",
                "BROKER_API_KEY" => "broker.api_key",
                "BROKER_API_SECRET" => "broker.api_secret",
                "LLM_PROVIDER" => "llm.provider",
                "LLM_MODEL" => "llm.model",
                "LLM_API_KEY" => "llm.api_key",
                "LLM_TEMPERATURE" => "llm.temperature",
                "REALTIME_API_KEY" => "realtime.api_key",
                "REALTIME_VOICE" => "realtime.voice",
                _ => "snapshot_interval_seconds",
            };
            mapped.into()
        })
        .split(".")
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.intervue/intervue.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_text_only_and_fallback() {
        let config = IntervueConfig::default();
        assert!(config.broker.is_none());
        assert!(config.llm.is_none());
        assert!(config.realtime.is_none());
        assert_eq!(config.snapshot_interval_seconds, 30);
        assert_eq!(config.closing_phrases.len(), 3);
    }

    #[test]
    fn snapshot_interval_never_zero() {
        let config = IntervueConfig {
            snapshot_interval_seconds: 0,
            ..Default::default()
        };
        assert_eq!(config.snapshot_interval(), std::time::Duration::from_secs(1));
    }
}
