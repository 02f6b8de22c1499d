pub mod bank;
pub mod coach;
pub mod error;
pub mod fallback;
pub mod llm;
pub mod realtime;
pub mod services;
pub mod speech;
pub mod types;

pub use coach::{Evaluator, Planner, Summarizer};
pub use error::{AiError, Result};
pub use fallback::FallbackCoach;
pub use llm::LlmClient;
pub use realtime::{build_realtime, RealtimeVoice, RoomAudio, Utterance, VoiceSession};
pub use services::AiServices;
pub use types::{EvalContext, PlanRequest, PlannedQuestion, ScriptedSummaryInput, TranscriptSummaryInput};
