//! OpenAI realtime voice backend.
//!
//! One WebSocket per session. Inbound room audio is appended to the model's
//! input buffer; the model handles turn detection (server VAD), speech
//! recognition and synthesis. Committed transcripts surface as utterance
//! events; synthesized audio is forwarded to the room's outbound sink.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use intervue_broker::AudioFrame;
use intervue_core::config::RealtimeConfig;
use intervue_core::types::Role;

use crate::error::{AiError, Result};
use crate::realtime::{RealtimeVoice, RoomAudio, Utterance, VoiceSession};

const REALTIME_URL: &str = "wss://api.openai.com/v1/realtime";
/// The realtime API speaks 24 kHz 16-bit mono PCM.
const MODEL_SAMPLE_RATE: u32 = 24_000;

enum Command {
    Send(serde_json::Value),
    Close,
}

pub struct OpenAiRealtimeVoice {
    api_key: String,
    model: String,
    voice: String,
}

impl OpenAiRealtimeVoice {
    pub fn from_config(config: &RealtimeConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            voice: config.voice.clone(),
        }
    }
}

#[async_trait]
impl RealtimeVoice for OpenAiRealtimeVoice {
    async fn start(
        &self,
        audio: RoomAudio,
        instructions: &str,
        utterances: mpsc::Sender<Utterance>,
    ) -> Result<Box<dyn VoiceSession>> {
        let url = format!("{REALTIME_URL}?model={}", self.model);
        let mut request = url
            .into_client_request()
            .map_err(|e| AiError::Unavailable(e.to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| AiError::Unavailable(e.to_string()))?;
        request.headers_mut().insert("authorization", bearer);
        request
            .headers_mut()
            .insert("openai-beta", HeaderValue::from_static("realtime=v1"));

        let (ws, _) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| AiError::Unavailable(format!("realtime connect failed: {e}")))?;
        debug!(model = %self.model, "realtime session connected");

        let (mut sink, mut stream) = ws.split();
        let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(64);

        // Configure the session before any audio flows.
        let setup = json!({
            "type": "session.update",
            "session": {
                "modalities": ["audio", "text"],
                "instructions": instructions,
                "voice": self.voice,
                "input_audio_format": "pcm16",
                "output_audio_format": "pcm16",
                "input_audio_transcription": { "model": "whisper-1" },
                "turn_detection": { "type": "server_vad" },
            }
        });
        cmd_tx
            .send(Command::Send(setup))
            .await
            .map_err(|_| AiError::Unavailable("realtime command channel closed".into()))?;

        // Writer: commands -> socket.
        tokio::spawn(async move {
            while let Some(cmd) = cmd_rx.recv().await {
                match cmd {
                    Command::Send(value) => {
                        let text = value.to_string();
                        if sink.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Command::Close => {
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        });

        // Audio pump: room microphone -> model input buffer.
        let pump_tx = cmd_tx.clone();
        let mut inbound = audio.inbound;
        tokio::spawn(async move {
            while let Some(frame) = inbound.recv().await {
                let append = json!({
                    "type": "input_audio_buffer.append",
                    "audio": encode_pcm_b64(&frame.pcm),
                });
                if pump_tx.send(Command::Send(append)).await.is_err() {
                    break;
                }
            }
        });

        // Reader: model events -> utterances + synthesized audio.
        let reader_tx = cmd_tx.clone();
        let outbound = audio.outbound;
        tokio::spawn(async move {
            while let Some(msg) = stream.next().await {
                let text = match msg {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => continue,
                };
                let event: serde_json::Value = match serde_json::from_str(text.as_str()) {
                    Ok(event) => event,
                    Err(_) => continue,
                };
                match event["type"].as_str().unwrap_or_default() {
                    "conversation.item.input_audio_transcription.completed" => {
                        if let Some(transcript) = event["transcript"].as_str() {
                            let trimmed = transcript.trim();
                            if !trimmed.is_empty() {
                                let _ = utterances
                                    .send(Utterance::now(Role::User, trimmed))
                                    .await;
                            }
                        }
                    }
                    "response.audio_transcript.done" => {
                        if let Some(transcript) = event["transcript"].as_str() {
                            let _ = utterances
                                .send(Utterance::now(Role::Assistant, transcript))
                                .await;
                        }
                    }
                    "response.audio.delta" => {
                        if let Some(delta) = event["delta"].as_str() {
                            if let Some(pcm) = decode_pcm_b64(delta) {
                                let _ = outbound
                                    .send(AudioFrame {
                                        sample_rate: MODEL_SAMPLE_RATE,
                                        pcm,
                                    })
                                    .await;
                            }
                        }
                    }
                    // The user started talking over the model: yield.
                    "input_audio_buffer.speech_started" => {
                        let cancel = json!({ "type": "response.cancel" });
                        let _ = reader_tx.send(Command::Send(cancel)).await;
                    }
                    "error" => {
                        warn!(event = %event, "realtime API error event");
                    }
                    _ => {}
                }
            }
            debug!("realtime event stream ended");
        });

        Ok(Box::new(OpenAiRealtimeSession { cmd_tx }))
    }
}

struct OpenAiRealtimeSession {
    cmd_tx: mpsc::Sender<Command>,
}

#[async_trait]
impl VoiceSession for OpenAiRealtimeSession {
    async fn say(&self, text: &str) -> Result<()> {
        let request = json!({
            "type": "response.create",
            "response": {
                "modalities": ["audio", "text"],
                "instructions": format!("Say exactly this and nothing else: {text}"),
            }
        });
        self.cmd_tx
            .send(Command::Send(request))
            .await
            .map_err(|_| AiError::Unavailable("realtime session closed".into()))
    }

    async fn close(&self) {
        let _ = self.cmd_tx.send(Command::Close).await;
    }
}

fn encode_pcm_b64(pcm: &[i16]) -> String {
    let mut bytes = Vec::with_capacity(pcm.len() * 2);
    for sample in pcm {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    STANDARD.encode(bytes)
}

fn decode_pcm_b64(encoded: &str) -> Option<Vec<i16>> {
    let bytes = STANDARD.decode(encoded).ok()?;
    if bytes.len() % 2 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcm_base64_roundtrip() {
        let pcm: Vec<i16> = vec![0, 500, -500, i16::MAX];
        assert_eq!(decode_pcm_b64(&encode_pcm_b64(&pcm)), Some(pcm));
    }
}
