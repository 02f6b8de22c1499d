//! Client side of the broker's agent signalling channel.
//!
//! One WebSocket per connected agent. Frames are JSON, tagged by `type`:
//! the broker pushes `participant_joined` / `participant_disconnected` /
//! `audio`; the agent publishes its own `audio` frames back. PCM rides as
//! base64 inside the JSON frames.

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use crate::error::{BrokerError, Result};
use crate::room::{decode_pcm, encode_pcm, AudioFrame, RoomEvent, RoomHandle};

/// Frames exchanged with the broker over the agent channel.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireFrame {
    ParticipantJoined {
        identity: String,
    },
    ParticipantDisconnected {
        identity: String,
    },
    Audio {
        #[serde(default)]
        participant: String,
        sample_rate: u32,
        pcm: String,
    },
}

/// Connects agents to broker rooms.
pub struct RoomClient {
    base_url: String,
}

impl RoomClient {
    /// `base_url` is the broker endpoint, e.g. `wss://broker.example.com`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Join `room_name` with a minted credential and return the event/audio
    /// handle. The returned receiver closes when the broker drops us.
    pub async fn connect(&self, room_name: &str, token: &str) -> Result<RoomHandle> {
        let url = format!(
            "{}/agent?room={}",
            self.base_url.trim_end_matches('/'),
            room_name
        );
        let mut request = url
            .into_client_request()
            .map_err(|e| BrokerError::Connect(e.to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| BrokerError::Connect(e.to_string()))?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        let (ws, _) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| BrokerError::Connect(e.to_string()))?;
        debug!(room = %room_name, "room connected");

        let (mut sink, mut stream) = ws.split();
        let (event_tx, event_rx) = mpsc::channel::<RoomEvent>(256);
        let (audio_tx, mut audio_rx) = mpsc::channel::<AudioFrame>(256);

        // Reader: broker frames -> room events. The event channel closing is
        // the agent's disconnect signal, so the task just exits on error.
        let room = room_name.to_string();
        tokio::spawn(async move {
            while let Some(msg) = stream.next().await {
                let text = match msg {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => continue,
                };
                let frame: WireFrame = match serde_json::from_str(text.as_str()) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!(room = %room, error = %e, "unparseable broker frame");
                        continue;
                    }
                };
                let event = match frame {
                    WireFrame::ParticipantJoined { identity } => {
                        RoomEvent::ParticipantJoined { identity }
                    }
                    WireFrame::ParticipantDisconnected { identity } => {
                        RoomEvent::ParticipantDisconnected { identity }
                    }
                    WireFrame::Audio {
                        participant,
                        sample_rate,
                        pcm,
                    } => match decode_pcm(&pcm) {
                        Some(pcm) => RoomEvent::Audio {
                            participant,
                            frame: AudioFrame { sample_rate, pcm },
                        },
                        None => {
                            warn!(room = %room, "dropping audio frame with bad payload");
                            continue;
                        }
                    },
                };
                if event_tx.send(event).await.is_err() {
                    break;
                }
            }
            debug!(room = %room, "room event stream ended");
        });

        // Writer: agent audio -> broker.
        tokio::spawn(async move {
            while let Some(frame) = audio_rx.recv().await {
                let wire = WireFrame::Audio {
                    participant: String::new(),
                    sample_rate: frame.sample_rate,
                    pcm: encode_pcm(&frame.pcm),
                };
                let json = match serde_json::to_string(&wire) {
                    Ok(json) => json,
                    Err(_) => continue,
                };
                if sink.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            let _ = sink.send(Message::Close(None)).await;
        });

        Ok(RoomHandle::from_parts(room_name, event_rx, audio_tx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_frames_roundtrip() {
        let frame = WireFrame::Audio {
            participant: "candidate".into(),
            sample_rate: 16_000,
            pcm: encode_pcm(&[1, -2, 3]),
        };
        let json = serde_json::to_string(&frame).expect("serialize");
        assert!(json.contains("\"type\":\"audio\""));
        let back: WireFrame = serde_json::from_str(&json).expect("deserialize");
        match back {
            WireFrame::Audio {
                participant,
                sample_rate,
                pcm,
            } => {
                assert_eq!(participant, "candidate");
                assert_eq!(sample_rate, 16_000);
                assert_eq!(decode_pcm(&pcm), Some(vec![1, -2, 3]));
            }
            other => panic!("wrong frame: {other:?}"),
        }
    }

    #[test]
    fn join_and_leave_frames_parse() {
        let joined: WireFrame =
            serde_json::from_str(r#"{"type":"participant_joined","identity":"alice"}"#)
                .expect("parse");
        assert!(matches!(joined, WireFrame::ParticipantJoined { identity } if identity == "alice"));

        let left: WireFrame =
            serde_json::from_str(r#"{"type":"participant_disconnected","identity":"alice"}"#)
                .expect("parse");
        assert!(matches!(
            left,
            WireFrame::ParticipantDisconnected { identity } if identity == "alice"
        ));
    }
}
