use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tokio::sync::mpsc;

/// Room-name prefix — the sole coupling point between the orchestrator
/// (which mints credentials) and the agent (which extracts the session id
/// from the room it was dispatched into).
pub const ROOM_PREFIX: &str = "interview-";

/// Deterministic session-id → room-name mapping.
pub fn room_name_for(session_id: &str) -> String {
    format!("{ROOM_PREFIX}{session_id}")
}

/// Inverse of [`room_name_for`]. `None` for rooms outside our namespace.
pub fn session_id_from_room(room_name: &str) -> Option<&str> {
    room_name
        .strip_prefix(ROOM_PREFIX)
        .filter(|id| !id.is_empty())
}

/// A chunk of 16-bit mono PCM.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    pub sample_rate: u32,
    pub pcm: Vec<i16>,
}

/// Events delivered to a connected agent.
#[derive(Debug, Clone)]
pub enum RoomEvent {
    ParticipantJoined { identity: String },
    ParticipantDisconnected { identity: String },
    Audio { participant: String, frame: AudioFrame },
}

/// Handle owned by exactly one agent: the room's event stream plus the sink
/// for the agent's own audio. Dropping the handle disconnects.
pub struct RoomHandle {
    pub room_name: String,
    pub events: mpsc::Receiver<RoomEvent>,
    pub audio_out: mpsc::Sender<AudioFrame>,
}

impl RoomHandle {
    pub fn from_parts(
        room_name: impl Into<String>,
        events: mpsc::Receiver<RoomEvent>,
        audio_out: mpsc::Sender<AudioFrame>,
    ) -> Self {
        Self {
            room_name: room_name.into(),
            events,
            audio_out,
        }
    }
}

/// Encode PCM samples for the JSON wire frames (little-endian, base64).
pub(crate) fn encode_pcm(pcm: &[i16]) -> String {
    let mut bytes = Vec::with_capacity(pcm.len() * 2);
    for sample in pcm {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    STANDARD.encode(bytes)
}

pub(crate) fn decode_pcm(encoded: &str) -> Option<Vec<i16>> {
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
    fn room_name_roundtrip() {
        let name = room_name_for("0192-abc");
        assert_eq!(name, "interview-0192-abc");
        assert_eq!(session_id_from_room(&name), Some("0192-abc"));
    }

    #[test]
    fn foreign_rooms_are_rejected() {
        assert_eq!(session_id_from_room("standup-42"), None);
        assert_eq!(session_id_from_room("interview-"), None);
    }

    #[test]
    fn pcm_codec_roundtrip() {
        let pcm: Vec<i16> = vec![0, 1, -1, i16::MAX, i16::MIN, 12345];
        let encoded = encode_pcm(&pcm);
        assert_eq!(decode_pcm(&encoded), Some(pcm));
    }

    #[test]
    fn odd_length_pcm_payload_is_invalid() {
        let encoded = STANDARD.encode([1u8, 2, 3]);
        assert_eq!(decode_pcm(&encoded), None);
    }
}
