//! Narrow speech adapters, used by the pipeline voice when the combined
//! realtime model is unconfigured.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use intervue_core::config::SpeechConfig;

use crate::error::{AiError, Result};

/// Sample rate of synthesized speech (OpenAI PCM output).
pub const TTS_SAMPLE_RATE: u32 = 24_000;

#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe a finished utterance of 16-bit mono PCM.
    async fn transcribe(&self, pcm: &[i16], sample_rate: u32) -> Result<String>;
}

#[async_trait]
pub trait TextToSpeech: Send + Sync {
    /// Synthesize speech; returns 16-bit mono PCM at [`TTS_SAMPLE_RATE`].
    async fn synthesize(&self, text: &str) -> Result<Vec<i16>>;
}

/// OpenAI-compatible audio endpoints.
pub struct OpenAiSpeech {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    stt_model: String,
    tts_model: String,
    voice: String,
}

impl OpenAiSpeech {
    pub fn from_config(config: &SpeechConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "https://api.openai.com".to_string(),
            api_key: config.api_key.clone(),
            stt_model: config.stt_model.clone(),
            tts_model: config.tts_model.clone(),
            voice: config.voice.clone(),
        }
    }
}

#[async_trait]
impl SpeechToText for OpenAiSpeech {
    async fn transcribe(&self, pcm: &[i16], sample_rate: u32) -> Result<String> {
        let wav = encode_wav(pcm, sample_rate)?;
        let part = reqwest::multipart::Part::bytes(wav)
            .file_name("utterance.wav")
            .mime_str("audio/wav")
            .map_err(|e| AiError::Parse(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .text("model", self.stt_model.clone())
            .part("file", part);

        let resp = self
            .client
            .post(format!("{}/v1/audio/transcriptions", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status == 429 {
            return Err(AiError::RateLimited {
                retry_after_ms: 5000,
            });
        }
        if !resp.status().is_success() {
            let message = resp.text().await.unwrap_or_default();
            warn!(status, body = %message, "transcription API error");
            return Err(AiError::Api { status, message });
        }

        let body: TranscriptionResponse = resp
            .json()
            .await
            .map_err(|e| AiError::Parse(e.to_string()))?;
        Ok(body.text)
    }
}

#[async_trait]
impl TextToSpeech for OpenAiSpeech {
    async fn synthesize(&self, text: &str) -> Result<Vec<i16>> {
        let resp = self
            .client
            .post(format!("{}/v1/audio/speech", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.tts_model,
                "voice": self.voice,
                "input": text,
                "response_format": "pcm",
            }))
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status == 429 {
            return Err(AiError::RateLimited {
                retry_after_ms: 5000,
            });
        }
        if !resp.status().is_success() {
            let message = resp.text().await.unwrap_or_default();
            warn!(status, body = %message, "speech API error");
            return Err(AiError::Api { status, message });
        }

        let bytes = resp.bytes().await?;
        if bytes.len() % 2 != 0 {
            return Err(AiError::Parse("PCM payload has odd length".into()));
        }
        Ok(bytes
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect())
    }
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// In-memory WAV container around raw PCM, as the transcription endpoint
/// wants a real audio file.
fn encode_wav(pcm: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| AiError::Parse(e.to_string()))?;
        for sample in pcm {
            writer
                .write_sample(*sample)
                .map_err(|e| AiError::Parse(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| AiError::Parse(e.to_string()))?;
    }
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_encoding_roundtrips_through_hound() {
        let pcm: Vec<i16> = (0..480).map(|i| (i * 13 % 800) as i16 - 400).collect();
        let wav = encode_wav(&pcm, 16_000).expect("encode");

        let mut reader =
            hound::WavReader::new(std::io::Cursor::new(wav)).expect("read back");
        assert_eq!(reader.spec().sample_rate, 16_000);
        assert_eq!(reader.spec().channels, 1);
        let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, pcm);
    }
}
