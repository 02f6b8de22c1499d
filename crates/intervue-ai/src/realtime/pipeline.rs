//! STT + LLM + TTS pipeline voice.
//!
//! Used when no combined realtime model is configured. Inbound room audio
//! runs through RMS-based voice activity detection; each finished utterance
//! is transcribed, answered by the chat LLM under the session instructions,
//! and spoken back through TTS. Missing pieces degrade gracefully: without
//! TTS the agent is silent but still converses in events, without STT it is
//! fully mute and only `say` produces utterances.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use intervue_broker::AudioFrame;
use intervue_core::types::Role;

use crate::error::{AiError, Result};
use crate::llm::{ChatMessage, LlmClient};
use crate::realtime::{RealtimeVoice, RoomAudio, Utterance, VoiceSession};
use crate::speech::{OpenAiSpeech, SpeechToText, TextToSpeech, TTS_SAMPLE_RATE};

/// RMS energy above which a frame counts as speech.
const RMS_THRESHOLD: f32 = 500.0;
/// Trailing silence that ends an utterance.
const SILENCE_MS: u32 = 700;
/// Utterances shorter than this are discarded as noise.
const MIN_SPEECH_MS: u32 = 300;
/// Outbound audio chunk size (100 ms at the TTS rate).
const OUT_CHUNK_SAMPLES: usize = (TTS_SAMPLE_RATE / 10) as usize;

enum Command {
    Say(String),
    Close,
}

pub struct PipelineVoice {
    stt: Option<Arc<dyn SpeechToText>>,
    tts: Option<Arc<dyn TextToSpeech>>,
    llm: Option<Arc<LlmClient>>,
}

impl PipelineVoice {
    pub fn new(speech: Option<Arc<OpenAiSpeech>>, llm: Option<Arc<LlmClient>>) -> Self {
        Self {
            stt: speech.clone().map(|s| s as Arc<dyn SpeechToText>),
            tts: speech.map(|s| s as Arc<dyn TextToSpeech>),
            llm,
        }
    }

    /// Assemble from individual parts; test seam.
    pub fn from_parts(
        stt: Option<Arc<dyn SpeechToText>>,
        tts: Option<Arc<dyn TextToSpeech>>,
        llm: Option<Arc<LlmClient>>,
    ) -> Self {
        Self { stt, tts, llm }
    }
}

#[async_trait]
impl RealtimeVoice for PipelineVoice {
    async fn start(
        &self,
        audio: RoomAudio,
        instructions: &str,
        utterances: mpsc::Sender<Utterance>,
    ) -> Result<Box<dyn VoiceSession>> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>(16);
        let driver = Driver {
            stt: self.stt.clone(),
            tts: self.tts.clone(),
            llm: self.llm.clone(),
            instructions: instructions.to_string(),
            utterances,
            outbound: audio.outbound,
            history: Vec::new(),
            mute_logged: false,
        };
        tokio::spawn(driver.run(audio.inbound, cmd_rx));
        Ok(Box::new(PipelineSession { cmd_tx }))
    }
}

struct PipelineSession {
    cmd_tx: mpsc::Sender<Command>,
}

#[async_trait]
impl VoiceSession for PipelineSession {
    async fn say(&self, text: &str) -> Result<()> {
        self.cmd_tx
            .send(Command::Say(text.to_string()))
            .await
            .map_err(|_| AiError::Unavailable("pipeline voice closed".into()))
    }

    async fn close(&self) {
        let _ = self.cmd_tx.send(Command::Close).await;
    }
}

struct Driver {
    stt: Option<Arc<dyn SpeechToText>>,
    tts: Option<Arc<dyn TextToSpeech>>,
    llm: Option<Arc<LlmClient>>,
    instructions: String,
    utterances: mpsc::Sender<Utterance>,
    outbound: mpsc::Sender<AudioFrame>,
    history: Vec<ChatMessage>,
    mute_logged: bool,
}

impl Driver {
    async fn run(mut self, mut inbound: mpsc::Receiver<AudioFrame>, mut cmds: mpsc::Receiver<Command>) {
        let mut vad = VadBuffer::default();
        let mut inbound_open = true;
        loop {
            tokio::select! {
                frame = inbound.recv(), if inbound_open => {
                    match frame {
                        Some(frame) => {
                            if let Some(utterance_pcm) = vad.push(&frame) {
                                self.handle_user_turn(utterance_pcm, vad.sample_rate).await;
                            }
                        }
                        // Room audio gone; keep serving `say` until closed.
                        None => {
                            inbound_open = false;
                            if let Some(pcm) = vad.flush() {
                                self.handle_user_turn(pcm, vad.sample_rate).await;
                            }
                        }
                    }
                }
                cmd = cmds.recv() => {
                    match cmd {
                        Some(Command::Say(text)) => self.speak(&text).await,
                        Some(Command::Close) | None => break,
                    }
                }
            }
        }
        debug!("pipeline voice driver stopped");
    }

    async fn handle_user_turn(&mut self, pcm: Vec<i16>, sample_rate: u32) {
        let Some(stt) = self.stt.clone() else {
            if !self.mute_logged {
                warn!("no STT configured; dropping captured audio");
                self.mute_logged = true;
            }
            return;
        };

        let text = match stt.transcribe(&pcm, sample_rate).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "transcription failed; user turn dropped");
                return;
            }
        };
        let text = text.trim().to_string();
        if text.is_empty() {
            return;
        }
        let _ = self.utterances.send(Utterance::now(Role::User, &text)).await;
        self.history.push(ChatMessage {
            role: Role::User,
            content: text,
        });

        let Some(llm) = self.llm.clone() else {
            return;
        };
        match llm.chat(&self.instructions, &self.history).await {
            Ok(reply) => {
                self.history.push(ChatMessage {
                    role: Role::Assistant,
                    content: reply.clone(),
                });
                let _ = self
                    .utterances
                    .send(Utterance::now(Role::Assistant, &reply))
                    .await;
                self.synthesize(&reply).await;
            }
            Err(e) => warn!(error = %e, "pipeline LLM turn failed"),
        }
    }

    /// Scripted speech (greeting, closing line). Recorded in the history so
    /// the LLM sees its own prior turns.
    async fn speak(&mut self, text: &str) {
        self.history.push(ChatMessage {
            role: Role::Assistant,
            content: text.to_string(),
        });
        let _ = self
            .utterances
            .send(Utterance::now(Role::Assistant, text))
            .await;
        self.synthesize(text).await;
    }

    async fn synthesize(&self, text: &str) {
        let Some(tts) = self.tts.clone() else {
            return;
        };
        match tts.synthesize(text).await {
            Ok(pcm) => {
                for chunk in pcm.chunks(OUT_CHUNK_SAMPLES) {
                    if self
                        .outbound
                        .send(AudioFrame {
                            sample_rate: TTS_SAMPLE_RATE,
                            pcm: chunk.to_vec(),
                        })
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
            }
            Err(e) => warn!(error = %e, "speech synthesis failed"),
        }
    }
}

/// RMS-gated utterance accumulator.
#[derive(Default)]
struct VadBuffer {
    buffer: Vec<i16>,
    in_speech: bool,
    silence_samples: u32,
    sample_rate: u32,
}

impl VadBuffer {
    /// Feed one frame. Returns a finished utterance when trailing silence
    /// crosses the window.
    fn push(&mut self, frame: &AudioFrame) -> Option<Vec<i16>> {
        if self.sample_rate == 0 {
            self.sample_rate = frame.sample_rate.max(1);
        }
        let loud = rms_energy(&frame.pcm) > RMS_THRESHOLD;

        if loud {
            self.in_speech = true;
            self.silence_samples = 0;
            self.buffer.extend_from_slice(&frame.pcm);
            return None;
        }
        if !self.in_speech {
            return None;
        }

        self.buffer.extend_from_slice(&frame.pcm);
        self.silence_samples += frame.pcm.len() as u32;
        let silence_ms = self.silence_samples * 1000 / self.sample_rate;
        if silence_ms >= SILENCE_MS {
            return self.flush();
        }
        None
    }

    fn flush(&mut self) -> Option<Vec<i16>> {
        if !self.in_speech {
            return None;
        }
        self.in_speech = false;
        self.silence_samples = 0;
        let pcm = std::mem::take(&mut self.buffer);
        let speech_ms = pcm.len() as u32 * 1000 / self.sample_rate.max(1);
        (speech_ms >= MIN_SPEECH_MS).then_some(pcm)
    }
}

fn rms_energy(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|&s| (s as f32).powi(2)).sum::<f32>() / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(sample: i16, len: usize) -> AudioFrame {
        AudioFrame {
            sample_rate: 16_000,
            pcm: vec![sample; len],
        }
    }

    #[test]
    fn rms_separates_speech_from_silence() {
        assert!(rms_energy(&vec![2000i16; 160]) > RMS_THRESHOLD);
        assert!(rms_energy(&vec![10i16; 160]) < RMS_THRESHOLD);
        assert_eq!(rms_energy(&[]), 0.0);
    }

    #[test]
    fn vad_emits_one_utterance_after_silence() {
        let mut vad = VadBuffer::default();
        // 500 ms of speech
        for _ in 0..50 {
            assert!(vad.push(&frame(3000, 160)).is_none());
        }
        // 700 ms of silence ends the turn
        let mut result = None;
        for _ in 0..80 {
            if let Some(pcm) = vad.push(&frame(0, 160)) {
                result = Some(pcm);
                break;
            }
        }
        let pcm = result.expect("utterance");
        assert!(pcm.len() >= 50 * 160);

        // Once flushed, silence produces nothing further.
        assert!(vad.push(&frame(0, 160)).is_none());
    }

    #[test]
    fn vad_discards_blips_shorter_than_min_speech() {
        let mut vad = VadBuffer::default();
        // 50 ms blip
        for _ in 0..5 {
            vad.push(&frame(3000, 160));
        }
        for _ in 0..80 {
            assert!(vad.push(&frame(0, 160)).is_none());
        }
    }

    #[tokio::test]
    async fn mute_pipeline_still_emits_say_utterances() {
        let voice = PipelineVoice::from_parts(None, None, None);
        let (out_tx, _out_rx) = mpsc::channel(8);
        let (_in_tx, in_rx) = mpsc::channel(8);
        let (utt_tx, mut utt_rx) = mpsc::channel(8);

        let session = voice
            .start(
                RoomAudio {
                    inbound: in_rx,
                    outbound: out_tx,
                },
                "You are an interviewer.",
                utt_tx,
            )
            .await
            .expect("start");

        session.say("Welcome to your interview.").await.expect("say");
        let utterance = utt_rx.recv().await.expect("utterance");
        assert_eq!(utterance.role, Role::Assistant);
        assert_eq!(utterance.text, "Welcome to your interview.");
        session.close().await;
    }
}
