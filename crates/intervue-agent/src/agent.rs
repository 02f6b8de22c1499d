//! Per-session interview agent.
//!
//! One instance per session, spawned by the broker's dispatch rule when a
//! participant joins `interview-{session_id}`. Runs as a single cooperative
//! task: voice utterance events, the periodic snapshot timer, room events
//! and cancellation are all folded into one `select!` loop, so the in-memory
//! transcript never needs a lock.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use intervue_ai::{RealtimeVoice, RoomAudio, Utterance, VoiceSession};
use intervue_broker::{BrokerError, RoomEvent, RoomHandle};
use intervue_core::config::{
    IntervueConfig, CONNECT_TIMEOUT_SECS, DISCONNECT_DRAIN_SECS,
};
use intervue_core::types::{Role, Session, TranscriptEntry};
use intervue_report::Finalizer;

use crate::instructions::{build_instructions, greeting_line, CLOSING_LINE};

/// Conversation state machine. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Connecting,
    Greeting,
    Asking,
    Listening,
    Evaluating,
    Closing,
    Finalizing,
    Done,
    Failed,
}

#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub snapshot_interval: Duration,
    pub connect_timeout: Duration,
    /// Deadline for the finalize path when the participant disconnects.
    pub drain_deadline: Duration,
    pub closing_phrases: Vec<String>,
}

impl AgentSettings {
    pub fn from_config(config: &IntervueConfig) -> Self {
        Self {
            snapshot_interval: config.snapshot_interval(),
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            drain_deadline: Duration::from_secs(DISCONNECT_DRAIN_SECS),
            closing_phrases: config.closing_phrases.clone(),
        }
    }
}

pub struct InterviewAgent {
    session: Session,
    voice: Arc<dyn RealtimeVoice>,
    finalizer: Finalizer,
    settings: AgentSettings,
    transcript: Vec<TranscriptEntry>,
    questions_asked: u32,
    state: AgentState,
}

impl InterviewAgent {
    pub fn new(
        session: Session,
        voice: Arc<dyn RealtimeVoice>,
        finalizer: Finalizer,
        settings: AgentSettings,
    ) -> Self {
        let questions_asked = session.questions_asked;
        let transcript = session.transcript.clone().unwrap_or_default();
        Self {
            session,
            voice,
            finalizer,
            settings,
            transcript,
            questions_asked,
            state: AgentState::Connecting,
        }
    }

    /// Drive the interview to completion, participant disconnect, or
    /// cancellation. Returns the terminal state.
    pub async fn run<F>(mut self, connect: F, cancel: CancellationToken) -> AgentState
    where
        F: Future<Output = Result<RoomHandle, BrokerError>>,
    {
        info!(session_id = %self.session.id, "agent starting");
        let room = match tokio::time::timeout(self.settings.connect_timeout, connect).await {
            Ok(Ok(room)) => room,
            Ok(Err(e)) => {
                error!(session_id = %self.session.id, error = %e, "room connect failed");
                return self.fail();
            }
            Err(_) => {
                error!(session_id = %self.session.id, "room connect timed out");
                return self.fail();
            }
        };

        let RoomHandle {
            room_name,
            mut events,
            audio_out,
        } = room;
        debug!(room = %room_name, "room connected");

        // The voice model gets the audio half of the room; join/leave events
        // stay with the agent.
        let (audio_in_tx, audio_in_rx) = mpsc::channel(256);
        let (utterance_tx, mut utterances) = mpsc::channel::<Utterance>(64);
        let instructions = build_instructions(&self.session);
        let voice_session = match self
            .voice
            .start(
                RoomAudio {
                    inbound: audio_in_rx,
                    outbound: audio_out,
                },
                &instructions,
                utterance_tx,
            )
            .await
        {
            Ok(session) => Some(session),
            // Realtime unavailable is a logged no-op: the agent stays in the
            // room and keeps capturing whatever still arrives.
            Err(e) => {
                warn!(session_id = %self.session.id, error = %e, "voice model unavailable, running mute");
                None
            }
        };

        self.state = AgentState::Greeting;
        if let Some(voice) = voice_session.as_deref() {
            if let Err(e) = voice.say(&greeting_line(&self.session.job_title)).await {
                warn!(error = %e, "greeting failed");
            }
        }

        let mut snapshot_timer = tokio::time::interval_at(
            tokio::time::Instant::now() + self.settings.snapshot_interval,
            self.settings.snapshot_interval,
        );
        snapshot_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let mut utterances_open = true;
        loop {
            tokio::select! {
                maybe = utterances.recv(), if utterances_open => {
                    match maybe {
                        Some(utterance) => {
                            if self.handle_utterance(utterance, voice_session.as_deref()).await {
                                break;
                            }
                        }
                        None => utterances_open = false,
                    }
                }
                _ = snapshot_timer.tick() => {
                    self.snapshot();
                }
                maybe = events.recv() => {
                    match maybe {
                        Some(RoomEvent::Audio { frame, .. }) => {
                            // Full voice buffer: drop the frame rather than
                            // stall the event loop.
                            let _ = audio_in_tx.try_send(frame);
                        }
                        Some(RoomEvent::ParticipantJoined { identity }) => {
                            debug!(identity = %identity, "participant joined");
                        }
                        Some(RoomEvent::ParticipantDisconnected { identity }) => {
                            info!(identity = %identity, "participant disconnected");
                            self.on_disconnect().await;
                            break;
                        }
                        None => {
                            info!("room connection closed");
                            self.on_disconnect().await;
                            break;
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    info!(session_id = %self.session.id, "agent cancelled");
                    self.on_disconnect().await;
                    break;
                }
            }
        }

        if let Some(voice) = voice_session.as_deref() {
            voice.close().await;
        }
        // Final best-effort snapshot so no committed utterance is lost.
        self.snapshot();
        info!(session_id = %self.session.id, state = ?self.state, "agent exiting");
        self.state
    }

    /// Returns true when the agent reached a terminal state and the loop
    /// should stop.
    async fn handle_utterance(
        &mut self,
        utterance: Utterance,
        voice: Option<&dyn VoiceSession>,
    ) -> bool {
        self.append_entry(&utterance);
        match utterance.role {
            Role::Assistant => {
                if self.state == AgentState::Closing {
                    // Our thank-you line just committed.
                    return self.finalize_now().await;
                }
                if self.matches_closing(&utterance.text) {
                    // The model concluded on its own; its utterance is the
                    // committed closing line.
                    info!(asked = self.questions_asked, "closing phrase detected");
                    self.state = AgentState::Closing;
                    return self.finalize_now().await;
                }
                if is_question(&utterance.text) {
                    self.questions_asked += 1;
                    debug!(asked = self.questions_asked, "question posed");
                    self.state = AgentState::Listening;
                } else if self.state == AgentState::Greeting {
                    self.state = AgentState::Asking;
                }
                false
            }
            Role::User => {
                self.state = AgentState::Evaluating;
                if self.questions_asked >= self.session.num_questions as u32 {
                    return self.enter_closing(voice).await;
                }
                self.state = AgentState::Asking;
                false
            }
            Role::System => false,
        }
    }

    /// The question budget is exhausted: speak the thank-you line and wait
    /// for it to commit. Without a working voice, finalize directly.
    async fn enter_closing(&mut self, voice: Option<&dyn VoiceSession>) -> bool {
        self.state = AgentState::Closing;
        if let Some(voice) = voice {
            if voice.say(CLOSING_LINE).await.is_ok() {
                return false;
            }
            warn!("failed to speak closing line");
        }
        self.finalize_now().await
    }

    async fn finalize_now(&mut self) -> bool {
        self.state = AgentState::Finalizing;
        self.snapshot();
        match self.finalizer.finalize(&self.session.id).await {
            Ok(report) => {
                info!(
                    session_id = %self.session.id,
                    overall = report.overall_score,
                    "interview finalized"
                );
                self.state = AgentState::Done;
            }
            Err(e) => {
                error!(session_id = %self.session.id, error = %e, "finalize failed");
                let _ = self.finalizer.mark_failed(&self.session.id);
                self.state = AgentState::Failed;
            }
        }
        true
    }

    /// Primary durability path for user-initiated early exits: snapshot,
    /// then finalize (bounded) if anything was captured.
    async fn on_disconnect(&mut self) {
        self.snapshot();
        if self.transcript.is_empty() {
            self.state = AgentState::Done;
            return;
        }
        self.state = AgentState::Finalizing;
        match tokio::time::timeout(
            self.settings.drain_deadline,
            self.finalizer.finalize(&self.session.id),
        )
        .await
        {
            Ok(Ok(_)) => self.state = AgentState::Done,
            Ok(Err(e)) => {
                error!(session_id = %self.session.id, error = %e, "finalize on disconnect failed");
                let _ = self.finalizer.mark_failed(&self.session.id);
                self.state = AgentState::Failed;
            }
            Err(_) => {
                warn!(session_id = %self.session.id, "finalize on disconnect timed out");
                self.state = AgentState::Failed;
            }
        }
    }

    fn snapshot(&self) {
        if self.transcript.is_empty() {
            return;
        }
        if let Err(e) = self.finalizer.persist_partial_transcript(
            &self.session.id,
            &self.transcript,
            self.questions_asked,
        ) {
            warn!(session_id = %self.session.id, error = %e, "transcript snapshot failed");
        }
    }

    /// Append with a monotonicity clamp: wall clocks can step backwards, the
    /// transcript order may not.
    fn append_entry(&mut self, utterance: &Utterance) {
        let mut timestamp = utterance.timestamp;
        if let Some(last) = self.transcript.last() {
            if timestamp < last.timestamp {
                timestamp = last.timestamp;
            }
        }
        self.transcript.push(TranscriptEntry {
            role: utterance.role,
            text: utterance.text.clone(),
            timestamp,
        });
    }

    fn matches_closing(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.settings
            .closing_phrases
            .iter()
            .any(|phrase| lower.contains(&phrase.to_lowercase()))
    }

    fn fail(&mut self) -> AgentState {
        let _ = self.finalizer.mark_failed(&self.session.id);
        self.state = AgentState::Failed;
        self.state
    }
}

/// An assistant turn counts against the question budget when it poses a
/// question.
fn is_question(text: &str) -> bool {
    text.contains('?')
}
