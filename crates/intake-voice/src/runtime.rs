//! **Intake runtime**: drives a [`DialogueSession`] from engine and caller events.
//!
//! One task owns the session and the engines. Engines, timers and the submission task
//! only ever talk back through the event queue, so every state change happens on this
//! loop in arrival order. Keep an [`IntakeHandle`] to type answers, toggle the mic,
//! restart, or shut the loop down.

use crate::config::IntakeConfig;
use crate::error::{IntakeError, IntakeResult};
use crate::gateway::{SubmissionGateway, TicketResult};
use crate::record::{ConversationState, IntakeRecord};
use crate::session::{
    Alert, Command, DialogueSession, EventReceiver, EventSender, SessionEvent, SessionStatus,
};
use crate::stt::Recognizer;
use crate::transcript::Transcript;
use crate::voice_output::Synthesizer;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Final state of a conversation when the loop stops.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub state: ConversationState,
    pub record: IntakeRecord,
    pub transcript: Transcript,
    pub alerts: Vec<Alert>,
    pub submissions: u32,
    pub ticket: Option<TicketResult>,
}

impl From<&DialogueSession> for SessionSnapshot {
    fn from(session: &DialogueSession) -> Self {
        Self {
            state: session.state(),
            record: session.record().clone(),
            transcript: session.transcript().clone(),
            alerts: session.alerts().to_vec(),
            submissions: session.submissions(),
            ticket: session.ticket().cloned(),
        }
    }
}

/// Caller-side controls for a running intake loop.
#[derive(Debug, Clone)]
pub struct IntakeHandle {
    tx: EventSender,
    status: watch::Receiver<SessionStatus>,
}

impl IntakeHandle {
    /// Text fallback: treated exactly like a recognized answer.
    pub fn submit_text(&self, text: impl Into<String>) -> IntakeResult<()> {
        self.send(SessionEvent::TextSubmitted(text.into()))
    }

    pub fn toggle_mic(&self) -> IntakeResult<()> {
        self.send(SessionEvent::ToggleMic)
    }

    /// Discard the record and transcript and start a new conversation.
    pub fn restart(&self) -> IntakeResult<()> {
        self.send(SessionEvent::Restart)
    }

    pub fn shutdown(&self) -> IntakeResult<()> {
        self.send(SessionEvent::Shutdown)
    }

    pub fn send(&self, event: SessionEvent) -> IntakeResult<()> {
        self.tx
            .send(event)
            .map_err(|e| IntakeError::ChannelSend(e.to_string()))
    }

    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    /// Subscribe to status changes (state, mic mode, alert, ticket).
    pub fn watch_status(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    /// Wait until the status satisfies `predicate`.
    pub async fn wait_for<F>(&self, mut predicate: F) -> IntakeResult<SessionStatus>
    where
        F: FnMut(&SessionStatus) -> bool,
    {
        let mut rx = self.status.clone();
        let status = rx
            .wait_for(|s| predicate(s))
            .await
            .map_err(|e| IntakeError::ChannelReceive(e.to_string()))?;
        Ok(status.clone())
    }
}

pub struct IntakeRuntime {
    config: IntakeConfig,
    recognizer: Box<dyn Recognizer>,
    synthesizer: Box<dyn Synthesizer>,
    gateway: Arc<dyn SubmissionGateway>,
    events_tx: EventSender,
    events_rx: EventReceiver,
    status_tx: watch::Sender<SessionStatus>,
    status_rx: watch::Receiver<SessionStatus>,
}

impl IntakeRuntime {
    pub fn new(
        config: IntakeConfig,
        recognizer: Box<dyn Recognizer>,
        synthesizer: Box<dyn Synthesizer>,
        gateway: Arc<dyn SubmissionGateway>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let initial = SessionStatus {
            state: ConversationState::Greeting,
            mode: crate::arbiter::ArbiterMode::Idle,
            ticket_id: None,
            alert: None,
            live_transcript: String::new(),
        };
        let (status_tx, status_rx) = watch::channel(initial);
        Self {
            config,
            recognizer,
            synthesizer,
            gateway,
            events_tx,
            events_rx,
            status_tx,
            status_rx,
        }
    }

    pub fn handle(&self) -> IntakeHandle {
        IntakeHandle {
            tx: self.events_tx.clone(),
            status: self.status_rx.clone(),
        }
    }

    /// Run until [`SessionEvent::Shutdown`]. Returns the conversation as it stood.
    pub async fn run(mut self) -> IntakeResult<SessionSnapshot> {
        let voices = self.synthesizer.voices();
        let mut session = DialogueSession::new(&self.config, self.recognizer.is_available(), &voices);
        info!(
            target: "intake::voice",
            recognition = self.recognizer.is_available(),
            voices = voices.len(),
            "intake loop started"
        );

        let mut commands = session.start();
        loop {
            let mut stop = false;
            for command in commands {
                if self.execute(command) {
                    stop = true;
                }
            }
            self.status_tx.send_replace(session.status());
            if stop {
                break;
            }

            let event = self
                .events_rx
                .recv()
                .await
                .ok_or_else(|| IntakeError::ChannelReceive("event queue closed".to_string()))?;
            commands = session.handle(event);
        }

        info!(target: "intake::voice", state = %session.state(), "intake loop stopped");
        Ok(SessionSnapshot::from(&session))
    }

    /// Carry out one command. Returns true on `Stop`.
    fn execute(&mut self, command: Command) -> bool {
        match command {
            Command::StartRecognition { session } => {
                let event = match self.recognizer.start(session, self.events_tx.clone()) {
                    Ok(()) => SessionEvent::RecognitionStarted { session },
                    Err(e) => SessionEvent::RecognitionStartFailed {
                        session,
                        reason: e.to_string(),
                    },
                };
                self.post(event);
            }
            Command::StopRecognition => self.recognizer.stop(),
            Command::Speak(utterance) => {
                let id = utterance.id;
                if let Err(e) = self.synthesizer.speak(utterance, self.events_tx.clone()) {
                    // Treat as finished so the arbiter does not stay stuck in Speaking.
                    warn!(target: "intake::voice", error = %e, "synthesis failed");
                    self.post(SessionEvent::SynthesisDone { utterance: id });
                }
            }
            Command::CancelSpeech => self.synthesizer.cancel(),
            Command::Submit { generation, request } => {
                let gateway = Arc::clone(&self.gateway);
                let tx = self.events_tx.clone();
                tokio::spawn(async move {
                    let outcome = gateway.submit(&request).await.map_err(|e| e.to_string());
                    let _ = tx.send(SessionEvent::SubmissionFinished { generation, outcome });
                });
            }
            Command::ScheduleGreeting { generation, delay } => {
                self.post_after(delay, SessionEvent::GreetingDue { generation });
            }
            Command::ScheduleRecognitionRetry { session, delay } => {
                self.post_after(delay, SessionEvent::RecognitionRetryDue { session });
            }
            Command::Stop => {
                self.recognizer.stop();
                self.synthesizer.cancel();
                return true;
            }
        }
        false
    }

    fn post(&self, event: SessionEvent) {
        if let Err(e) = self.events_tx.send(event) {
            debug!(target: "intake::voice", error = %e, "event dropped");
        }
    }

    fn post_after(&self, delay: std::time::Duration, event: SessionEvent) {
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(event);
        });
    }
}
