//! **DialogueSession**: the single owner of one intake conversation.
//!
//! All three event sources (recognizer, synthesizer, caller controls) feed
//! [`SessionEvent`]s into [`DialogueSession::handle`], which updates the record,
//! transcript and arbiter and answers with [`Command`]s for the runtime. Nothing else
//! mutates conversation state, so the session can be driven without any audio hardware.

use crate::arbiter::{ArbiterMode, SpeechArbiter, StartFailure};
use crate::config::{IntakeConfig, SynthesisSettings};
use crate::dialogue::{self, Effect, Transition, GREETING_PROMPT, SUBMISSION_FAILED_PROMPT};
use crate::error::IntakeResult;
use crate::gateway::{TicketRequest, TicketResult};
use crate::record::{ConversationState, IntakeRecord};
use crate::stt::RecognitionErrorKind;
use crate::transcript::Transcript;
use crate::voice_output::{select_preferred_voice, Utterance};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub type EventSender = mpsc::UnboundedSender<SessionEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

/// Everything that can happen to a conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    RecognitionStarted { session: u64 },
    /// Partial transcript; shown live, never acted on.
    RecognitionInterim { session: u64, text: String },
    RecognitionResult { session: u64, text: String },
    RecognitionError { session: u64, kind: RecognitionErrorKind },
    RecognitionEnded { session: u64 },
    RecognitionStartFailed { session: u64, reason: String },
    RecognitionRetryDue { session: u64 },
    SynthesisDone { utterance: u64 },
    /// Typed fallback input; treated like a final transcript.
    TextSubmitted(String),
    ToggleMic,
    Restart,
    GreetingDue { generation: u64 },
    SubmissionFinished {
        generation: u64,
        outcome: Result<TicketResult, String>,
    },
    Shutdown,
}

/// Work the runtime performs on behalf of the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    StartRecognition { session: u64 },
    StopRecognition,
    Speak(Utterance),
    CancelSpeech,
    Submit { generation: u64, request: TicketRequest },
    ScheduleGreeting { generation: u64, delay: Duration },
    ScheduleRecognitionRetry { session: u64, delay: Duration },
    Stop,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    CapabilityMissing,
    Recognition,
    RecognitionStartFailed,
    RecognitionRestartFailed,
    Submission,
}

/// A user-visible error notice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Compact view of the session for status displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub state: ConversationState,
    pub mode: ArbiterMode,
    pub ticket_id: Option<String>,
    pub alert: Option<String>,
    pub live_transcript: String,
}

pub struct DialogueSession {
    settings: SynthesisSettings,
    voice: Option<String>,
    phone_number: String,
    greeting_delay: Duration,
    generation: u64,
    state: ConversationState,
    record: IntakeRecord,
    transcript: Transcript,
    arbiter: SpeechArbiter,
    live_transcript: String,
    pending_input: VecDeque<String>,
    alert: Option<Alert>,
    alerts: Vec<Alert>,
    capability_reported: bool,
    greeted: bool,
    submissions: u32,
    ticket: Option<TicketResult>,
}

impl DialogueSession {
    /// `voices` is the synthesizer's voice list; the preferred voice is picked once.
    pub fn new(config: &IntakeConfig, recognition_available: bool, voices: &[String]) -> Self {
        let voice = select_preferred_voice(voices, &config.synthesis.preferred_voice_hints);
        Self {
            settings: config.synthesis.clone(),
            voice,
            phone_number: config.default_phone_number.clone(),
            greeting_delay: config.greeting_delay(),
            generation: 0,
            state: ConversationState::Greeting,
            record: IntakeRecord::new(config.default_phone_number.clone()),
            transcript: Transcript::new(),
            arbiter: SpeechArbiter::new(recognition_available, config.restart),
            live_transcript: String::new(),
            pending_input: VecDeque::new(),
            alert: None,
            alerts: Vec::new(),
            capability_reported: false,
            greeted: false,
            submissions: 0,
            ticket: None,
        }
    }

    /// Begin a fresh conversation. The greeting follows after the settle delay.
    pub fn start(&mut self) -> Vec<Command> {
        let mut out = Vec::new();
        self.arbiter.reset(&mut out);
        self.generation += 1;
        self.state = ConversationState::Greeting;
        self.record = IntakeRecord::new(self.phone_number.clone());
        self.transcript = Transcript::new();
        self.live_transcript.clear();
        self.pending_input.clear();
        self.alert = None;
        self.greeted = false;
        self.submissions = 0;
        self.ticket = None;

        if !self.arbiter.recognition_available() && !self.capability_reported {
            self.capability_reported = true;
            self.raise(
                AlertKind::CapabilityMissing,
                "Speech recognition is not supported on this device. Please type your responses instead.",
            );
        }

        info!(target: "intake::voice", generation = self.generation, "conversation started");
        out.push(Command::ScheduleGreeting {
            generation: self.generation,
            delay: self.greeting_delay,
        });
        out
    }

    pub fn handle(&mut self, event: SessionEvent) -> Vec<Command> {
        let mut out = Vec::new();
        match event {
            SessionEvent::RecognitionStarted { session } => {
                if self.arbiter.recognition_started(session) {
                    self.alert = None;
                }
            }
            SessionEvent::RecognitionInterim { session, text } => {
                if self.arbiter.accepts(session) {
                    self.live_transcript = text;
                }
            }
            SessionEvent::RecognitionResult { session, text } => {
                if self.arbiter.accepts(session) {
                    self.live_transcript.clear();
                    self.accept_input(&text, &mut out);
                } else {
                    debug!(target: "intake::voice", session, "result outside listening window dropped");
                }
            }
            SessionEvent::RecognitionError { session, kind } => {
                if self.arbiter.recognition_failed(session, &mut out) {
                    self.live_transcript.clear();
                    self.raise(AlertKind::Recognition, kind.guidance());
                }
            }
            SessionEvent::RecognitionEnded { session } => {
                self.arbiter
                    .recognition_ended(session, self.state.is_terminal(), &mut out);
            }
            SessionEvent::RecognitionStartFailed { session, reason } => {
                match self.arbiter.start_failed(session) {
                    Some(StartFailure::Retrying { delay, .. }) => {
                        out.push(Command::ScheduleRecognitionRetry { session, delay });
                    }
                    Some(StartFailure::GaveUp { restart: true }) => {
                        debug!(target: "intake::voice", %reason, "restart failed");
                        self.raise(
                            AlertKind::RecognitionRestartFailed,
                            "Failed to restart voice recognition. Please click the microphone button to try again.",
                        );
                    }
                    Some(StartFailure::GaveUp { restart: false }) => {
                        debug!(target: "intake::voice", %reason, "start failed");
                        self.raise(
                            AlertKind::RecognitionStartFailed,
                            "Failed to start speech recognition. Please ensure you've granted microphone permissions.",
                        );
                    }
                    None => {}
                }
            }
            SessionEvent::RecognitionRetryDue { session } => {
                self.arbiter.retry_due(session, &mut out);
            }
            SessionEvent::SynthesisDone { utterance } => {
                let resume = !self.state.is_terminal() && self.pending_input.is_empty();
                if self.arbiter.synthesis_done(utterance, resume, &mut out) {
                    if let Some(text) = self.pending_input.pop_front() {
                        self.accept_input(&text, &mut out);
                    }
                }
            }
            SessionEvent::TextSubmitted(text) => {
                if self.arbiter.is_speaking() {
                    if self.state.accepts_input() && !text.trim().is_empty() {
                        debug!(target: "intake::voice", "typed input queued until prompt finishes");
                        self.pending_input.push_back(text);
                    }
                } else {
                    self.accept_input(&text, &mut out);
                }
            }
            SessionEvent::ToggleMic => {
                if let Err(e) = self.toggle_mic_into(&mut out) {
                    debug!(target: "intake::voice", error = %e, "toggle ignored");
                }
            }
            SessionEvent::Restart => {
                info!(target: "intake::voice", "restart requested");
                out.extend(self.start());
            }
            SessionEvent::GreetingDue { generation } => {
                if generation == self.generation && !self.greeted && self.state == ConversationState::Greeting {
                    self.greeted = true;
                    self.say(GREETING_PROMPT.to_string(), &mut out);
                }
            }
            SessionEvent::SubmissionFinished { generation, outcome } => {
                if generation != self.generation {
                    debug!(target: "intake::gateway", generation, "submission result from an earlier conversation dropped");
                } else {
                    self.finish_submission(outcome, &mut out);
                }
            }
            SessionEvent::Shutdown => {
                self.arbiter.reset(&mut out);
                out.push(Command::Stop);
            }
        }
        out
    }

    /// Manual mic toggle. Returns the new listening flag.
    pub fn toggle_mic(&mut self) -> IntakeResult<(bool, Vec<Command>)> {
        let mut out = Vec::new();
        let listening = self.toggle_mic_into(&mut out)?;
        Ok((listening, out))
    }

    fn toggle_mic_into(&mut self, out: &mut Vec<Command>) -> IntakeResult<bool> {
        let listening = self.arbiter.toggle(self.state.is_terminal(), out)?;
        if !listening {
            self.live_transcript.clear();
        }
        Ok(listening)
    }

    fn accept_input(&mut self, text: &str, out: &mut Vec<Command>) {
        if !self.state.accepts_input() {
            debug!(target: "intake::voice", state = %self.state, "input ignored");
            return;
        }
        let answer = text.trim();
        if answer.is_empty() {
            return;
        }
        let Some(transition) = dialogue::advance(self.state, &mut self.record, answer) else {
            return;
        };
        self.transcript.push_user(answer);
        self.apply(transition, out);
    }

    fn apply(&mut self, transition: Transition, out: &mut Vec<Command>) {
        self.state = transition.next;
        match transition.effect {
            Effect::None => {
                if let Some(prompt) = transition.prompt {
                    self.say(prompt, out);
                }
            }
            Effect::ConstructAddress => {
                let validation = dialogue::construct_address(&mut self.record);
                self.apply(validation, out);
            }
            Effect::Submit => {
                self.arbiter.halt(out);
                self.submit(out);
            }
        }
    }

    fn submit(&mut self, out: &mut Vec<Command>) {
        if self.submissions > 0 {
            warn!(target: "intake::gateway", "submission already made for this conversation");
            return;
        }
        match TicketRequest::from_record(&self.record) {
            Ok(request) => {
                self.submissions += 1;
                info!(target: "intake::gateway", generation = self.generation, "submitting report");
                out.push(Command::Submit {
                    generation: self.generation,
                    request,
                });
            }
            Err(e) => {
                warn!(target: "intake::gateway", error = %e, "record not submittable");
                self.raise(AlertKind::Submission, SUBMISSION_FAILED_PROMPT);
                self.say(SUBMISSION_FAILED_PROMPT.to_string(), out);
            }
        }
    }

    fn finish_submission(&mut self, outcome: Result<TicketResult, String>, out: &mut Vec<Command>) {
        match outcome {
            Ok(ticket) => {
                let prompt = dialogue::closing_prompt(&ticket.ticket_id);
                info!(target: "intake::gateway", ticket_id = %ticket.ticket_id, "report recorded");
                self.ticket = Some(ticket);
                self.say(prompt, out);
            }
            Err(reason) => {
                warn!(target: "intake::gateway", %reason, "submission failed");
                self.raise(AlertKind::Submission, SUBMISSION_FAILED_PROMPT);
                self.say(SUBMISSION_FAILED_PROMPT.to_string(), out);
            }
        }
    }

    fn say(&mut self, text: String, out: &mut Vec<Command>) {
        self.transcript.push_bot(text.clone());
        let id = self.arbiter.begin_utterance(out);
        out.push(Command::Speak(Utterance::new(
            id,
            text,
            &self.settings,
            self.voice.clone(),
        )));
    }

    fn raise(&mut self, kind: AlertKind, message: impl Into<String>) {
        let alert = Alert {
            kind,
            message: message.into(),
            timestamp: Utc::now(),
        };
        warn!(target: "intake::voice", kind = ?alert.kind, message = %alert.message, "alert raised");
        self.alert = Some(alert.clone());
        self.alerts.push(alert);
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    pub fn record(&self) -> &IntakeRecord {
        &self.record
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn mode(&self) -> ArbiterMode {
        self.arbiter.mode()
    }

    pub fn is_listening(&self) -> bool {
        self.arbiter.is_listening()
    }

    pub fn is_speaking(&self) -> bool {
        self.arbiter.is_speaking()
    }

    pub fn live_transcript(&self) -> &str {
        &self.live_transcript
    }

    /// The alert currently on display, if any.
    pub fn alert(&self) -> Option<&Alert> {
        self.alert.as_ref()
    }

    /// Every alert raised since the session was created.
    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn submissions(&self) -> u32 {
        self.submissions
    }

    pub fn ticket(&self) -> Option<&TicketResult> {
        self.ticket.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.state,
            mode: self.arbiter.mode(),
            ticket_id: self.ticket.as_ref().map(|t| t.ticket_id.clone()),
            alert: self.alert.as_ref().map(|a| a.message.clone()),
            live_transcript: self.live_transcript.clone(),
        }
    }
}
