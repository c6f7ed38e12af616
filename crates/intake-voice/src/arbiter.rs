//! Speech I/O arbiter: keeps recognition and synthesis mutually exclusive.
//!
//! The arbiter never touches the engines itself; it emits [`Command`]s for the runtime
//! to execute. Recognizer sessions and utterances carry ids handed out here so events
//! from a torn-down session or a preempted utterance are recognised as stale.
//!
//! ```text
//!            listen()                    speak()
//!   Idle ───────────────▶ Listening ───────────────▶ Speaking
//!    ▲  ◀─────────────────    │   ◀───────────────────  │
//!    │  toggle off / error    │    done (not complete)  │
//!    └────────────────────────┴─────────────────────────┘
//!              done (complete) / halt
//! ```

use crate::config::RestartPolicy;
use crate::error::{IntakeError, IntakeResult, ToggleRejection};
use crate::session::Command;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArbiterMode {
    Idle,
    Listening,
    Speaking,
}

/// Outcome of a failed recognizer start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartFailure {
    /// A retry is scheduled after `delay`.
    Retrying { attempt: u32, delay: Duration },
    /// Retries exhausted; listening is off. `restart` tells whether the failed start was
    /// an automatic restart rather than the first start of a listening period.
    GaveUp { restart: bool },
}

#[derive(Debug, Clone)]
pub struct SpeechArbiter {
    mode: ArbiterMode,
    recognition_available: bool,
    policy: RestartPolicy,
    /// Recognizer session currently running or being (re)started.
    active_session: Option<u64>,
    /// Whether `active_session` is an automatic restart.
    restarting: bool,
    last_session: u64,
    current_utterance: Option<u64>,
    last_utterance: u64,
    failed_starts: u32,
}

impl SpeechArbiter {
    pub fn new(recognition_available: bool, policy: RestartPolicy) -> Self {
        Self {
            mode: ArbiterMode::Idle,
            recognition_available,
            policy,
            active_session: None,
            restarting: false,
            last_session: 0,
            current_utterance: None,
            last_utterance: 0,
            failed_starts: 0,
        }
    }

    pub fn mode(&self) -> ArbiterMode {
        self.mode
    }

    pub fn is_listening(&self) -> bool {
        self.mode == ArbiterMode::Listening
    }

    pub fn is_speaking(&self) -> bool {
        self.mode == ArbiterMode::Speaking
    }

    pub fn recognition_available(&self) -> bool {
        self.recognition_available
    }

    /// True when an event from recognizer `session` should reach the dialogue.
    pub fn accepts(&self, session: u64) -> bool {
        self.mode == ArbiterMode::Listening && self.active_session == Some(session)
    }

    /// Start listening. No effect while speaking, when already listening, or when the
    /// platform has no recognizer.
    pub fn listen(&mut self, out: &mut Vec<Command>) -> bool {
        if !self.recognition_available || self.mode != ArbiterMode::Idle {
            return false;
        }
        self.mode = ArbiterMode::Listening;
        self.restarting = false;
        self.start_session(out);
        true
    }

    fn start_session(&mut self, out: &mut Vec<Command>) {
        self.last_session += 1;
        self.active_session = Some(self.last_session);
        debug!(target: "intake::voice", session = self.last_session, restart = self.restarting, "starting recognition");
        out.push(Command::StartRecognition {
            session: self.last_session,
        });
    }

    fn stop_listening(&mut self, out: &mut Vec<Command>) {
        if self.active_session.take().is_some() {
            out.push(Command::StopRecognition);
        }
    }

    /// Begin a new utterance, preempting any in flight. Returns its id.
    pub fn begin_utterance(&mut self, out: &mut Vec<Command>) -> u64 {
        match self.mode {
            ArbiterMode::Speaking => out.push(Command::CancelSpeech),
            ArbiterMode::Listening => self.stop_listening(out),
            ArbiterMode::Idle => {}
        }
        self.mode = ArbiterMode::Speaking;
        self.last_utterance += 1;
        self.current_utterance = Some(self.last_utterance);
        self.last_utterance
    }

    /// Synthesis finished for `utterance`. Returns false for a preempted utterance.
    /// With `resume_listening`, the mic comes back on (if the platform can listen).
    pub fn synthesis_done(&mut self, utterance: u64, resume_listening: bool, out: &mut Vec<Command>) -> bool {
        if self.mode != ArbiterMode::Speaking || self.current_utterance != Some(utterance) {
            debug!(target: "intake::voice", utterance, "stale synthesis completion ignored");
            return false;
        }
        self.current_utterance = None;
        self.mode = ArbiterMode::Idle;
        if resume_listening {
            self.listen(out);
        }
        true
    }

    /// The recognizer reported `session` running.
    pub fn recognition_started(&mut self, session: u64) -> bool {
        if self.active_session != Some(session) {
            return false;
        }
        self.failed_starts = 0;
        true
    }

    /// Recognizer session ended. Restarts it while the mic is meant to be on and the
    /// conversation is not over.
    pub fn recognition_ended(&mut self, session: u64, complete: bool, out: &mut Vec<Command>) {
        if !self.accepts(session) {
            debug!(target: "intake::voice", session, "stale recognition end ignored");
            return;
        }
        self.active_session = None;
        if complete {
            self.mode = ArbiterMode::Idle;
            return;
        }
        self.restarting = true;
        self.start_session(out);
    }

    /// Recognizer reported an error for `session`: listening is forced off.
    pub fn recognition_failed(&mut self, session: u64, out: &mut Vec<Command>) -> bool {
        if !self.accepts(session) {
            return false;
        }
        self.stop_listening(out);
        self.mode = ArbiterMode::Idle;
        warn!(target: "intake::voice", session, "recognition failed; listening off");
        true
    }

    /// The recognizer could not start `session`. Schedules a bounded retry or gives up.
    pub fn start_failed(&mut self, session: u64) -> Option<StartFailure> {
        if !self.accepts(session) {
            return None;
        }
        self.failed_starts += 1;
        if self.failed_starts <= self.policy.max_attempts {
            let attempt = self.failed_starts;
            let delay = self.policy.backoff(attempt);
            info!(target: "intake::voice", session, attempt, ?delay, "recognition start failed; retrying");
            return Some(StartFailure::Retrying { attempt, delay });
        }
        let restart = self.restarting;
        self.active_session = None;
        self.mode = ArbiterMode::Idle;
        self.failed_starts = 0;
        warn!(target: "intake::voice", session, restart, "recognition start failed; giving up");
        Some(StartFailure::GaveUp { restart })
    }

    /// A scheduled retry for `session` is due.
    pub fn retry_due(&mut self, session: u64, out: &mut Vec<Command>) {
        if !self.accepts(session) {
            return;
        }
        self.start_session(out);
    }

    /// Manual mic toggle. Returns the new listening flag.
    pub fn toggle(&mut self, complete: bool, out: &mut Vec<Command>) -> IntakeResult<bool> {
        let rejection = if self.mode == ArbiterMode::Speaking {
            Some(ToggleRejection::Speaking)
        } else if complete {
            Some(ToggleRejection::Complete)
        } else if !self.recognition_available {
            Some(ToggleRejection::Unsupported)
        } else {
            None
        };
        if let Some(reason) = rejection {
            return Err(IntakeError::ToggleRejected(reason));
        }
        if self.mode == ArbiterMode::Listening {
            self.stop_listening(out);
            self.mode = ArbiterMode::Idle;
            info!(target: "intake::voice", "microphone muted");
            Ok(false)
        } else {
            self.failed_starts = 0;
            self.listen(out);
            info!(target: "intake::voice", "microphone enabled");
            Ok(true)
        }
    }

    /// Terminal completion: stop listening. An utterance in flight is left to finish.
    pub fn halt(&mut self, out: &mut Vec<Command>) {
        if self.mode == ArbiterMode::Listening {
            self.stop_listening(out);
            self.mode = ArbiterMode::Idle;
        }
    }

    /// Tear everything down for a restart or shutdown.
    pub fn reset(&mut self, out: &mut Vec<Command>) {
        if self.mode == ArbiterMode::Speaking {
            out.push(Command::CancelSpeech);
        }
        self.stop_listening(out);
        self.current_utterance = None;
        self.restarting = false;
        self.failed_starts = 0;
        self.mode = ArbiterMode::Idle;
    }
}
