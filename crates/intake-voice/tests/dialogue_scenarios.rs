//! Conversation scenarios driven through the session reducer with simulated engines.

use intake_voice::dialogue::{ADDRESS_RETRY_PROMPT, SUBMISSION_FAILED_PROMPT};
use intake_voice::{
    AlertKind, ArbiterMode, Command, ConversationState, DialogueSession, IntakeConfig,
    IntakeError, RecognitionErrorKind, SessionEvent, TicketRequest, TicketResult,
    ToggleRejection,
};
use std::collections::VecDeque;

/// Plays the engines' part: utterances finish at once, scheduled events fire at once,
/// and recognizer starts succeed unless `fail_starts` is set.
struct Harness {
    session: DialogueSession,
    recognizer_session: Option<u64>,
    queue: VecDeque<SessionEvent>,
    submits: Vec<TicketRequest>,
    spoken: Vec<String>,
    fail_starts: bool,
    hold_speech: bool,
}

impl Harness {
    fn new() -> Self {
        Self::with_recognition(true)
    }

    fn with_recognition(available: bool) -> Self {
        let session = DialogueSession::new(&IntakeConfig::default(), available, &[]);
        let mut h = Self {
            session,
            recognizer_session: None,
            queue: VecDeque::new(),
            submits: Vec::new(),
            spoken: Vec::new(),
            fail_starts: false,
            hold_speech: false,
        };
        let out = h.session.start();
        h.run(out);
        h.drain();
        h
    }

    fn run(&mut self, commands: Vec<Command>) {
        for command in commands {
            match command {
                Command::Speak(u) => {
                    self.spoken.push(u.text);
                    if !self.hold_speech {
                        self.queue.push_back(SessionEvent::SynthesisDone { utterance: u.id });
                    }
                }
                Command::StartRecognition { session } => {
                    if self.fail_starts {
                        self.queue.push_back(SessionEvent::RecognitionStartFailed {
                            session,
                            reason: "device busy".into(),
                        });
                    } else {
                        self.recognizer_session = Some(session);
                        self.queue
                            .push_back(SessionEvent::RecognitionStarted { session });
                    }
                }
                Command::StopRecognition => self.recognizer_session = None,
                Command::Submit { request, .. } => self.submits.push(request),
                Command::ScheduleGreeting { generation, .. } => {
                    self.queue.push_back(SessionEvent::GreetingDue { generation })
                }
                Command::ScheduleRecognitionRetry { session, .. } => {
                    self.queue
                        .push_back(SessionEvent::RecognitionRetryDue { session })
                }
                Command::CancelSpeech | Command::Stop => {}
            }
        }
    }

    fn drain(&mut self) {
        while let Some(event) = self.queue.pop_front() {
            let out = self.session.handle(event);
            assert!(
                !(self.session.is_listening() && self.session.is_speaking()),
                "listening and speaking at once"
            );
            self.run(out);
        }
    }

    fn deliver(&mut self, event: SessionEvent) {
        self.queue.push_back(event);
        self.drain();
    }

    /// Caller speaks into the active recognizer session.
    fn say(&mut self, text: &str) {
        let session = self.recognizer_session.expect("recognizer is running");
        self.deliver(SessionEvent::RecognitionResult {
            session,
            text: text.to_string(),
        });
    }

    fn answer_all(&mut self, answers: &[&str]) {
        for a in answers {
            self.say(a);
        }
    }

    fn finish_submission(&mut self, outcome: Result<TicketResult, String>) {
        let generation = self.session.generation();
        self.deliver(SessionEvent::SubmissionFinished { generation, outcome });
    }
}

const CALLER: [&str; 6] = ["Asha Rao", "theft", "MG Road", "City Mall", "Springfield", "Central"];

fn ticket(id: &str) -> TicketResult {
    TicketResult {
        ticket_id: id.to_string(),
        status: Some("pending".into()),
        message: None,
    }
}

#[test]
fn scenario_confirmed_report_is_submitted_once() {
    let mut h = Harness::new();
    assert!(h.session.is_listening());

    h.answer_all(&CALLER);
    assert_eq!(h.session.state(), ConversationState::AddressValidation);
    assert_eq!(
        h.spoken.last().unwrap(),
        "Your complete address is: MG Road, Near City Mall, Springfield, Central District. Is this correct?"
    );

    h.say("yes");
    assert_eq!(h.session.state(), ConversationState::Complete);
    assert_eq!(h.submits.len(), 1);
    let request = &h.submits[0];
    assert_eq!(request.combined_address, "MG Road, Near City Mall, Springfield, Central District");
    assert_eq!(request.caller_name, "Asha Rao");
    assert_eq!(request.crime_type, "theft");
    assert_eq!(request.city, "Springfield");
    assert_eq!(request.phone_number, "8000123456");
    assert!(!h.session.is_listening());

    h.finish_submission(Ok(ticket("TID-1a2b3c")));
    assert!(h.spoken.last().unwrap().contains("Report ID: TID-1a2b3c"));
    assert_eq!(h.session.state(), ConversationState::Complete);
    assert_eq!(h.session.mode(), ArbiterMode::Idle);
    assert_eq!(h.session.ticket().unwrap().ticket_id, "TID-1a2b3c");
    assert_eq!(h.session.submissions(), 1);
}

#[test]
fn scenario_denied_address_is_collected_again() {
    let mut h = Harness::new();
    h.answer_all(&CALLER);
    h.say("no, that's wrong");

    assert!(h.submits.is_empty());
    assert_eq!(h.session.state(), ConversationState::Area);
    assert_eq!(h.spoken.last().unwrap(), ADDRESS_RETRY_PROMPT);
    let record = h.session.record();
    assert!(record.area.is_empty());
    assert!(record.landmark.is_empty());
    assert!(record.city.is_empty());
    assert!(record.district.is_empty());
    assert!(record.full_address.is_empty());
    assert_eq!(record.name, "Asha Rao");

    h.say("Park Street");
    assert_eq!(h.session.record().area, "Park Street");
    assert!(h.session.record().landmark.is_empty());

    h.answer_all(&["Old Fort", "Shelbyville", "North"]);
    assert_eq!(h.session.state(), ConversationState::AddressValidation);
    assert_eq!(
        h.session.record().full_address,
        "Park Street, Near Old Fort, Shelbyville, North District"
    );

    h.say("That's right");
    assert_eq!(h.submits.len(), 1);
    assert_eq!(h.submits[0].primary_location, "Park Street");
}

#[test]
fn scenario_recognition_error_keeps_state_and_falls_back_to_text() {
    let mut h = Harness::new();
    h.answer_all(&CALLER[..4]);
    assert_eq!(h.session.state(), ConversationState::Landmark);
    let transcript_len = h.session.transcript().len();

    let session = h.recognizer_session.unwrap();
    h.deliver(SessionEvent::RecognitionError {
        session,
        kind: RecognitionErrorKind::PermissionDenied,
    });

    assert!(!h.session.is_listening());
    assert_eq!(h.session.state(), ConversationState::Landmark);
    let alert = h.session.alert().expect("alert shown");
    assert_eq!(alert.kind, AlertKind::Recognition);
    assert!(alert.message.contains("Microphone access was denied"));
    assert_eq!(h.session.transcript().len(), transcript_len);

    h.deliver(SessionEvent::TextSubmitted("Springfield".into()));
    assert_eq!(h.session.state(), ConversationState::City);
    assert_eq!(h.session.record().city, "Springfield");
}

#[test]
fn scenario_blank_result_changes_nothing() {
    let mut h = Harness::new();
    h.say("Asha Rao");
    let before = h.session.transcript().len();

    h.say("   ");
    h.say("\t\n");

    assert_eq!(h.session.state(), ConversationState::Name);
    assert_eq!(h.session.transcript().len(), before);
    assert!(h.session.is_listening());
}

#[test]
fn chain_is_linear_regardless_of_content() {
    let mut h = Harness::new();
    let mut seen = vec![h.session.state()];
    for answer in ["yes", "no", "correct", "right", "42", "?"] {
        h.say(answer);
        seen.push(h.session.state());
    }
    use ConversationState::*;
    assert_eq!(
        seen,
        vec![Greeting, Name, CrimeType, Area, Landmark, City, AddressValidation]
    );
    assert_eq!(h.session.record().name, "yes");
}

#[test]
fn submission_failure_is_terminal() {
    let mut h = Harness::new();
    h.answer_all(&CALLER);
    h.say("yes");
    h.finish_submission(Err("ticket API error 500".into()));

    assert_eq!(h.session.state(), ConversationState::Complete);
    assert_eq!(h.spoken.last().unwrap(), SUBMISSION_FAILED_PROMPT);
    assert_eq!(h.session.alert().unwrap().kind, AlertKind::Submission);
    assert_eq!(h.session.transcript().last().unwrap().text, SUBMISSION_FAILED_PROMPT);

    h.deliver(SessionEvent::TextSubmitted("yes".into()));
    assert_eq!(h.submits.len(), 1);
    assert!(matches!(
        h.session.toggle_mic(),
        Err(IntakeError::ToggleRejected(ToggleRejection::Complete))
    ));
}

#[test]
fn restart_discards_the_conversation() {
    let mut h = Harness::new();
    h.answer_all(&CALLER);
    h.say("yes");
    let old_generation = h.session.generation();

    h.hold_speech = true;
    h.deliver(SessionEvent::Restart);
    assert_eq!(h.session.state(), ConversationState::Greeting);
    assert!(h.session.record().name.is_empty());
    assert_eq!(h.session.transcript().len(), 1, "only the new greeting");
    assert_eq!(h.session.submissions(), 0);

    h.deliver(SessionEvent::SubmissionFinished {
        generation: old_generation,
        outcome: Ok(ticket("TID-old")),
    });
    assert!(h.session.ticket().is_none());
}

#[test]
fn toggle_is_refused_while_speaking() {
    let mut h = Harness::new();
    h.hold_speech = true;
    h.say("Asha Rao");
    assert!(h.session.is_speaking());
    assert!(matches!(
        h.session.toggle_mic(),
        Err(IntakeError::ToggleRejected(ToggleRejection::Speaking))
    ));
}

#[test]
fn manual_toggle_mutes_and_resumes() {
    let mut h = Harness::new();
    let (listening, out) = h.session.toggle_mic().unwrap();
    assert!(!listening);
    assert_eq!(out, vec![Command::StopRecognition]);

    let (listening, out) = h.session.toggle_mic().unwrap();
    assert!(listening);
    assert!(matches!(out[..], [Command::StartRecognition { .. }]));
}

#[test]
fn failed_restarts_give_up_after_the_retry_budget() {
    let mut h = Harness::new();
    h.fail_starts = true;
    let session = h.recognizer_session.take().unwrap();
    h.deliver(SessionEvent::RecognitionEnded { session });

    assert!(!h.session.is_listening());
    let restart_failures = h
        .session
        .alerts()
        .iter()
        .filter(|a| a.kind == AlertKind::RecognitionRestartFailed)
        .count();
    assert_eq!(restart_failures, 1);

    h.deliver(SessionEvent::TextSubmitted("Asha Rao".into()));
    assert_eq!(h.session.state(), ConversationState::Name);
}

#[test]
fn missing_recognizer_makes_text_the_primary_input() {
    let mut h = Harness::with_recognition(false);
    assert_eq!(h.session.mode(), ArbiterMode::Idle);
    assert_eq!(h.session.alerts()[0].kind, AlertKind::CapabilityMissing);

    for answer in CALLER {
        h.deliver(SessionEvent::TextSubmitted(answer.into()));
        assert!(!h.session.is_listening());
    }
    h.deliver(SessionEvent::TextSubmitted("yes".into()));
    assert_eq!(h.submits.len(), 1);
    assert_eq!(h.session.alerts().len(), 1);
}
