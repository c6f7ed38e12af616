use intake_voice::{
    Command, ConversationState, DialogueSession, IntakeConfig, RecognitionErrorKind,
    SessionEvent, TicketResult,
};
use proptest::prelude::*;

/// Something the outside world can do to a running conversation.
#[derive(Debug, Clone)]
enum Action {
    Speak(String),
    Type(String),
    Interim(String),
    RecognizerError,
    RecognizerEnded,
    StartFailed,
    RetryDue,
    SpeechFinished,
    Toggle,
    GreetingDue,
    SubmissionDone(bool),
    Restart,
}

fn answer() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("yes".to_string()),
        Just("no".to_string()),
        Just("   ".to_string()),
        "[A-Za-z ]{0,12}",
    ]
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        3 => answer().prop_map(Action::Speak),
        2 => answer().prop_map(Action::Type),
        1 => answer().prop_map(Action::Interim),
        1 => Just(Action::RecognizerError),
        1 => Just(Action::RecognizerEnded),
        1 => Just(Action::StartFailed),
        1 => Just(Action::RetryDue),
        3 => Just(Action::SpeechFinished),
        1 => Just(Action::Toggle),
        1 => Just(Action::GreetingDue),
        1 => any::<bool>().prop_map(Action::SubmissionDone),
        1 => Just(Action::Restart),
    ]
}

/// Last ids the engines were handed; events are delivered against these.
#[derive(Default)]
struct Engines {
    recognizer: u64,
    utterance: u64,
    greeting: u64,
    submission: Option<u64>,
    submits_this_generation: u32,
}

impl Engines {
    fn observe(&mut self, commands: &[Command]) {
        for command in commands {
            match command {
                Command::StartRecognition { session } => self.recognizer = *session,
                Command::Speak(u) => self.utterance = u.id,
                Command::ScheduleGreeting { generation, .. } => {
                    self.greeting = *generation;
                    self.submits_this_generation = 0;
                }
                Command::Submit { generation, .. } => {
                    self.submission = Some(*generation);
                    self.submits_this_generation += 1;
                }
                _ => {}
            }
        }
    }

    fn event(&self, action: Action) -> SessionEvent {
        let session = self.recognizer;
        match action {
            Action::Speak(text) => SessionEvent::RecognitionResult { session, text },
            Action::Type(text) => SessionEvent::TextSubmitted(text),
            Action::Interim(text) => SessionEvent::RecognitionInterim { session, text },
            Action::RecognizerError => SessionEvent::RecognitionError {
                session,
                kind: RecognitionErrorKind::Network,
            },
            Action::RecognizerEnded => SessionEvent::RecognitionEnded { session },
            Action::StartFailed => SessionEvent::RecognitionStartFailed {
                session,
                reason: "busy".into(),
            },
            Action::RetryDue => SessionEvent::RecognitionRetryDue { session },
            Action::SpeechFinished => SessionEvent::SynthesisDone {
                utterance: self.utterance,
            },
            Action::Toggle => SessionEvent::ToggleMic,
            Action::GreetingDue => SessionEvent::GreetingDue {
                generation: self.greeting,
            },
            Action::SubmissionDone(ok) => SessionEvent::SubmissionFinished {
                generation: self.submission.unwrap_or(0),
                outcome: if ok {
                    Ok(TicketResult {
                        ticket_id: "TID-000001".into(),
                        status: None,
                        message: None,
                    })
                } else {
                    Err("ticket API error 500".into())
                },
            },
            Action::Restart => SessionEvent::Restart,
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_session_invariants_hold(actions in prop::collection::vec(action(), 0..80)) {
        let mut session = DialogueSession::new(&IntakeConfig::default(), true, &[]);
        let mut engines = Engines::default();
        let out = session.start();
        engines.observe(&out);

        for action in actions {
            let restart = matches!(action, Action::Restart);
            let before = session.state();
            let out = session.handle(engines.event(action));
            engines.observe(&out);

            prop_assert!(!(session.is_listening() && session.is_speaking()));
            prop_assert!(engines.submits_this_generation <= 1);
            prop_assert!(session.submissions() <= 1);
            if session.state() == ConversationState::Complete {
                prop_assert!(!session.is_listening());
            }
            if !restart {
                let after = session.state();
                let denied = before == ConversationState::AddressValidation
                    && after == ConversationState::Area;
                prop_assert!(after >= before || denied, "{before:?} -> {after:?}");
            }
        }
    }

    #[test]
    fn prop_blank_answers_never_advance(blanks in prop::collection::vec("[ \t\n]{0,6}", 1..10)) {
        let mut session = DialogueSession::new(&IntakeConfig::default(), false, &[]);
        session.start();
        for blank in blanks {
            session.handle(SessionEvent::TextSubmitted(blank));
        }
        prop_assert_eq!(session.state(), ConversationState::Greeting);
        prop_assert!(session.transcript().is_empty());
    }
}
