//! **Speech recognition**: the recognizer seam the session listens through.
//!
//! A recognizer runs one listening session at a time. Each session reports zero or more
//! interim transcripts, at most one final transcript, and then an end event; all of them
//! are tagged with the session id the arbiter handed out so late events from a torn-down
//! session can be told apart.

use crate::error::{IntakeError, IntakeResult};
use crate::session::{EventSender, SessionEvent};

/// Error taxonomy reported by recognition engines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionErrorKind {
    Aborted,
    PermissionDenied,
    Network,
    Other(String),
}

impl RecognitionErrorKind {
    /// Map an engine error code (`aborted`, `not-allowed`, `network`, ...) to a kind.
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "aborted" => Self::Aborted,
            "not-allowed" | "permission-denied" | "service-not-allowed" => Self::PermissionDenied,
            "network" => Self::Network,
            other => Self::Other(other.to_string()),
        }
    }

    /// User-facing guidance for this kind of failure.
    pub fn guidance(&self) -> String {
        match self {
            Self::Aborted => "Speech recognition was aborted. This may be due to browser permissions. Please ensure your microphone is enabled and try again.".to_string(),
            Self::PermissionDenied => "Microphone access was denied. Please allow microphone access in your browser settings.".to_string(),
            Self::Network => "Network error occurred. Please check your connection and try again.".to_string(),
            Self::Other(code) => format!("Speech recognition error: {code}. Please try typing your response instead."),
        }
    }
}

impl std::fmt::Display for RecognitionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Aborted => f.write_str("aborted"),
            Self::PermissionDenied => f.write_str("permission-denied"),
            Self::Network => f.write_str("network"),
            Self::Other(code) => write!(f, "other({code})"),
        }
    }
}

/// Backend for turning caller speech into text. Implement for a platform recognizer or
/// a remote streaming STT service.
pub trait Recognizer: Send {
    /// False when the platform has no recognition capability at all.
    fn is_available(&self) -> bool;

    /// Begin listening session `session`; report results on `events`. Returning an error
    /// means the session never started.
    fn start(&mut self, session: u64, events: EventSender) -> IntakeResult<()>;

    /// Tear down the active session, if any.
    fn stop(&mut self);
}

/// Recognizer for platforms without speech recognition. The session falls back to
/// typed input.
#[derive(Debug, Default)]
pub struct UnavailableRecognizer;

impl Recognizer for UnavailableRecognizer {
    fn is_available(&self) -> bool {
        false
    }

    fn start(&mut self, _session: u64, _events: EventSender) -> IntakeResult<()> {
        Err(IntakeError::RecognitionUnavailable)
    }

    fn stop(&mut self) {}
}

/// Recognizer that replays a fixed answer per session. Use to exercise the loop without
/// a microphone.
#[derive(Debug, Default)]
pub struct PlaceholderRecognizer {
    answers: std::collections::VecDeque<String>,
}

impl PlaceholderRecognizer {
    pub fn with_answers<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
        }
    }
}

impl Recognizer for PlaceholderRecognizer {
    fn is_available(&self) -> bool {
        true
    }

    fn start(&mut self, session: u64, events: EventSender) -> IntakeResult<()> {
        let Some(answer) = self.answers.pop_front() else {
            // Out of answers: stay silent, like a caller holding the floor.
            return Ok(());
        };
        let send = |event| {
            events
                .send(event)
                .map_err(|e| IntakeError::ChannelSend(e.to_string()))
        };
        send(SessionEvent::RecognitionInterim {
            session,
            text: answer.clone(),
        })?;
        send(SessionEvent::RecognitionResult {
            session,
            text: answer,
        })?;
        send(SessionEvent::RecognitionEnded { session })
    }

    fn stop(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn error_codes_map_to_kinds() {
        assert_eq!(RecognitionErrorKind::from_code("aborted"), RecognitionErrorKind::Aborted);
        assert_eq!(
            RecognitionErrorKind::from_code("not-allowed"),
            RecognitionErrorKind::PermissionDenied
        );
        assert_eq!(RecognitionErrorKind::from_code("network"), RecognitionErrorKind::Network);
        assert_eq!(
            RecognitionErrorKind::from_code("no-speech"),
            RecognitionErrorKind::Other("no-speech".to_string())
        );
        assert!(RecognitionErrorKind::Other("no-speech".into())
            .guidance()
            .contains("no-speech"));
    }

    #[test]
    fn unavailable_recognizer_never_starts() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut r = UnavailableRecognizer;
        assert!(!r.is_available());
        assert!(matches!(r.start(1, tx), Err(IntakeError::RecognitionUnavailable)));
    }

    #[test]
    fn placeholder_replays_one_answer_per_session() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut r = PlaceholderRecognizer::with_answers(["Asha Rao"]);
        r.start(7, tx.clone()).unwrap();

        assert!(matches!(rx.try_recv().unwrap(), SessionEvent::RecognitionInterim { session: 7, .. }));
        match rx.try_recv().unwrap() {
            SessionEvent::RecognitionResult { session, text } => {
                assert_eq!(session, 7);
                assert_eq!(text, "Asha Rao");
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(matches!(rx.try_recv().unwrap(), SessionEvent::RecognitionEnded { session: 7 }));

        r.start(8, tx).unwrap();
        assert!(rx.try_recv().is_err());
    }
}
