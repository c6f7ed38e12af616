//! # Intake Voice - voice-driven incident intake
//!
//! This crate runs the turn-taking dialogue that collects an emergency report from a
//! caller: spoken prompts, recognized (or typed) answers, address validation, and a
//! single submission of the finished record to the ticket backend.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       Intake Runtime                          │
//! │  ┌──────────────┐   events    ┌──────────────────────────┐   │
//! │  │  Recognizer  │───────────▶ │     DialogueSession      │   │
//! │  │ (stt::*)     │             │  ┌────────┐ ┌─────────┐  │   │
//! │  └──────────────┘             │  │Dialogue│ │ Arbiter │  │   │
//! │  ┌──────────────┐   events    │  │ table  │ │ listen/ │  │   │
//! │  │ Synthesizer  │───────────▶ │  └────────┘ │ speak   │  │   │
//! │  │(voice_output)│◀─commands── │  Record · Transcript    │   │
//! │  └──────────────┘             └────────────┬─────────────┘   │
//! │  text fallback / mic toggle / restart ─────┘   │ Submit      │
//! │                                   ┌────────────▼───────────┐ │
//! │                                   │   SubmissionGateway    │ │
//! │                                   └────────────────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod arbiter;
pub mod config;
pub mod dialogue;
pub mod error;
pub mod gateway;
pub mod record;
pub mod runtime;
pub mod session;
pub mod stt;
pub mod transcript;
pub mod voice_output;

pub use arbiter::{ArbiterMode, SpeechArbiter, StartFailure};
pub use config::{IntakeConfig, RestartPolicy, SynthesisSettings};
pub use dialogue::{advance, Effect, Transition};
pub use error::{IntakeError, IntakeResult, ToggleRejection};
pub use gateway::{
    HttpSubmissionGateway, OfflineGateway, SubmissionGateway, TicketRequest, TicketResult,
};
pub use record::{compose_address, ConversationState, IntakeRecord};
pub use runtime::{IntakeHandle, IntakeRuntime, SessionSnapshot};
pub use session::{
    Alert, AlertKind, Command, DialogueSession, EventReceiver, EventSender, SessionEvent,
    SessionStatus,
};
pub use stt::{PlaceholderRecognizer, RecognitionErrorKind, Recognizer, UnavailableRecognizer};
pub use transcript::{Message, Sender, Transcript};
pub use voice_output::{select_preferred_voice, PlaceholderSynthesizer, Synthesizer, Utterance};
