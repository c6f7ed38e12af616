//! Error types for the intake assistant

use thiserror::Error;

/// Result type alias for intake operations
pub type IntakeResult<T> = Result<T, IntakeError>;

/// Why a manual mic toggle was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleRejection {
    /// The assistant is speaking; the mic cannot be flipped until the prompt finishes.
    Speaking,
    /// The conversation reached its terminal state.
    Complete,
    /// No recognition engine is present.
    Unsupported,
}

impl std::fmt::Display for ToggleRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToggleRejection::Speaking => f.write_str("assistant is speaking"),
            ToggleRejection::Complete => f.write_str("conversation is complete"),
            ToggleRejection::Unsupported => f.write_str("speech recognition is not supported"),
        }
    }
}

/// Errors that can occur while running an intake conversation
#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Recognition error: {0}")]
    Recognition(String),

    #[error("Speech recognition is not supported on this device")]
    RecognitionUnavailable,

    #[error("Synthesis error: {0}")]
    Synthesis(String),

    #[error("Submission error: {0}")]
    Submission(String),

    #[error("Intake record is missing field: {0}")]
    IncompleteRecord(&'static str),

    #[error("Microphone toggle rejected: {0}")]
    ToggleRejected(ToggleRejection),

    #[error("Channel send error: {0}")]
    ChannelSend(String),

    #[error("Channel receive error: {0}")]
    ChannelReceive(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
