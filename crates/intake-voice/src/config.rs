//! Intake configuration: submission endpoint, voice parameters, greeting delay and the
//! recognition restart policy.
//!
//! Precedence: environment (`INTAKE_*`, nested keys with `__`) > TOML file at
//! `INTAKE_CONFIG` (default `config/intake`) > built-in defaults.
//!
//! | Key | Default |
//! |-----|---------|
//! | submission_url | http://127.0.0.1:8007/create-ticket-from-voice |
//! | submission_timeout_secs | 30 |
//! | default_phone_number | 8000123456 |
//! | greeting_delay_ms | 500 |
//! | synthesis.rate / pitch / volume | 1.0 |
//! | synthesis.preferred_voice_hints | Female, Google, Microsoft |
//! | restart.max_attempts | 3 |
//! | restart.backoff_ms | 250 |

use crate::error::IntakeResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    /// Ticket backend endpoint the finished record is posted to.
    pub submission_url: String,
    pub submission_timeout_secs: u64,
    /// Phone number attached to every report; the dialogue never asks for one.
    pub default_phone_number: String,
    /// Settle time between a (re)start and the greeting.
    pub greeting_delay_ms: u64,
    pub synthesis: SynthesisSettings,
    pub restart: RestartPolicy,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            submission_url: "http://127.0.0.1:8007/create-ticket-from-voice".to_string(),
            submission_timeout_secs: 30,
            default_phone_number: "8000123456".to_string(),
            greeting_delay_ms: 500,
            synthesis: SynthesisSettings::default(),
            restart: RestartPolicy::default(),
        }
    }
}

impl IntakeConfig {
    /// Load config from file and environment.
    pub fn load() -> IntakeResult<Self> {
        let path = std::env::var("INTAKE_CONFIG").unwrap_or_else(|_| "config/intake".to_string());
        let built = config::Config::builder()
            .add_source(config::File::with_name(&path).required(false))
            .add_source(
                config::Environment::with_prefix("INTAKE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(built.try_deserialize()?)
    }

    /// Parse a TOML document on top of the defaults.
    pub fn from_toml_str(source: &str) -> IntakeResult<Self> {
        let built = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?;
        Ok(built.try_deserialize()?)
    }

    pub fn greeting_delay(&self) -> Duration {
        Duration::from_millis(self.greeting_delay_ms)
    }

    pub fn submission_timeout(&self) -> Duration {
        Duration::from_secs(self.submission_timeout_secs)
    }
}

/// Voice parameters handed to the synthesizer with every prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisSettings {
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    /// Substrings matched against the engine's voice names; first match wins.
    pub preferred_voice_hints: Vec<String>,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
            preferred_voice_hints: vec![
                "Female".to_string(),
                "Google".to_string(),
                "Microsoft".to_string(),
            ],
        }
    }
}

/// Bound on recognizer (re)start attempts after a start failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestartPolicy {
    /// Retries after the first failed start; 0 disables retrying.
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 250,
        }
    }
}

impl RestartPolicy {
    /// Delay before retry number `attempt` (1-based), growing linearly.
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_ms.saturating_mul(u64::from(attempt.max(1))))
    }
}
