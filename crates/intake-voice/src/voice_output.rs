//! **Voice output**: the synthesizer seam prompts are spoken through.
//!
//! One utterance plays at a time. A new prompt preempts the current one: the session
//! cancels before it speaks, and a `SynthesisDone` for a preempted utterance is ignored.

use crate::config::SynthesisSettings;
use crate::error::{IntakeError, IntakeResult};
use crate::session::{EventSender, SessionEvent};
use serde::{Deserialize, Serialize};

/// Text plus voice parameters for one prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    pub id: u64,
    pub text: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    /// Voice name chosen from the engine's voice list, if any matched the hints.
    pub voice: Option<String>,
}

impl Utterance {
    pub fn new(id: u64, text: impl Into<String>, settings: &SynthesisSettings, voice: Option<String>) -> Self {
        Self {
            id,
            text: text.into(),
            rate: settings.rate,
            pitch: settings.pitch,
            volume: settings.volume,
            voice,
        }
    }
}

/// Backend that speaks text. Implement for a platform TTS or a remote TTS + playback.
pub trait Synthesizer: Send {
    /// Names of the voices this engine offers.
    fn voices(&self) -> Vec<String> {
        Vec::new()
    }

    /// Start speaking; send `SynthesisDone { utterance }` on `events` when playback ends.
    fn speak(&mut self, utterance: Utterance, events: EventSender) -> IntakeResult<()>;

    /// Stop playback immediately and drop anything queued.
    fn cancel(&mut self);
}

/// First voice whose name contains any of the hints, in voice-list order.
pub fn select_preferred_voice(available: &[String], hints: &[String]) -> Option<String> {
    available
        .iter()
        .find(|voice| hints.iter().any(|hint| voice.contains(hint.as_str())))
        .cloned()
}

/// Placeholder synthesizer: plays nothing and reports completion at once.
#[derive(Debug, Default)]
pub struct PlaceholderSynthesizer {
    spoken: Vec<String>,
}

impl PlaceholderSynthesizer {
    pub fn spoken(&self) -> &[String] {
        &self.spoken
    }
}

impl Synthesizer for PlaceholderSynthesizer {
    fn speak(&mut self, utterance: Utterance, events: EventSender) -> IntakeResult<()> {
        self.spoken.push(utterance.text);
        events
            .send(SessionEvent::SynthesisDone {
                utterance: utterance.id,
            })
            .map_err(|e| IntakeError::ChannelSend(e.to_string()))
    }

    fn cancel(&mut self) {}
}
