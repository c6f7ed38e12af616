//! Transcript of the conversation (bot prompts and accepted caller answers).
//!
//! Append-only; the session never reads it back to make decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Bot,
    User,
}

/// One exchanged message (who, what, when).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_bot(&mut self, text: impl Into<String>) {
        self.push(Sender::Bot, text.into());
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.push(Sender::User, text.into());
    }

    fn push(&mut self, sender: Sender, text: String) {
        self.messages.push(Message {
            sender,
            text,
            timestamp: Utc::now(),
        });
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}
