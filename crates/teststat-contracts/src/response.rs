//! The decoded response envelope of one data call.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One server message, serialized as a two-element array `[kind, text]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message(pub String, pub String);

impl Message {
    pub fn new(kind: impl Into<String>, text: impl Into<String>) -> Self {
        Self(kind.into(), text.into())
    }

    /// Message kind, e.g. `"error"` or `"info"`.
    pub fn kind(&self) -> &str {
        &self.0
    }

    pub fn text(&self) -> &str {
        &self.1
    }

    /// The text up to (not including) the first line break.
    pub fn first_line(&self) -> &str {
        self.1.lines().next().unwrap_or("")
    }
}

/// An actual response as handed to the expectation evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActualResponse {
    pub status_code: u16,
    /// Raw, un-normalized payload. Normally a JSON object.
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl ActualResponse {
    pub fn new(status_code: u16, data: Value) -> Self {
        Self {
            status_code,
            data,
            messages: Vec::new(),
        }
    }

    pub fn with_message(mut self, kind: impl Into<String>, text: impl Into<String>) -> Self {
        self.messages.push(Message::new(kind, text));
        self
    }
}
