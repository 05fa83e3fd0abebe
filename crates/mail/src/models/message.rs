//! Message identity and resolved senders

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a message (Gmail message ID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The sender resolved from a message's `From` header
///
/// `sender` is a best-effort parse: the bracketed address when one is
/// present, otherwise whatever the header policy allowed through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderRecord {
    pub sender: String,
    pub message_id: MessageId,
}

impl SenderRecord {
    pub fn new(sender: impl Into<String>, message_id: MessageId) -> Self {
        Self {
            sender: sender.into(),
            message_id,
        }
    }
}
