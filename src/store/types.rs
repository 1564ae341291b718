//! Records persisted by the message store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier assigned to a message on insert.
pub type MessageId = i64;

/// Message kind used when the caller does not specify one.
pub const DEFAULT_KIND: &str = "text";

/// A stored message. Only the store creates these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: String,
    pub kind: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A directed hand-off of one message from a sender to a receiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandOff {
    pub id: i64,
    pub sender_id: String,
    pub receiver_id: String,
    pub message_id: MessageId,
    pub created_at: DateTime<Utc>,
}

/// One row of the exchange history: a message joined with its hand-off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub message_id: MessageId,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// `[timestamp] sender -> receiver: body`, with `body` standing in for the content.
    pub fn line(&self, body: &str) -> String {
        format!(
            "[{}] {} -> {}: {}",
            self.created_at.format("%Y-%m-%d %H:%M:%S"),
            self.sender_id,
            self.receiver_id,
            body
        )
    }
}

impl std::fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.line(&self.content))
    }
}

/// Row counts for the two logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub messages: usize,
    pub hand_offs: usize,
}

impl std::fmt::Display for StoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Store Stats:")?;
        writeln!(f, "  Messages:  {}", self.messages)?;
        write!(f, "  Hand-offs: {}", self.hand_offs)
    }
}
