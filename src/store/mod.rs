//! Message store - durable log of messages and the hand-offs that address them.

pub mod sqlite;
pub mod types;

pub use sqlite::MessageStore;
pub use types::{HandOff, HistoryEntry, Message, MessageId, StoreStats, DEFAULT_KIND};
