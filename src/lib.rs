//! baton library root.
//!
//! A fixed roster of agents passes a message around in order. Every reply is
//! written to a SQLite log together with a hand-off naming its addressee, so a
//! conversation can be resumed after a restart.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod history;
pub mod logging;
pub mod store;

pub use cli::Commands;
pub use config::{load_settings, Settings};
pub use self::core::{EchoResponder, Incoming, Responder, Roster, Sequencer};
pub use error::{Error, Result};
pub use store::{HandOff, HistoryEntry, Message, MessageId, MessageStore, StoreStats};
