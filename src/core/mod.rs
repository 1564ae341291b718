//! Core module - roster, response generation, and turn sequencing.
//!
//! This module contains the relay protocol:
//! - Ordered roster with a cyclic successor
//! - Pluggable responders (echo placeholder by default)
//! - The sequencer that runs one pass over the roster per turn

pub mod responder;
pub mod roster;
pub mod sequencer;

pub use responder::{EchoResponder, Incoming, Responder};
pub use roster::{Roster, DEFAULT_AGENTS};
pub use sequencer::Sequencer;
