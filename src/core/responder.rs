//! Response generation - the seam where a real agent would plug in.

use crate::store::Message;

/// What an agent receives at its step of a turn.
#[derive(Debug, Clone, Copy)]
pub enum Incoming<'a> {
    /// Caller-supplied seed for the first agent of a seeded turn.
    Seed(&'a str),
    /// Latest message handed off to this agent.
    Relayed(&'a Message),
    /// Nothing has ever been addressed to this agent.
    Silence,
}

impl<'a> Incoming<'a> {
    pub fn is_seeded(&self) -> bool {
        matches!(self, Incoming::Seed(_))
    }

    pub fn content(&self) -> Option<&'a str> {
        match *self {
            Incoming::Seed(seed) => Some(seed),
            Incoming::Relayed(message) => Some(message.content.as_str()),
            Incoming::Silence => None,
        }
    }
}

/// Produces an agent's reply.
///
/// Implementations must depend only on their arguments; the sequencer calls
/// them once per roster position.
pub trait Responder: Send + Sync {
    fn respond(&self, sender_id: &str, incoming: &Incoming<'_>) -> String;
}

impl<F> Responder for F
where
    F: Fn(&str, &Incoming<'_>) -> String + Send + Sync,
{
    fn respond(&self, sender_id: &str, incoming: &Incoming<'_>) -> String {
        self(sender_id, incoming)
    }
}

/// Placeholder responder that quotes whatever it was given.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoResponder;

impl Responder for EchoResponder {
    fn respond(&self, sender_id: &str, incoming: &Incoming<'_>) -> String {
        match incoming {
            Incoming::Seed(seed) => format!("INITIAL: {}", seed),
            Incoming::Relayed(message) => format!(
                "RESPONSE from {}: I received '{}' and my response is...",
                sender_id, message.content
            ),
            Incoming::Silence => format!(
                "RESPONSE from {}: No prior message received, starting conversation...",
                sender_id
            ),
        }
    }
}
