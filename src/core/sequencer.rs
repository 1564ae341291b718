//! Turn sequencing - every agent speaks once per turn, in roster order.

use std::sync::Arc;
use std::time::Duration;

use super::responder::{EchoResponder, Incoming, Responder};
use super::roster::Roster;
use crate::error::Result;
use crate::store::MessageStore;

/// Drives turns over a fixed roster, persisting each reply to the store.
pub struct Sequencer<R = EchoResponder> {
    roster: Roster,
    store: Arc<MessageStore>,
    responder: R,
    pacing: Option<Duration>,
}

impl Sequencer<EchoResponder> {
    /// Sequencer with the placeholder echo responder.
    pub fn new(store: Arc<MessageStore>, roster: Roster) -> Self {
        Self::with_responder(store, roster, EchoResponder)
    }
}

impl<R: Responder> Sequencer<R> {
    pub fn with_responder(store: Arc<MessageStore>, roster: Roster, responder: R) -> Self {
        Self {
            roster,
            store,
            responder,
            pacing: None,
        }
    }

    /// Sleep `delay` between steps of a turn. Has no effect on ordering.
    pub fn with_pacing(mut self, delay: Duration) -> Self {
        self.pacing = (!delay.is_zero()).then_some(delay);
        self
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn store(&self) -> &Arc<MessageStore> {
        &self.store
    }

    /// Run one full pass over the roster and return each agent's reply in order.
    ///
    /// The first agent gets `seed` when one is given (an empty seed counts as
    /// none). Everyone else, and the first agent of an unseeded turn, gets the
    /// latest message addressed to them. A store error stops the turn; steps
    /// already written stay written.
    pub fn execute_turn(&self, seed: Option<&str>) -> Result<Vec<String>> {
        let seed = seed.filter(|s| !s.is_empty());
        let len = self.roster.len();
        let mut responses = Vec::with_capacity(len);

        if len == 0 {
            tracing::debug!("Empty roster, nothing to do");
            return Ok(responses);
        }

        tracing::info!("Executing turn over {} agents (seeded: {})", len, seed.is_some());

        for cursor in 0..len {
            let Some((sender, receiver)) = self.roster.pair(cursor) else {
                break;
            };

            let seeded_step = cursor == 0 && seed.is_some();
            let relayed = if seeded_step {
                None
            } else {
                self.store.latest_addressed_to(sender)?
            };
            let incoming = match (seed, &relayed) {
                (Some(seed), _) if seeded_step => Incoming::Seed(seed),
                (_, Some(message)) => Incoming::Relayed(message),
                _ => Incoming::Silence,
            };

            let response = self.responder.respond(sender, &incoming);
            let message_id = self.store.append(sender, receiver, &response)?;

            tracing::debug!(
                step = cursor,
                message_id,
                "{} -> {}: {}",
                sender,
                receiver,
                response.chars().take(50).collect::<String>()
            );
            responses.push(response);

            if let Some(delay) = self.pacing.filter(|_| cursor + 1 < len) {
                std::thread::sleep(delay);
            }
        }

        tracing::info!("Turn complete: {} responses", responses.len());
        Ok(responses)
    }
}
