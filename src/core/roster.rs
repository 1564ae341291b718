//! Ordered agent roster.

use serde::{Deserialize, Serialize};

/// Agents used when nothing else is configured.
pub const DEFAULT_AGENTS: [&str; 3] = ["Claude", "Gemini", "ChatGPT"];

/// Fixed, ordered list of agent ids. Position `i` hands off to `next(i)`.
///
/// Duplicates are allowed; an agent listed twice simply speaks twice per turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roster(Vec<String>);

impl Roster {
    pub fn new<I, S>(agents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(agents.into_iter().map(Into::into).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    /// Cyclic successor of `index`; `None` for an empty roster.
    pub fn next(&self, index: usize) -> Option<usize> {
        (index + 1).checked_rem(self.0.len())
    }

    /// `(sender, receiver)` for the given position.
    pub fn pair(&self, index: usize) -> Option<(&str, &str)> {
        let sender = self.0.get(index)?;
        let receiver = &self.0[self.next(index)?];
        Some((sender, receiver))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Default for Roster {
    fn default() -> Self {
        Self::new(DEFAULT_AGENTS)
    }
}

impl std::fmt::Display for Roster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for agent in &self.0 {
            if !first {
                write!(f, " -> ")?;
            }
            write!(f, "{}", agent)?;
            first = false;
        }
        if let Some(head) = self.0.first() {
            write!(f, " -> {}", head)?;
        }
        Ok(())
    }
}
