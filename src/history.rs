//! Rendering and export of the exchange history.

use crate::error::Result;
use crate::store::HistoryEntry;

/// First `max_chars` characters of `content`, followed by `...`.
pub fn preview(content: &str, max_chars: usize) -> String {
    let mut out: String = content.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

/// `[timestamp] sender -> receiver: preview...`
pub fn format_entry(entry: &HistoryEntry, max_chars: usize) -> String {
    entry.line(&preview(&entry.content, max_chars))
}

/// Pretty-printed JSON array of the history.
pub fn to_json(entries: &[HistoryEntry]) -> Result<String> {
    Ok(serde_json::to_string_pretty(entries)?)
}
