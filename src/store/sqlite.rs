//! SQLite-backed message log and hand-off log.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

use super::types::{HandOff, HistoryEntry, Message, MessageId, StoreStats, DEFAULT_KIND};
use crate::error::{Error, Result};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        sender_id TEXT NOT NULL,
        kind TEXT NOT NULL DEFAULT 'text',
        content TEXT NOT NULL,
        created_at INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS hand_offs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        sender_id TEXT NOT NULL,
        receiver_id TEXT NOT NULL,
        message_id INTEGER NOT NULL UNIQUE REFERENCES messages(id),
        created_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_messages_created ON messages(created_at);
    CREATE INDEX IF NOT EXISTS idx_hand_offs_receiver ON hand_offs(receiver_id, created_at);
"#;

const MESSAGE_COLUMNS: &str = "m.id, m.sender_id, m.kind, m.content, m.created_at";

/// Durable store for messages and the hand-offs that address them.
///
/// Every operation opens its own connection. Writes are serialized through an
/// internal lock so a message and its hand-off always land together.
#[derive(Debug)]
pub struct MessageStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl MessageStore {
    /// Open (creating if needed) the store at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        };
        store.initialize()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the tables if they are absent. Safe to call on a populated store.
    pub fn initialize(&self) -> Result<()> {
        let init_err = |reason: String| Error::StorageInit {
            path: self.path.clone(),
            reason,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| init_err(e.to_string()))?;
        }

        let conn = self.connect().map_err(|e| init_err(e.to_string()))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| init_err(e.to_string()))?;

        tracing::debug!("Message store initialized at {}", self.path.display());
        Ok(())
    }

    fn connect(&self) -> rusqlite::Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(conn)
    }

    /// Store a text message from `sender_id` addressed to `receiver_id`.
    pub fn append(&self, sender_id: &str, receiver_id: &str, content: &str) -> Result<MessageId> {
        self.append_with_kind(sender_id, receiver_id, content, DEFAULT_KIND)
    }

    /// Store a message and its hand-off in one transaction and return the message id.
    pub fn append_with_kind(
        &self,
        sender_id: &str,
        receiver_id: &str,
        content: &str,
        kind: &str,
    ) -> Result<MessageId> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut conn = self.connect().map_err(Error::write("append"))?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(Error::write("append"))?;

        // Clamp to the newest stored timestamp so created_at never goes backwards.
        let newest: i64 = tx
            .query_row(
                "SELECT COALESCE(MAX(created_at), 0) FROM messages",
                [],
                |row| row.get(0),
            )
            .map_err(Error::write("append"))?;
        let created_at = Utc::now().timestamp_millis().max(newest);

        tx.execute(
            "INSERT INTO messages (sender_id, kind, content, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![sender_id, kind, content, created_at],
        )
        .map_err(Error::write("append"))?;
        let message_id = tx.last_insert_rowid();

        tx.execute(
            "INSERT INTO hand_offs (sender_id, receiver_id, message_id, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![sender_id, receiver_id, message_id, created_at],
        )
        .map_err(Error::write("append"))?;

        tx.commit().map_err(Error::write("append"))?;

        tracing::debug!(
            message_id,
            sender = sender_id,
            receiver = receiver_id,
            "Stored message"
        );
        Ok(message_id)
    }

    /// The newest message handed off to `receiver_id`, if any.
    pub fn latest_addressed_to(&self, receiver_id: &str) -> Result<Option<Message>> {
        let conn = self.connect().map_err(Error::read("latest_addressed_to"))?;
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS}
             FROM hand_offs h JOIN messages m ON m.id = h.message_id
             WHERE h.receiver_id = ?1
             ORDER BY h.created_at DESC, m.id DESC
             LIMIT 1"
        );
        let message = conn
            .query_row(&sql, params![receiver_id], message_from_row)
            .optional()
            .map_err(Error::read("latest_addressed_to"))?;

        match &message {
            Some(m) => tracing::debug!("{} has message {} from {}", receiver_id, m.id, m.sender_id),
            None => tracing::debug!("No messages found for {}", receiver_id),
        }
        Ok(message)
    }

    /// The message carried by a specific hand-off, addressed by the id `append`
    /// returned. `None` unless that hand-off was addressed to `receiver_id`.
    pub fn hand_off_message(
        &self,
        message_id: MessageId,
        receiver_id: &str,
    ) -> Result<Option<Message>> {
        let conn = self.connect().map_err(Error::read("hand_off_message"))?;
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS}
             FROM hand_offs h JOIN messages m ON m.id = h.message_id
             WHERE h.message_id = ?1 AND h.receiver_id = ?2"
        );
        conn.query_row(&sql, params![message_id, receiver_id], message_from_row)
            .optional()
            .map_err(Error::read("hand_off_message"))
    }

    /// Full exchange history, oldest first.
    pub fn all_ordered_by_time(&self) -> Result<Vec<HistoryEntry>> {
        let conn = self.connect().map_err(Error::read("all_ordered_by_time"))?;
        let mut stmt = conn
            .prepare(
                "SELECT m.id, m.sender_id, h.receiver_id, m.content, m.created_at
                 FROM messages m JOIN hand_offs h ON m.id = h.message_id
                 ORDER BY m.created_at ASC, m.id ASC",
            )
            .map_err(Error::read("all_ordered_by_time"))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(HistoryEntry {
                    message_id: row.get(0)?,
                    sender_id: row.get(1)?,
                    receiver_id: row.get(2)?,
                    content: row.get(3)?,
                    created_at: timestamp_from_row(row, 4)?,
                })
            })
            .map_err(Error::read("all_ordered_by_time"))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Error::read("all_ordered_by_time"))
    }

    /// Every hand-off in insertion order.
    pub fn hand_offs(&self) -> Result<Vec<HandOff>> {
        let conn = self.connect().map_err(Error::read("hand_offs"))?;
        let mut stmt = conn
            .prepare(
                "SELECT id, sender_id, receiver_id, message_id, created_at
                 FROM hand_offs ORDER BY id ASC",
            )
            .map_err(Error::read("hand_offs"))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(HandOff {
                    id: row.get(0)?,
                    sender_id: row.get(1)?,
                    receiver_id: row.get(2)?,
                    message_id: row.get(3)?,
                    created_at: timestamp_from_row(row, 4)?,
                })
            })
            .map_err(Error::read("hand_offs"))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Error::read("hand_offs"))
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.connect().map_err(Error::read("stats"))?;
        let count = |table: &str| -> Result<usize> {
            let n: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
                .map_err(Error::read("stats"))?;
            Ok(n as usize)
        };

        Ok(StoreStats {
            messages: count("messages")?,
            hand_offs: count("hand_offs")?,
        })
    }

    /// Drop every message and hand-off, then recreate empty tables.
    ///
    /// Irreversible. Callers are expected to have confirmed with the user.
    pub fn reset(&self) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut conn = self.connect().map_err(Error::write("reset"))?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(Error::write("reset"))?;
        tx.execute_batch("DROP TABLE IF EXISTS hand_offs; DROP TABLE IF EXISTS messages;")
            .map_err(Error::write("reset"))?;
        tx.execute_batch(SCHEMA).map_err(Error::write("reset"))?;
        tx.commit().map_err(Error::write("reset"))?;

        tracing::info!("Message store at {} has been reset", self.path.display());
        Ok(())
    }
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        kind: row.get(2)?,
        content: row.get(3)?,
        created_at: timestamp_from_row(row, 4)?,
    })
}

fn timestamp_from_row(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let ms: i64 = row.get(idx)?;
    DateTime::from_timestamp_millis(ms).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            format!("timestamp out of range: {}", ms).into(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, MessageStore) {
        let dir = TempDir::new().unwrap();
        let store = MessageStore::open(dir.path().join("baton.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_append_creates_message_and_hand_off() {
        let (_dir, store) = temp_store();

        let id = store.append("Claude", "Gemini", "hello").unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.messages, 1);
        assert_eq!(stats.hand_offs, 1);

        let hand_offs = store.hand_offs().unwrap();
        assert_eq!(hand_offs[0].sender_id, "Claude");
        assert_eq!(hand_offs[0].receiver_id, "Gemini");
        assert_eq!(hand_offs[0].message_id, id);

        let msg = store.hand_off_message(id, "Gemini").unwrap().unwrap();
        assert_eq!(msg.kind, "text");
        assert_eq!(msg.content, "hello");
    }

    #[test]
    fn test_append_with_kind() {
        let (_dir, store) = temp_store();

        let id = store
            .append_with_kind("Claude", "Gemini", "{\"k\":1}", "json")
            .unwrap();

        let msg = store.hand_off_message(id, "Gemini").unwrap().unwrap();
        assert_eq!(msg.kind, "json");
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let (_dir, store) = temp_store();
        store.append("A", "B", "first").unwrap();

        store.initialize().unwrap();
        store.initialize().unwrap();

        let reopened = MessageStore::open(store.path()).unwrap();
        assert_eq!(reopened.all_ordered_by_time().unwrap().len(), 1);
    }

    #[test]
    fn test_open_unwritable_location_fails() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();

        let err = MessageStore::open(blocker.join("baton.db")).unwrap_err();
        assert!(matches!(err, Error::StorageInit { .. }));
    }

    #[test]
    fn test_failed_hand_off_leaves_no_message() {
        let (_dir, store) = temp_store();
        let conn = Connection::open(store.path()).unwrap();
        conn.execute_batch(
            "CREATE TRIGGER reject_hand_off BEFORE INSERT ON hand_offs
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        )
        .unwrap();
        drop(conn);

        let err = store.append("A", "B", "c").unwrap_err();

        assert!(matches!(err, Error::StorageWrite { op: "append", .. }));
        assert_eq!(store.stats().unwrap(), StoreStats::default());
        assert!(store.latest_addressed_to("B").unwrap().is_none());
    }

    #[test]
    fn test_schema_indexes_created_at() {
        let (_dir, store) = temp_store();
        let conn = Connection::open(store.path()).unwrap();

        let found: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = 'idx_messages_created'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(found, 1);
    }

    #[test]
    fn test_hand_off_message_checks_receiver() {
        let (_dir, store) = temp_store();

        let id = store.append("A", "B", "for B").unwrap();

        assert!(store.hand_off_message(id, "B").unwrap().is_some());
        assert!(store.hand_off_message(id, "A").unwrap().is_none());
        assert!(store.hand_off_message(id, "C").unwrap().is_none());
        assert!(store.hand_off_message(id + 1, "B").unwrap().is_none());
    }

    #[test]
    fn test_latest_addressed_to_returns_newest() {
        let (_dir, store) = temp_store();

        assert!(store.latest_addressed_to("B").unwrap().is_none());

        store.append("A", "B", "older").unwrap();
        store.append("B", "C", "unrelated").unwrap();
        let newer = store.append("C", "B", "newer").unwrap();

        let latest = store.latest_addressed_to("B").unwrap().unwrap();
        assert_eq!(latest.id, newer);
        assert_eq!(latest.content, "newer");
        assert_eq!(latest.sender_id, "C");
    }

    #[test]
    fn test_own_messages_are_not_addressed_to_sender() {
        let (_dir, store) = temp_store();

        store.append("A", "B", "from A").unwrap();

        assert!(store.latest_addressed_to("A").unwrap().is_none());
    }

    #[test]
    fn test_history_is_ordered() {
        let (_dir, store) = temp_store();

        let agents = ["A", "B", "C"];
        for i in 0..30 {
            let sender = agents[i % 3];
            let receiver = agents[(i + 1) % 3];
            store.append(sender, receiver, &format!("msg {}", i)).unwrap();
        }

        let history = store.all_ordered_by_time().unwrap();
        assert_eq!(history.len(), 30);
        for pair in history.windows(2) {
            assert!(pair[0].created_at <= pair[1].created_at);
            if pair[0].created_at == pair[1].created_at {
                assert!(pair[0].message_id < pair[1].message_id);
            }
        }
        assert_eq!(history[0].content, "msg 0");
        assert_eq!(history[29].receiver_id, "A");
    }

    #[test]
    fn test_reset_clears_everything() {
        let (_dir, store) = temp_store();
        store.append("A", "B", "one").unwrap();
        store.append("B", "A", "two").unwrap();

        store.reset().unwrap();

        assert!(store.all_ordered_by_time().unwrap().is_empty());
        assert!(store.latest_addressed_to("A").unwrap().is_none());
        assert_eq!(store.stats().unwrap(), StoreStats::default());

        // Still writable afterwards.
        store.append("A", "B", "three").unwrap();
        assert_eq!(store.all_ordered_by_time().unwrap().len(), 1);
    }
}
