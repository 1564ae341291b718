//! Error types for baton.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The backing database could not be created or opened.
    #[error("Storage init error at {}: {reason}", .path.display())]
    StorageInit { path: PathBuf, reason: String },

    /// A write (append, reset) failed. Nothing from the failed operation persists.
    #[error("Storage write error during {op}: {source}")]
    StorageWrite {
        op: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Storage read error during {op}: {source}")]
    StorageRead {
        op: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn write(op: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| Error::StorageWrite { op, source }
    }

    pub(crate) fn read(op: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| Error::StorageRead { op, source }
    }
}
