//! Database error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the card store.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// SQLite error from rusqlite.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error when creating directories or files.
    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A migration failed to apply.
    #[error("Migration failed at version {version}: {reason}")]
    Migration { version: u32, reason: String },

    /// Stored base data could not be encoded or decoded.
    #[error("Invalid base data for '{phrase}': {source}")]
    BaseData {
        phrase: String,
        #[source]
        source: serde_json::Error,
    },

    /// A write targeted a card that was never added.
    #[error("No card for phrase '{0}'")]
    NotFound(String),

    /// The database lock was poisoned.
    #[error("Database lock poisoned")]
    LockPoisoned,
}
