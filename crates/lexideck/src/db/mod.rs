//! Persistence gateway for fetched cards.
//!
//! `CardStore` is the narrow interface the queue and pipeline use. The
//! SQLite implementation lives in `card_repo`, an in-memory one in
//! `memory`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

pub mod card_repo;
pub mod error;
pub mod memory;
pub mod migrations;

pub use error::DatabaseError;
pub use memory::MemoryStore;

use crate::queue::QueueState;
use crate::record::{FieldRecord, SearchTerm};

/// One stored phrase with its fetched data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub phrase: SearchTerm,
    pub state: QueueState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_data: Option<FieldRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queried_at: Option<DateTime<Utc>>,
}

impl Card {
    pub fn new(phrase: SearchTerm) -> Self {
        Self {
            phrase,
            state: QueueState::Waiting,
            base_data: None,
            queried_at: None,
        }
    }

    pub fn has_base_data(&self) -> bool {
        self.base_data.is_some()
    }
}

pub trait CardStore: Send + Sync {
    fn get_card(&self, phrase: &SearchTerm) -> Result<Option<Card>, DatabaseError>;

    /// Adds a waiting card. Returns the existing card unchanged if present.
    fn add_card(&self, phrase: &SearchTerm) -> Result<Card, DatabaseError>;

    fn set_state(&self, phrase: &SearchTerm, state: QueueState) -> Result<(), DatabaseError>;

    /// Stores fetched data. Also stamps `queried_at` and marks the card
    /// ready.
    fn set_base_data(&self, phrase: &SearchTerm, data: &FieldRecord)
        -> Result<(), DatabaseError>;

    fn contains(&self, phrase: &SearchTerm) -> Result<bool, DatabaseError> {
        Ok(self.get_card(phrase)?.is_some())
    }
}

/// SQLite-backed card store.
///
/// Clones share one connection behind a mutex; the queue worker and the
/// front end can hold their own handles. File databases run in WAL mode.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens the card database at `path`, creating parent directories and
    /// migrating the schema as needed.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DatabaseError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        let db = Self::from_connection(conn)?;
        log::info!("Card database ready at {}", path.display());
        Ok(db)
    }

    /// Throwaway database for tests and `--memory` runs.
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, DatabaseError> {
        migrations::run_all(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn schema_version(&self) -> Result<u32, DatabaseError> {
        self.with_conn(migrations::applied_version)
    }

    /// Runs `f` with the connection locked. A poisoned lock is recovered:
    /// every write is a single statement, so the connection stays usable.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Connection) -> Result<T, DatabaseError>,
    {
        let conn = match self.conn.lock() {
            Ok(conn) => conn,
            Err(poisoned) => {
                log::warn!("Card database lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        f(&conn)
    }
}

/// Returns the canonical database path: `~/.lexideck/data/lexideck.db`.
pub fn default_database_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".lexideck").join("data").join("lexideck.db"))
}
