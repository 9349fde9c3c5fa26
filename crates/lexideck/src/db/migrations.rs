//! Schema migrations for the card store.
//!
//! Applied versions are recorded in `_migrations`. Each pending migration
//! runs in its own transaction together with its bookkeeping row, so a
//! failed step leaves the schema at the previous version.

use rusqlite::{params, Connection};

use super::error::DatabaseError;

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_cards_table",
        sql: include_str!("sql/001_create_cards.sql"),
    },
    Migration {
        version: 2,
        name: "create_cards_state_index",
        sql: include_str!("sql/002_create_cards_state_index.sql"),
    },
];

/// Highest schema version this build knows about.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

/// Schema version currently recorded in the database.
pub fn applied_version(conn: &Connection) -> Result<u32, DatabaseError> {
    Ok(conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM _migrations",
        [],
        |row| row.get(0),
    )?)
}

/// Brings the card schema up to date.
pub fn run_all(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let applied = applied_version(conn)?;
    if applied > latest_version() {
        log::warn!(
            "Card database is at schema v{}, newer than this build (v{})",
            applied,
            latest_version()
        );
        return Ok(());
    }

    for migration in MIGRATIONS.iter().filter(|m| m.version > applied) {
        log::info!("Applying card schema v{} ({})", migration.version, migration.name);

        let failed = |e: rusqlite::Error| DatabaseError::Migration {
            version: migration.version,
            reason: e.to_string(),
        };
        let tx = conn.unchecked_transaction().map_err(failed)?;
        tx.execute_batch(migration.sql).map_err(failed)?;
        tx.execute(
            "INSERT INTO _migrations (version, name) VALUES (?1, ?2)",
            params![migration.version, migration.name],
        )
        .map_err(failed)?;
        tx.commit().map_err(failed)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn migrated() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_all(&conn).unwrap();
        conn
    }

    #[test]
    fn test_fresh_database_reaches_latest_version() {
        let conn = migrated();
        assert_eq!(applied_version(&conn).unwrap(), latest_version());
    }

    #[test]
    fn test_rerun_applies_nothing() {
        let conn = migrated();
        run_all(&conn).unwrap();

        let rows: u32 = conn
            .query_row("SELECT COUNT(*) FROM _migrations", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, MIGRATIONS.len() as u32);
    }

    #[test]
    fn test_new_cards_default_to_waiting() {
        let conn = migrated();
        conn.execute(
            "INSERT INTO cards (phrase, created_at, updated_at)
             VALUES ('casa', '2026-01-01', '2026-01-01')",
            [],
        )
        .unwrap();

        let state: String = conn
            .query_row("SELECT state FROM cards WHERE phrase = 'casa'", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(state, "waiting");
    }

    #[test]
    fn test_state_index_exists() {
        let conn = migrated();
        let found: u32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = 'idx_cards_state'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(found, 1);
    }

    #[test]
    fn test_newer_schema_is_left_alone() {
        let conn = migrated();
        conn.execute(
            "INSERT INTO _migrations (version, name) VALUES (99, 'from_the_future')",
            [],
        )
        .unwrap();

        run_all(&conn).unwrap();
        assert_eq!(applied_version(&conn).unwrap(), 99);
    }
}
