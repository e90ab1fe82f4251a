//! Schema migrations for the camera and event tables.
//!
//! Each migration is a SQL file compiled into the binary. Applied names are
//! recorded in `_parkki_migrations`; a migration and its record commit in the
//! same transaction, so a failed migration leaves no partial schema behind
//! and is retried on the next start.

use rusqlite::Connection;
use std::collections::HashSet;
use thiserror::Error;

struct Migration {
    name: &'static str,
    sql: &'static str,
}

/// Applied in order. Append only.
const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "001_cameras",
        sql: include_str!("migrations/001_cameras.sql"),
    },
    Migration {
        name: "002_events",
        sql: include_str!("migrations/002_events.sql"),
    },
];

const TRACKING_TABLE: &str = "CREATE TABLE IF NOT EXISTS _parkki_migrations (
    name TEXT PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);";

/// Errors raised while bringing the schema up to date.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// A migration's SQL or its tracking record failed; nothing from it
    /// was committed.
    #[error("migration '{name}' failed: {source}")]
    ExecutionFailed {
        name: String,
        source: rusqlite::Error,
    },

    /// The tracking table could not be created or read.
    #[error("failed to read migration state: {0}")]
    StateQuery(rusqlite::Error),
}

/// Brings the `cameras` and `events` schema up to date.
///
/// Returns how many migrations this call applied; zero when the schema is
/// already current.
///
/// # Errors
///
/// Returns `MigrationError` on the first migration that fails. Migrations
/// before it stay applied.
pub fn run_migrations(conn: &Connection) -> Result<usize, MigrationError> {
    apply_pending(conn, MIGRATIONS)
}

fn applied_names(conn: &Connection) -> Result<HashSet<String>, MigrationError> {
    conn.execute_batch(TRACKING_TABLE)
        .map_err(MigrationError::StateQuery)?;

    let mut stmt = conn
        .prepare("SELECT name FROM _parkki_migrations")
        .map_err(MigrationError::StateQuery)?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(MigrationError::StateQuery)?
        .collect::<Result<HashSet<_>, _>>()
        .map_err(MigrationError::StateQuery)?;
    Ok(names)
}

fn apply_one(conn: &Connection, migration: &Migration) -> rusqlite::Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(migration.sql)?;
    tx.execute(
        "INSERT INTO _parkki_migrations (name) VALUES (?1)",
        [migration.name],
    )?;
    tx.commit()
}

fn apply_pending(conn: &Connection, migrations: &[Migration]) -> Result<usize, MigrationError> {
    let done = applied_names(conn)?;
    let pending: Vec<&Migration> = migrations
        .iter()
        .filter(|m| !done.contains(m.name))
        .collect();

    if pending.is_empty() {
        tracing::debug!(applied = done.len(), "event schema is current");
        return Ok(0);
    }

    for migration in &pending {
        apply_one(conn, migration).map_err(|source| MigrationError::ExecutionFailed {
            name: migration.name.to_string(),
            source,
        })?;
        tracing::info!(migration = migration.name, "applied migration");
    }

    Ok(pending.len())
}
