//! SQLite connection pool for camera event storage.
//!
//! Ingestion batches take the database write lock with `BEGIN IMMEDIATE`
//! and hold it for the whole batch. Every pooled connection is therefore
//! set up so that readers never block on that lock (WAL), concurrent
//! batches queue on it for a bounded time (`busy_timeout`), and the
//! `events.camera_id` foreign key is enforced.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};
use thiserror::Error;

/// A type alias for the SQLite connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Runtime tunables for SQLite connection behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbRuntimeSettings {
    /// How long a batch waits for another batch's write lock, in
    /// milliseconds, before failing with a storage error.
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled SQLite connections.
    pub pool_max_size: u32,
}

impl Default for DbRuntimeSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            pool_max_size: 8,
        }
    }
}

/// Errors raised while opening the event database.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The pool could not open its initial connections.
    #[error("failed to open event database: {0}")]
    PoolInit(#[from] r2d2::Error),
}

/// Applies the per-connection settings used by event ingestion.
///
/// `:memory:` databases report journal mode `memory` and cannot use WAL;
/// any other non-WAL result is an error.
fn configure_connection(conn: &mut Connection, settings: DbRuntimeSettings) -> rusqlite::Result<()> {
    let journal_mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row: &rusqlite::Row<'_>| {
            row.get(0)
        })?;
    if !matches!(journal_mode.as_str(), "wal" | "memory") {
        return Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some(format!("event database refused WAL, journal_mode={journal_mode}")),
        ));
    }

    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.busy_timeout(std::time::Duration::from_millis(settings.busy_timeout_ms))?;
    Ok(())
}

/// Opens the event database at `db_path` behind an r2d2 pool.
///
/// `:memory:` gives every pooled connection its own private database, so
/// anything that reads through more than one connection needs a file path.
///
/// # Errors
///
/// Returns `PoolError::PoolInit` if the initial connections cannot be opened
/// or configured.
pub fn create_pool(db_path: &str, settings: DbRuntimeSettings) -> Result<DbPool, PoolError> {
    let manager = SqliteConnectionManager::file(db_path)
        .with_flags(
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )
        .with_init(move |conn| configure_connection(conn, settings));

    let pool = Pool::builder()
        .max_size(settings.pool_max_size)
        .build(manager)?;

    tracing::debug!(
        path = db_path,
        pool_max_size = settings.pool_max_size,
        busy_timeout_ms = settings.busy_timeout_ms,
        "opened event database pool"
    );

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn file_pool(dir: &tempfile::TempDir, settings: DbRuntimeSettings) -> DbPool {
        let path = dir.path().join("events.db");
        create_pool(path.to_str().expect("temp path should be utf-8"), settings)
            .expect("pool creation should succeed")
    }

    #[test]
    fn connections_carry_ingestion_pragmas() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let pool = file_pool(
            &dir,
            DbRuntimeSettings {
                busy_timeout_ms: 750,
                pool_max_size: 2,
            },
        );
        let conn = pool.get().expect("should get a connection");

        let pragma = |name: &str| -> i64 {
            conn.query_row(&format!("PRAGMA {name}"), [], |row| row.get(0))
                .expect("should read pragma")
        };
        assert_eq!(pragma("foreign_keys"), 1);
        assert_eq!(pragma("busy_timeout"), 750);
        // NORMAL
        assert_eq!(pragma("synchronous"), 1);

        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .expect("should read journal_mode");
        assert_eq!(mode, "wal");
        assert_eq!(pool.max_size(), 2);
    }

    #[test]
    fn in_memory_pool_falls_back_to_memory_journal() {
        let pool = create_pool(":memory:", DbRuntimeSettings::default())
            .expect("pool creation should succeed");
        let conn = pool.get().expect("should get a connection");
        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .expect("should read journal_mode");
        assert_eq!(mode, "memory");
    }

    #[test]
    fn second_writer_waits_for_busy_timeout_then_fails() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let pool = file_pool(
            &dir,
            DbRuntimeSettings {
                busy_timeout_ms: 100,
                pool_max_size: 2,
            },
        );

        let holder = pool.get().expect("should get a connection");
        holder
            .execute_batch("BEGIN IMMEDIATE")
            .expect("first writer should take the lock");

        let waiter = pool.get().expect("should get a second connection");
        let started = Instant::now();
        let err = waiter
            .execute_batch("BEGIN IMMEDIATE")
            .expect_err("second writer should time out");
        assert!(started.elapsed() >= Duration::from_millis(90));
        assert_eq!(err.sqlite_error_code(), Some(rusqlite::ErrorCode::DatabaseBusy));

        holder.execute_batch("COMMIT").expect("should release the lock");
        waiter
            .execute_batch("BEGIN IMMEDIATE; COMMIT;")
            .expect("lock is free again");
    }

    #[test]
    fn readers_see_committed_rows_while_a_batch_holds_the_lock() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let pool = file_pool(&dir, DbRuntimeSettings::default());

        let writer = pool.get().expect("should get a connection");
        writer
            .execute_batch(
                "CREATE TABLE cameras (id TEXT PRIMARY KEY);
                 INSERT INTO cameras (id) VALUES ('cam1');
                 BEGIN IMMEDIATE;
                 INSERT INTO cameras (id) VALUES ('cam2');",
            )
            .expect("should open a write transaction");

        let reader = pool.get().expect("should get a reader");
        let visible: i64 = reader
            .query_row("SELECT COUNT(*) FROM cameras", [], |row| row.get(0))
            .expect("WAL readers are not blocked by the writer");
        assert_eq!(visible, 1);

        writer.execute_batch("COMMIT").expect("should commit");
    }
}
