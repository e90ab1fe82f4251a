//! Database layer for the Parkki platform.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization,
//! and embedded SQL migrations. The `cameras` and `events` tables are created
//! through versioned migrations managed by this crate.
//!
//! # Design decisions
//!
//! - **SQLite with WAL mode**: a single ingestion server owns its store. WAL
//!   mode allows concurrent readers with a single writer, which matches the
//!   ingest-heavy, dashboard-read access pattern.
//! - **`r2d2` connection pool**: bounded connection reuse for the blocking
//!   tasks that run every statement.
//! - **Embedded migrations**: SQL files are compiled into the binary via
//!   `include_str!`, so the schema ships with the server.

mod migrations;
mod pool;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
