#![allow(dead_code)]

use parkki_db::{create_pool, run_migrations, DbPool, DbRuntimeSettings};
use parkki_server::AppState;
use tempfile::TempDir;

/// On-disk database so every pooled connection sees the same data.
///
/// Keep the returned `TempDir` alive for the duration of the test.
pub fn test_pool() -> (TempDir, DbPool) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("parkki-test.db");
    let pool = create_pool(
        path.to_str().expect("temp path should be utf-8"),
        DbRuntimeSettings::default(),
    )
    .expect("failed to create pool");
    {
        let conn = pool.get().expect("failed to get connection");
        run_migrations(&conn).expect("failed to run migrations");
    }
    (dir, pool)
}

pub fn test_state(subscriber_buffer: usize) -> (TempDir, AppState) {
    let (dir, pool) = test_pool();
    (dir, AppState::new(pool, subscriber_buffer))
}

/// Makes every insert after the first for `camera_id` abort.
pub fn inject_fault_on_second_insert(pool: &DbPool, camera_id: &str) {
    let conn = pool.get().expect("failed to get connection");
    conn.execute_batch(&format!(
        "CREATE TRIGGER inject_storage_fault
         BEFORE INSERT ON events
         WHEN NEW.camera_id = '{camera_id}'
          AND (SELECT COUNT(*) FROM events WHERE camera_id = '{camera_id}') >= 1
         BEGIN
             SELECT RAISE(ABORT, 'injected storage fault');
         END;"
    ))
    .expect("should create fault trigger");
}

pub fn event_input(event_type: &str, timestamp: &str, confidence: f64) -> parkki_types::EventInput {
    parkki_types::EventInput {
        event_type: Some(event_type.to_string()),
        timestamp: Some(timestamp.to_string()),
        confidence: Some(confidence),
    }
}
