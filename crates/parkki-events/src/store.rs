//! Persistence operations for cameras and detection events.
//!
//! Every function takes a plain `&Connection`; a `rusqlite::Transaction`
//! derefs to one, so the same statements run standalone or inside the batch
//! transaction opened by [`crate::persist_batch`].

use chrono::{SecondsFormat, Utc};
use parkki_types::{Camera, CameraStatus, Event, EventSnapshot};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::error::EventStoreError;
use crate::validation::ValidatedEvent;

/// Default number of events returned by [`list_events`].
pub const DEFAULT_EVENT_LIMIT: i64 = 100;

/// Outcome of writing a snapshot to a camera record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraUpsert {
    /// The camera did not exist and was registered implicitly.
    Created,
    /// An existing camera's snapshot was replaced.
    Updated,
}

/// Parameters for registering a camera explicitly.
#[derive(Debug, Clone)]
pub struct NewCamera {
    pub id: String,
    pub name: String,
    pub status: Option<CameraStatus>,
}

/// Filter criteria for [`list_events`].
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Only return events for this camera.
    pub camera_id: Option<String>,
    /// Maximum number of events to return (default: [`DEFAULT_EVENT_LIMIT`]).
    pub limit: Option<i64>,
}

/// Inserts one validated event for a camera.
///
/// The event identifier (UUID v4) and `received_at` (UTC, millisecond
/// precision) are assigned here; clients never supply either.
///
/// # Errors
///
/// Returns `EventStoreError::Database` on SQL failure, including a
/// foreign-key violation when the camera does not exist and foreign keys are
/// not deferred.
pub fn insert_event(
    conn: &Connection,
    camera_id: &str,
    input: &ValidatedEvent,
) -> Result<Event, EventStoreError> {
    let event = Event {
        id: Uuid::new_v4().to_string(),
        camera_id: camera_id.to_string(),
        event_type: input.event_type.clone(),
        confidence: input.confidence,
        timestamp: input.timestamp.clone(),
        received_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    };

    conn.execute(
        "INSERT INTO events (id, camera_id, event_type, confidence, timestamp, received_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            event.id,
            event.camera_id,
            event.event_type,
            event.confidence,
            event.timestamp,
            event.received_at,
        ],
    )?;

    Ok(event)
}

/// Writes `snapshot` as the camera's last event, registering the camera if needed.
///
/// An existing camera keeps its status unless it was never set, in which
/// case it becomes `online`. An unknown camera is created with the derived
/// name `Camera-<id>` and status `online`.
///
/// # Errors
///
/// Returns `EventStoreError::Serialization` if the snapshot cannot be
/// encoded, or `EventStoreError::Database` on SQL failure.
pub fn upsert_camera_snapshot(
    conn: &Connection,
    camera_id: &str,
    snapshot: &EventSnapshot,
) -> Result<CameraUpsert, EventStoreError> {
    let snapshot_json = serde_json::to_string(snapshot)?;

    let updated = conn.execute(
        "UPDATE cameras
         SET last_event = ?2, status = COALESCE(status, ?3)
         WHERE id = ?1",
        params![camera_id, snapshot_json, CameraStatus::Online.as_str()],
    )?;
    if updated > 0 {
        return Ok(CameraUpsert::Updated);
    }

    conn.execute(
        "INSERT INTO cameras (id, name, status, last_event) VALUES (?1, ?2, ?3, ?4)",
        params![
            camera_id,
            format!("Camera-{camera_id}"),
            CameraStatus::Online.as_str(),
            snapshot_json,
        ],
    )?;
    Ok(CameraUpsert::Created)
}

/// Registers a camera explicitly.
///
/// # Errors
///
/// Returns `EventStoreError::CameraExists` if the identifier is taken, or
/// `EventStoreError::Database` on SQL failure.
pub fn create_camera(conn: &Connection, camera: &NewCamera) -> Result<Camera, EventStoreError> {
    let inserted = conn.execute(
        "INSERT INTO cameras (id, name, status) VALUES (?1, ?2, ?3)
         ON CONFLICT(id) DO NOTHING",
        params![camera.id, camera.name, camera.status.map(CameraStatus::as_str)],
    )?;
    if inserted == 0 {
        return Err(EventStoreError::CameraExists(camera.id.clone()));
    }
    get_camera(conn, &camera.id)
}

/// Retrieves a camera by identifier.
///
/// # Errors
///
/// Returns `EventStoreError::CameraNotFound` if no such camera exists.
pub fn get_camera(conn: &Connection, camera_id: &str) -> Result<Camera, EventStoreError> {
    conn.query_row(
        "SELECT id, name, status, last_event, created_at FROM cameras WHERE id = ?1",
        [camera_id],
        map_row_to_camera,
    )
    .optional()?
    .ok_or_else(|| EventStoreError::CameraNotFound(camera_id.to_string()))
}

/// Lists all cameras, most recently created first.
pub fn list_cameras(conn: &Connection) -> Result<Vec<Camera>, EventStoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, status, last_event, created_at
         FROM cameras
         ORDER BY created_at DESC, rowid DESC",
    )?;

    let rows = stmt.query_map([], map_row_to_camera)?;
    let mut cameras = Vec::new();
    for row in rows {
        cameras.push(row?);
    }
    Ok(cameras)
}

/// Lists committed events, most recent first.
pub fn list_events(conn: &Connection, filter: &EventFilter) -> Result<Vec<Event>, EventStoreError> {
    let limit = filter.limit.unwrap_or(DEFAULT_EVENT_LIMIT);

    // `?1 IS NULL` keeps a single prepared statement for both the filtered
    // and unfiltered read.
    let mut stmt = conn.prepare(
        "SELECT id, camera_id, event_type, confidence, timestamp, received_at
         FROM events
         WHERE ?1 IS NULL OR camera_id = ?1
         ORDER BY seq DESC
         LIMIT ?2",
    )?;

    let rows = stmt.query_map(params![filter.camera_id, limit], |row| {
        Ok(Event {
            id: row.get(0)?,
            camera_id: row.get(1)?,
            event_type: row.get(2)?,
            confidence: row.get(3)?,
            timestamp: row.get(4)?,
            received_at: row.get(5)?,
        })
    })?;

    let mut events = Vec::new();
    for row in rows {
        events.push(row?);
    }
    Ok(events)
}

/// Counts committed events for a camera.
pub fn count_events(conn: &Connection, camera_id: &str) -> Result<i64, EventStoreError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM events WHERE camera_id = ?1",
        [camera_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn map_row_to_camera(row: &Row) -> rusqlite::Result<Camera> {
    let status: Option<String> = row.get(2)?;
    let status = status
        .map(|s| s.parse::<CameraStatus>())
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;

    let last_event: Option<String> = row.get(3)?;
    let last_event = last_event
        .map(|json| serde_json::from_str::<EventSnapshot>(&json))
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

    Ok(Camera {
        id: row.get(0)?,
        name: row.get(1)?,
        status,
        last_event,
        created_at: row.get(4)?,
    })
}
