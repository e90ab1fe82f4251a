//! Shared domain types for the Parkki camera event platform.
//!
//! This crate provides the records that cross crate boundaries: cameras and
//! their last-event snapshots, persisted detection events, raw ingestion
//! payloads, and the notification pushed to live subscribers.
//!
//! No crate in the workspace depends on anything *except* `parkki-types` for
//! cross-cutting type definitions. This keeps the dependency graph clean and
//! prevents circular dependencies.

use serde::{Deserialize, Serialize};

mod event;
pub use event::{Event, EventInput, EventNotification};

/// Connectivity status of a camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraStatus {
    /// The camera is reporting events.
    Online,
    /// The camera is known but not reporting.
    Offline,
}

impl CameraStatus {
    /// Returns the canonical string label stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}

impl std::fmt::Display for CameraStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CameraStatus {
    type Err = ParseCameraStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(Self::Online),
            "offline" => Ok(Self::Offline),
            _ => Err(ParseCameraStatusError(s.to_string())),
        }
    }
}

/// Error returned when parsing an unknown camera status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCameraStatusError(pub String);

impl std::fmt::Display for ParseCameraStatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown camera status: {}", self.0)
    }
}

impl std::error::Error for ParseCameraStatusError {}

/// Denormalized summary of a camera's most recent committed event.
///
/// Stored as JSON in the `cameras.last_event` column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSnapshot {
    /// Identifier of the event this snapshot was derived from.
    pub id: String,
    /// Detection label, e.g. `motion`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// When the detection occurred (RFC 3339, client-supplied).
    pub timestamp: String,
    /// Detection confidence in `[0, 1]`.
    pub confidence: f64,
    /// When the server accepted the event (RFC 3339, UTC).
    pub received_at: String,
    /// Human-readable summary, e.g. `Motion detected (87%)`.
    pub summary: String,
}

/// A registered camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Stable camera identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Connectivity status; `None` until first set.
    pub status: Option<CameraStatus>,
    /// Snapshot of the latest committed event, if any.
    pub last_event: Option<EventSnapshot>,
    /// Creation timestamp (SQLite `datetime('now')`, UTC).
    pub created_at: String,
}
