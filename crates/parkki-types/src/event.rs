//! Detection event records: raw input, persisted row, and live notification.

use serde::{Deserialize, Serialize};

/// A raw event payload as submitted by a camera.
///
/// Every field is optional at the wire level so that missing fields surface
/// as validation errors with field detail instead of opaque decode failures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventInput {
    /// Detection label, e.g. `motion`.
    #[serde(rename = "type", default)]
    pub event_type: Option<String>,
    /// When the detection occurred (RFC 3339).
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Detection confidence, expected in `[0, 1]`.
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// A persisted, immutable detection event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Server-generated identifier (UUID v4).
    pub id: String,
    /// The camera that reported the event.
    pub camera_id: String,
    /// Detection label.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Detection confidence in `[0, 1]`.
    pub confidence: f64,
    /// When the detection occurred (RFC 3339, client-supplied).
    pub timestamp: String,
    /// When the server accepted the event (RFC 3339, UTC).
    pub received_at: String,
}

/// Notification pushed to live subscribers for each committed event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventNotification {
    pub camera_id: String,
    pub event_id: String,
    pub event_type: String,
    pub timestamp: String,
    pub confidence: f64,
}

impl From<&Event> for EventNotification {
    fn from(event: &Event) -> Self {
        Self {
            camera_id: event.camera_id.clone(),
            event_id: event.id.clone(),
            event_type: event.event_type.clone(),
            timestamp: event.timestamp.clone(),
            confidence: event.confidence,
        }
    }
}
