//! Derivation of the camera "last event" snapshot.

use parkki_types::{Event, EventSnapshot};

/// Builds the snapshot stored on `cameras.last_event` for a newly inserted event.
pub fn build_snapshot(event: &Event) -> EventSnapshot {
    EventSnapshot {
        id: event.id.clone(),
        event_type: event.event_type.clone(),
        timestamp: event.timestamp.clone(),
        confidence: event.confidence,
        received_at: event.received_at.clone(),
        summary: summarize(&event.event_type, event.confidence),
    }
}

/// Renders a human-readable summary such as `Motion detected (87%)`.
///
/// The first character of the label is upper-cased and the confidence is
/// rounded to the nearest whole percent.
pub fn summarize(event_type: &str, confidence: f64) -> String {
    let mut chars = event_type.chars();
    let label: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    let percent = (confidence * 100.0).round() as i64;
    format!("{label} detected ({percent}%)")
}
