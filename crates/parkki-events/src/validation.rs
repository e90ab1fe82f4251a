//! Structural validation of raw event batches.
//!
//! Validation runs before any transaction is opened. A single malformed
//! payload rejects the whole batch; the error names the offending field and
//! its position in the batch.

use chrono::DateTime;
use parkki_types::EventInput;
use thiserror::Error;

/// Maximum number of events accepted in one batch.
pub const MAX_BATCH_EVENTS: usize = 500;

/// A batch was rejected because one payload (or the batch itself) is malformed.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid {}: {}", location(.index, .field), .reason)]
pub struct ValidationError {
    /// Position of the offending payload in the batch, if the error is per-event.
    pub index: Option<usize>,
    /// The offending field, e.g. `confidence`.
    pub field: String,
    /// What is wrong with it.
    pub reason: String,
}

impl ValidationError {
    fn batch(field: &str, reason: impl Into<String>) -> Self {
        Self {
            index: None,
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    fn event(index: usize, field: &str, reason: impl Into<String>) -> Self {
        Self {
            index: Some(index),
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// `events[i].field` for per-event errors, the bare field otherwise.
fn location(index: &Option<usize>, field: &str) -> String {
    match index {
        Some(i) => format!("events[{i}].{field}"),
        None => field.to_string(),
    }
}

/// An event payload that passed structural validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedEvent {
    pub event_type: String,
    pub timestamp: String,
    pub confidence: f64,
}

/// Validates a batch for one camera.
///
/// Checks, in order: the camera identifier is non-blank, the batch holds
/// between 1 and [`MAX_BATCH_EVENTS`] payloads, and every payload has a
/// non-blank `type`, an RFC 3339 `timestamp`, and a finite `confidence`
/// within `[0, 1]`. The first failure is returned.
pub fn validate_batch(
    camera_id: &str,
    inputs: &[EventInput],
) -> Result<Vec<ValidatedEvent>, ValidationError> {
    if camera_id.trim().is_empty() {
        return Err(ValidationError::batch("camera_id", "must not be empty"));
    }
    if inputs.is_empty() {
        return Err(ValidationError::batch(
            "events",
            "batch must contain at least one event",
        ));
    }
    if inputs.len() > MAX_BATCH_EVENTS {
        return Err(ValidationError::batch(
            "events",
            format!("batch exceeds maximum of {} events", MAX_BATCH_EVENTS),
        ));
    }

    inputs
        .iter()
        .enumerate()
        .map(|(index, input)| validate_event(index, input))
        .collect()
}

fn validate_event(index: usize, input: &EventInput) -> Result<ValidatedEvent, ValidationError> {
    let event_type = match input.event_type.as_deref().map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        Some(_) => return Err(ValidationError::event(index, "type", "must not be empty")),
        None => return Err(ValidationError::event(index, "type", "is required")),
    };

    let timestamp = match input.timestamp.as_deref() {
        Some(ts) => {
            DateTime::parse_from_rfc3339(ts).map_err(|e| {
                ValidationError::event(index, "timestamp", format!("not RFC 3339: {e}"))
            })?;
            ts.to_string()
        }
        None => return Err(ValidationError::event(index, "timestamp", "is required")),
    };

    let confidence = match input.confidence {
        Some(c) if c.is_finite() && (0.0..=1.0).contains(&c) => c,
        Some(c) => {
            return Err(ValidationError::event(
                index,
                "confidence",
                format!("must be within [0, 1], got {c}"),
            ))
        }
        None => return Err(ValidationError::event(index, "confidence", "is required")),
    };

    Ok(ValidatedEvent {
        event_type,
        timestamp,
        confidence,
    })
}
