//! Camera event store for the Parkki platform.
//!
//! Owns every read and write against the `cameras` and `events` tables:
//! structural validation of raw event batches, the camera "last event"
//! snapshot, and the all-or-nothing persistence of a batch inside a single
//! SQLite transaction.
//!
//! Real-time delivery is *not* part of this crate. [`persist_batch`] returns
//! only after the transaction has committed, and callers notify subscribers
//! from the returned [`PersistedBatch`]; a rolled-back batch therefore never
//! produces a notification.
//!
//! # Usage
//!
//! ```rust,ignore
//! use parkki_events::{persist_batch, validate_batch};
//!
//! let validated = validate_batch("cam1", &inputs)?;
//! let batch = persist_batch(&mut conn, "cam1", &validated)?;
//! let notifications: Vec<EventNotification> =
//!     batch.events.iter().map(EventNotification::from).collect();
//! hub.publish(&notifications).await;
//! ```

mod error;
mod ingest;
mod snapshot;
mod store;
mod validation;

pub use error::EventStoreError;
pub use ingest::{persist_batch, PersistedBatch};
pub use snapshot::{build_snapshot, summarize};
pub use store::{
    count_events, create_camera, get_camera, insert_event, list_cameras, list_events,
    upsert_camera_snapshot, CameraUpsert, EventFilter, NewCamera, DEFAULT_EVENT_LIMIT,
};
pub use validation::{validate_batch, ValidatedEvent, ValidationError, MAX_BATCH_EVENTS};
