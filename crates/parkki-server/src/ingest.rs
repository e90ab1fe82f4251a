//! Ingestion coordinator: validate, persist, then notify.
//!
//! A batch moves through three phases:
//!
//! 1. **Validate** every payload before touching the database.
//! 2. **Persist** the whole batch in one transaction on the blocking pool.
//! 3. **Notify** subscribers, in input order, only after the commit succeeded.
//!
//! Phases 2 and 3 run together on a spawned task that outlives the caller.
//!
//! A batch that fails in phase 1 or 2 has no persisted or broadcast effects.

use parkki_db::DbPool;
use parkki_events::{
    list_events, persist_batch, validate_batch, EventFilter, EventStoreError, ValidatedEvent,
    ValidationError,
};
use parkki_types::{Event, EventInput, EventNotification};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::broadcast::BroadcastHub;

/// Result returned to the caller for an accepted batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReceipt {
    pub accepted_count: usize,
    /// Exactly the persisted event ids, in input order.
    pub event_ids: Vec<String>,
}

/// Underlying cause of an [`IngestError::Storage`] failure.
#[derive(Debug, Error)]
pub enum StorageFault {
    #[error(transparent)]
    Store(#[from] EventStoreError),
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Errors surfaced to the caller of [`IngestionCoordinator::submit_events`].
#[derive(Debug, Error)]
pub enum IngestError {
    /// A payload was malformed; nothing was persisted.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The transaction failed and was rolled back.
    ///
    /// The display message is generic; the cause is only logged.
    #[error("storage error")]
    Storage(#[source] StorageFault),
}

impl From<EventStoreError> for IngestError {
    fn from(err: EventStoreError) -> Self {
        Self::Storage(err.into())
    }
}

impl From<r2d2::Error> for IngestError {
    fn from(err: r2d2::Error) -> Self {
        Self::Storage(err.into())
    }
}

impl From<tokio::task::JoinError> for IngestError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Storage(err.into())
    }
}

/// Drives validation, persistence and fan-out for event batches.
#[derive(Clone)]
pub struct IngestionCoordinator {
    pool: DbPool,
    hub: BroadcastHub,
}

impl IngestionCoordinator {
    pub fn new(pool: DbPool, hub: BroadcastHub) -> Self {
        Self { pool, hub }
    }

    /// Validates, persists and broadcasts a batch of events for one camera.
    ///
    /// Unknown cameras are registered as part of the batch transaction.
    /// Persistence and notification run on a detached task, so a caller
    /// that stops waiting (for example a disconnected HTTP client) cannot
    /// leave a committed batch unannounced.
    ///
    /// # Errors
    ///
    /// - `IngestError::Validation` if any payload is malformed.
    /// - `IngestError::Storage` if the transaction fails; the batch is rolled
    ///   back and no notification is sent.
    pub async fn submit_events(
        &self,
        camera_id: &str,
        inputs: Vec<EventInput>,
    ) -> Result<IngestReceipt, IngestError> {
        let validated = validate_batch(camera_id, &inputs).map_err(|e| {
            tracing::debug!(camera_id, error = %e, "rejected event batch");
            e
        })?;

        let coordinator = self.clone();
        let cid = camera_id.to_string();
        tokio::spawn(async move { coordinator.commit_and_notify(cid, validated).await }).await?
    }

    async fn commit_and_notify(
        &self,
        camera_id: String,
        validated: Vec<ValidatedEvent>,
    ) -> Result<IngestReceipt, IngestError> {
        let pool = self.pool.clone();
        let cid = camera_id.clone();
        let persisted = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            persist_batch(&mut conn, &cid, &validated).map_err(IngestError::from)
        })
        .await
        .map_err(IngestError::from)
        .and_then(|result| result)
        .map_err(|e| {
            if let IngestError::Storage(cause) = &e {
                tracing::error!(camera_id = %camera_id, "event batch rolled back: {}", cause);
            }
            e
        })?;

        let notifications: Vec<EventNotification> =
            persisted.events.iter().map(EventNotification::from).collect();
        let report = self.hub.publish(&notifications).await;

        tracing::info!(
            camera_id = %camera_id,
            accepted = persisted.events.len(),
            subscribers = report.delivered,
            "ingested event batch"
        );

        Ok(IngestReceipt {
            accepted_count: persisted.events.len(),
            event_ids: persisted.event_ids(),
        })
    }

    /// Lists committed events, most recent first, optionally for one camera.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::Storage` if the read fails.
    pub async fn list_events(
        &self,
        camera_id: Option<String>,
        limit: Option<i64>,
    ) -> Result<Vec<Event>, IngestError> {
        let pool = self.pool.clone();
        let filter = EventFilter { camera_id, limit };
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            list_events(&conn, &filter).map_err(IngestError::from)
        })
        .await?
    }
}
