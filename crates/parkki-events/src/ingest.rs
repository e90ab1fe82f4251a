//! Transactional persistence of a validated event batch.

use parkki_types::Event;
use rusqlite::{Connection, TransactionBehavior};

use crate::error::EventStoreError;
use crate::snapshot::build_snapshot;
use crate::store::{insert_event, upsert_camera_snapshot, CameraUpsert};
use crate::validation::ValidatedEvent;

/// A batch that has been committed.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedBatch {
    /// The persisted events, in input order.
    pub events: Vec<Event>,
    /// Whether the camera was registered implicitly by this batch.
    pub camera: CameraUpsert,
}

impl PersistedBatch {
    /// Identifiers of the persisted events, in input order.
    pub fn event_ids(&self) -> Vec<String> {
        self.events.iter().map(|e| e.id.clone()).collect()
    }
}

/// Persists a validated batch for one camera inside a single transaction.
///
/// For each event, in order: insert the event, then write its snapshot to the
/// camera record (creating the camera if it is unknown). The transaction is
/// committed only if every step succeeds; on any error it is dropped, which
/// rolls back every insert and snapshot write of the batch.
///
/// The transaction is opened `IMMEDIATE` so the write lock is held before the
/// first `received_at` is stamped. Commit order across batches therefore
/// matches `received_at` order, and a camera's snapshot always reflects its
/// latest committed event.
///
/// # Errors
///
/// Returns `EventStoreError` if any statement or the commit fails. Nothing
/// from the batch is visible afterwards.
pub fn persist_batch(
    conn: &mut Connection,
    camera_id: &str,
    events: &[ValidatedEvent],
) -> Result<PersistedBatch, EventStoreError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    // Events are inserted before their snapshot creates an unknown camera;
    // the foreign key is checked at commit instead. Resets on COMMIT/ROLLBACK.
    tx.pragma_update(None, "defer_foreign_keys", true)?;

    let mut persisted = Vec::with_capacity(events.len());
    let mut camera = CameraUpsert::Updated;

    for input in events {
        let event = insert_event(&tx, camera_id, input)?;
        if upsert_camera_snapshot(&tx, camera_id, &build_snapshot(&event))?
            == CameraUpsert::Created
        {
            camera = CameraUpsert::Created;
        }
        persisted.push(event);
    }

    tx.commit()?;

    if camera == CameraUpsert::Created {
        tracing::info!(camera_id, "registered unknown camera on first event");
    }
    tracing::debug!(camera_id, accepted = persisted.len(), "committed event batch");

    Ok(PersistedBatch {
        events: persisted,
        camera,
    })
}
