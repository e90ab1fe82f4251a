//! Registry of connected real-time subscribers.

use std::{collections::HashMap, sync::Arc};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// Opaque identifier handed out when a subscriber registers.
pub type SubscriberId = Uuid;

/// Serialized notifications from one committed batch, in event order.
///
/// A batch occupies a single slot in a subscriber's channel regardless of how
/// many events it carries.
pub type FrameBatch = Arc<[String]>;

/// Tracks the send handles of every connected subscriber.
///
/// Each subscriber is a bounded `mpsc::Sender<FrameBatch>` owned by its transport
/// task (WebSocket or SSE). The lock is held only for map operations; it is
/// never held across a send or an `.await` on a subscriber.
#[derive(Clone, Default)]
pub struct SubscriberRegistry {
    subscribers: Arc<RwLock<HashMap<SubscriberId, mpsc::Sender<FrameBatch>>>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber and returns its identifier.
    pub async fn register(&self, sender: mpsc::Sender<FrameBatch>) -> SubscriberId {
        let id = Uuid::new_v4();
        self.subscribers.write().await.insert(id, sender);
        tracing::debug!(subscriber_id = %id, "subscriber registered");
        id
    }

    /// Removes a subscriber. Returns `false` if it was already gone.
    pub async fn unregister(&self, id: SubscriberId) -> bool {
        let removed = self.subscribers.write().await.remove(&id).is_some();
        if removed {
            tracing::debug!(subscriber_id = %id, "subscriber unregistered");
        }
        removed
    }

    /// Number of currently registered subscribers.
    pub async fn len(&self) -> usize {
        self.subscribers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.subscribers.read().await.is_empty()
    }

    /// Calls `f` for every subscriber registered at the time of the call.
    ///
    /// Iterates over a copy of the handles taken under a short read lock;
    /// concurrent `register`/`unregister` calls proceed while `f` runs.
    pub async fn for_each_active<F>(&self, mut f: F)
    where
        F: FnMut(SubscriberId, &mpsc::Sender<FrameBatch>),
    {
        let active: Vec<(SubscriberId, mpsc::Sender<FrameBatch>)> = {
            let subscribers = self.subscribers.read().await;
            subscribers
                .iter()
                .map(|(id, sender)| (*id, sender.clone()))
                .collect()
        };

        for (id, sender) in &active {
            f(*id, sender);
        }
    }
}
