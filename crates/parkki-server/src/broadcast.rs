//! Fan-out of committed event notifications to live subscribers.
//!
//! Delivery is best-effort and at-most-once. Each committed batch is
//! serialised once into a [`FrameBatch`] and offered to every registered
//! subscriber with a single non-blocking `try_send`, so a batch of any size
//! takes one slot of the subscriber's buffer. A subscriber whose buffer is
//! full or whose receiver has gone away is unregistered on the spot and
//! receives nothing further. Delivery failures never reach the ingestion
//! caller.

use parkki_types::EventNotification;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::subscribers::{FrameBatch, SubscriberId, SubscriberRegistry};

/// A single subscriber could not be handed a notification batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The subscriber's buffer is full; it is not keeping up.
    #[error("subscriber buffer full")]
    Lagging,
    /// The subscriber's transport has shut down.
    #[error("subscriber disconnected")]
    Disconnected,
}

impl<T> From<TrySendError<T>> for DeliveryError {
    fn from(err: TrySendError<T>) -> Self {
        match err {
            TrySendError::Full(_) => Self::Lagging,
            TrySendError::Closed(_) => Self::Disconnected,
        }
    }
}

/// Counts from one [`BroadcastHub::publish`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Subscribers that were handed the batch.
    pub delivered: usize,
    /// Subscribers dropped after a delivery failure.
    pub dropped: usize,
}

/// Serialises notifications and delivers them to the [`SubscriberRegistry`].
#[derive(Clone)]
pub struct BroadcastHub {
    registry: SubscriberRegistry,
    subscriber_buffer: usize,
}

impl BroadcastHub {
    /// Creates a hub whose subscribers each get a buffer of
    /// `subscriber_buffer` pending batches.
    pub fn new(registry: SubscriberRegistry, subscriber_buffer: usize) -> Self {
        Self {
            registry,
            subscriber_buffer: subscriber_buffer.max(1),
        }
    }

    pub fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }

    /// Registers a transport's sender and returns its subscriber id.
    pub async fn on_subscriber_connect(&self, sender: mpsc::Sender<FrameBatch>) -> SubscriberId {
        let id = self.registry.register(sender).await;
        tracing::info!(subscriber_id = %id, "subscriber connected");
        id
    }

    /// Opens a channel sized by the configured buffer and registers it.
    ///
    /// Transports forward every frame of every received batch to the client.
    pub async fn subscribe(&self) -> (SubscriberId, mpsc::Receiver<FrameBatch>) {
        let (tx, rx) = mpsc::channel(self.subscriber_buffer);
        let id = self.on_subscriber_connect(tx).await;
        (id, rx)
    }

    /// Unregisters a subscriber when its connection closes.
    pub async fn on_subscriber_disconnect(&self, id: SubscriberId) {
        if self.registry.unregister(id).await {
            tracing::info!(subscriber_id = %id, "subscriber disconnected");
        }
    }

    /// Delivers `notifications` as one ordered batch to every subscriber.
    pub async fn publish(&self, notifications: &[EventNotification]) -> PublishReport {
        let frames: Vec<String> = notifications
            .iter()
            .filter_map(|n| match serde_json::to_string(n) {
                Ok(json) => Some(json),
                Err(e) => {
                    tracing::error!(
                        event_id = %n.event_id,
                        "failed to serialize event notification: {}",
                        e
                    );
                    None
                }
            })
            .collect();

        if frames.is_empty() {
            return PublishReport::default();
        }

        let batch: FrameBatch = Arc::from(frames);
        let mut report = PublishReport::default();
        let mut failed: Vec<(SubscriberId, DeliveryError)> = Vec::new();

        self.registry
            .for_each_active(|id, sender| match sender.try_send(Arc::clone(&batch)) {
                Ok(()) => report.delivered += 1,
                Err(e) => failed.push((id, e.into())),
            })
            .await;

        for (id, err) in failed {
            tracing::warn!(
                subscriber_id = %id,
                "dropping subscriber after delivery failure: {}",
                err
            );
            self.registry.unregister(id).await;
            report.dropped += 1;
        }

        report
    }
}
