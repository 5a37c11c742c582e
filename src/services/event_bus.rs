//! EventBus for entity change notifications.
//!
//! Provides a broadcast-based channel with sequence numbering. Persistence
//! layers publish an [`EntityChanged`] after saving an entity; cache
//! invalidation and any other interested party subscribe.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::domain::models::{Entity, EntityChanged, EventBusConfig, SequenceNumber};

/// Central event bus for broadcasting entity changes to multiple consumers.
pub struct EventBus {
    sender: broadcast::Sender<EntityChanged>,
    sequence: AtomicU64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(&EventBusConfig::default())
    }
}

impl EventBus {
    /// Create a new EventBus with the given configuration.
    pub fn new(config: &EventBusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            sender,
            sequence: AtomicU64::new(0),
        }
    }

    /// Publish a notification, assigning its sequence number.
    ///
    /// Returns the number of subscribers that will see it.
    pub fn publish(&self, mut event: EntityChanged) -> usize {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        event.sequence = SequenceNumber(seq);

        // Ignore send errors - there may be no subscribers
        self.sender.send(event).unwrap_or(0)
    }

    /// Publish that `entity` was persisted.
    pub fn publish_entity(&self, entity: Arc<dyn Entity>) -> usize {
        self.publish(EntityChanged::new(entity))
    }

    /// Subscribe to the notification stream.
    pub fn subscribe(&self) -> broadcast::Receiver<EntityChanged> {
        self.sender.subscribe()
    }

    /// Get the current sequence number.
    pub fn current_sequence(&self) -> SequenceNumber {
        SequenceNumber(self.sequence.load(Ordering::SeqCst))
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
