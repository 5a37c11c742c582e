//! Automatic cache eviction on entity changes.
//!
//! Every "entity persisted" notification evicts the entry keyed by the
//! entity's type name, no bucket, and its identity value. Eviction is best
//! effort: failures are logged and the notification is dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use super::cache_manager::CacheManager;
use super::event_bus::EventBus;
use crate::adapters::codec::JsonCodec;
use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::models::Entity;
use crate::domain::ports::{Codec, ConnectionPool, EntityChangeListener};

/// Counters describing processed notifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvalidationStats {
    /// Notifications handed to the subscriber.
    pub received: u64,
    /// Entries evicted.
    pub invalidated: u64,
    /// Notifications dropped after a failure.
    pub skipped: u64,
}

/// Evicts cache entries of changed entities.
pub struct InvalidationSubscriber<P: ConnectionPool, C: Codec = JsonCodec> {
    manager: Arc<CacheManager<P, C>>,
    received: AtomicU64,
    invalidated: AtomicU64,
    skipped: AtomicU64,
}

impl<P: ConnectionPool, C: Codec> InvalidationSubscriber<P, C> {
    /// Subscriber evicting through `manager`.
    pub fn new(manager: Arc<CacheManager<P, C>>) -> Self {
        Self {
            manager,
            received: AtomicU64::new(0),
            invalidated: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
        }
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> InvalidationStats {
        InvalidationStats {
            received: self.received.load(Ordering::SeqCst),
            invalidated: self.invalidated.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
        }
    }

    /// Evict the entry of `entity`, reporting why it could not be done.
    pub async fn invalidate_entity(&self, entity: &dyn Entity) -> CacheResult<()> {
        let identity = entity.identity_value()?;
        self.manager
            .invalidate_plain(&identity, entity.type_name(), None)
            .await
    }

    /// Listen on `bus` until it closes, handling each notification in its
    /// own task.
    pub fn spawn(self: Arc<Self>, bus: &EventBus) -> JoinHandle<()> {
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        let this = self.clone();
                        tokio::spawn(async move {
                            this.on_entity_changed(event.entity.as_ref()).await;
                        });
                    }
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "invalidation subscriber lagged behind the event bus");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            tracing::debug!("invalidation subscriber stopped");
        })
    }
}

#[async_trait]
impl<P: ConnectionPool, C: Codec> EntityChangeListener for InvalidationSubscriber<P, C> {
    async fn on_entity_changed(&self, entity: &dyn Entity) {
        self.received.fetch_add(1, Ordering::SeqCst);
        match self.invalidate_entity(entity).await {
            Ok(()) => {
                self.invalidated.fetch_add(1, Ordering::SeqCst);
                tracing::debug!(entity = entity.type_name(), "cache entry evicted on change");
            }
            Err(CacheError::MissingIdentityField(entity_type)) => {
                self.skipped.fetch_add(1, Ordering::SeqCst);
                tracing::warn!(entity = %entity_type, "no identity field, notification skipped");
            }
            Err(e) => {
                self.skipped.fetch_add(1, Ordering::SeqCst);
                tracing::warn!(entity = entity.type_name(), error = %e, "cache eviction failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;
    use crate::domain::errors::IdentityError;
    use crate::domain::models::TypeDescriptor;

    #[derive(Debug)]
    struct Member {
        id: u64,
    }

    impl Entity for Member {
        fn type_name(&self) -> &str {
            "Member"
        }

        fn identity_value(&self) -> Result<String, IdentityError> {
            Ok(self.id.to_string())
        }
    }

    #[derive(Debug)]
    struct Sealed;

    impl Entity for Sealed {
        fn type_name(&self) -> &str {
            "Sealed"
        }

        fn identity_value(&self) -> Result<String, IdentityError> {
            Err(IdentityError::Unreadable {
                entity: "Sealed".to_string(),
                reason: "lock poisoned".to_string(),
            })
        }
    }

    fn setup() -> (Arc<MemoryStore>, Arc<CacheManager<MemoryStore>>) {
        let store = Arc::new(MemoryStore::new());
        let manager = Arc::new(CacheManager::new(store.clone(), "app-1").unwrap());
        (store, manager)
    }

    #[tokio::test]
    async fn test_evicts_entry_by_identity() {
        let (store, manager) = setup();
        manager
            .put("42", &TypeDescriptor::named("Member"), None, &"cached", 0)
            .await
            .unwrap();

        let subscriber = InvalidationSubscriber::new(manager);
        subscriber.on_entity_changed(&Member { id: 42 }).await;

        assert!(store.is_empty());
        assert_eq!(subscriber.stats().invalidated, 1);
    }

    #[tokio::test]
    async fn test_unreadable_identity_is_skipped() {
        let (_store, manager) = setup();
        let subscriber = InvalidationSubscriber::new(manager);

        let err = subscriber.invalidate_entity(&Sealed).await.unwrap_err();
        assert!(matches!(err, CacheError::IdentityAccessFailure { .. }));

        subscriber.on_entity_changed(&Sealed).await;
        assert_eq!(subscriber.stats().skipped, 1);
    }

    #[tokio::test]
    async fn test_store_failure_does_not_propagate() {
        let (store, manager) = setup();
        let subscriber = InvalidationSubscriber::new(manager);

        store.set_available(false);
        subscriber.on_entity_changed(&Member { id: 1 }).await;
        assert_eq!(
            subscriber.stats(),
            InvalidationStats {
                received: 1,
                invalidated: 0,
                skipped: 1
            }
        );
    }
}
