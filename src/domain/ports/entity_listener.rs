//! Inbound entity change notification port.

use async_trait::async_trait;

use crate::domain::models::Entity;

/// Inbound contract for "entity persisted" notifications.
///
/// May be invoked concurrently for different entities, with no ordering
/// guarantee between them. Implementations must not fail the caller.
#[async_trait]
pub trait EntityChangeListener: Send + Sync {
    /// Handle one persisted entity.
    async fn on_entity_changed(&self, entity: &dyn Entity);
}
