//! Domain entities whose changes drive cache invalidation.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::IdentityError;

/// A persisted domain entity that can be evicted from the cache.
///
/// The identity is exposed through an explicit accessor rather than
/// discovered at runtime. Types without a primary key keep the default
/// implementation, which reports [`IdentityError::Missing`].
pub trait Entity: fmt::Debug + Send + Sync {
    /// Simple type name, the same name its cache keys are namespaced with.
    fn type_name(&self) -> &str;

    /// String form of the entity's primary key.
    fn identity_value(&self) -> Result<String, IdentityError> {
        Err(IdentityError::Missing(self.type_name().to_string()))
    }
}

/// Unique identifier for a change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    /// Fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonically increasing sequence number assigned by the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SequenceNumber(pub u64);

impl SequenceNumber {
    /// Sequence before any event is published.
    pub const fn zero() -> Self {
        Self(0)
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Notification that an entity was persisted.
#[derive(Debug, Clone)]
pub struct EntityChanged {
    /// Unique id of this notification.
    pub id: EventId,
    /// Position assigned by the bus on publish.
    pub sequence: SequenceNumber,
    /// When the notification was created.
    pub timestamp: DateTime<Utc>,
    /// The persisted entity.
    pub entity: Arc<dyn Entity>,
}

impl EntityChanged {
    /// Unsequenced notification stamped with the current time.
    pub fn new(entity: Arc<dyn Entity>) -> Self {
        Self {
            id: EventId::new(),
            sequence: SequenceNumber::zero(),
            timestamp: Utc::now(),
            entity,
        }
    }
}
