//! Domain errors for the kvstash cache layer.

use thiserror::Error;

/// Boxed error produced by a caller-supplied loader.
pub type LoaderError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Transport-level failure reported by a store adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No connection could be taken from the pool.
    #[error("Connection checkout failed: {0}")]
    Checkout(String),

    /// A command was sent but the store rejected it or the link broke.
    #[error("Command {command} failed: {reason}")]
    Command {
        /// Command name, such as `SCAN`.
        command: &'static str,
        /// Error text from the adapter.
        reason: String,
    },

    /// The store refuses all traffic.
    #[error("Store is unavailable")]
    Unavailable,
}

/// Failure reading the identity of a changed entity.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The entity type has no identity field.
    #[error("Entity {0} declares no identity field")]
    Missing(String),

    /// The identity field exists but reading it failed.
    #[error("Identity of {entity} could not be read: {reason}")]
    Unreadable {
        /// Entity type name.
        entity: String,
        /// Why the read failed.
        reason: String,
    },
}

/// Errors that can occur in cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The store could not be reached or rejected a command.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// A value could not be encoded, or a stored payload decoded.
    #[error("Serialization failure for {key}: {reason}")]
    SerializationFailure {
        /// Namespaced key of the entry.
        key: String,
        /// Codec error text.
        reason: String,
    },

    /// A changed entity has no identity to evict by.
    #[error("Missing identity field on {0}")]
    MissingIdentityField(String),

    /// A changed entity's identity could not be read.
    #[error("Identity field of {entity} is not accessible: {reason}")]
    IdentityAccessFailure {
        /// Entity type name.
        entity: String,
        /// Why the read failed.
        reason: String,
    },

    /// The key prefix is empty or holds `:` or a glob character.
    #[error("Invalid key prefix {prefix:?}: {reason}")]
    InvalidPrefix {
        /// Rejected prefix.
        prefix: String,
        /// Which rule it broke.
        reason: &'static str,
    },

    /// The caller's loader returned an error.
    #[error("Loader failed for {key}: {source}")]
    LoaderFailure {
        /// Namespaced key being loaded.
        key: String,
        /// Error returned by the loader.
        #[source]
        source: LoaderError,
    },
}

impl CacheError {
    /// Build a serialization error for the given namespaced key.
    pub fn serialization(key: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::SerializationFailure {
            key: key.into(),
            reason: err.to_string(),
        }
    }

    /// True for failures an error-tolerant cache may degrade on.
    ///
    /// Loader failures are the caller's own errors and are never swallowed.
    pub const fn is_tolerable(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable(_) | Self::SerializationFailure { .. }
        )
    }
}

impl From<IdentityError> for CacheError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Missing(entity) => Self::MissingIdentityField(entity),
            IdentityError::Unreadable { entity, reason } => {
                Self::IdentityAccessFailure { entity, reason }
            }
        }
    }
}

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_errors_map_to_cache_errors() {
        let missing: CacheError = IdentityError::Missing("Member".to_string()).into();
        assert!(matches!(missing, CacheError::MissingIdentityField(ref e) if e == "Member"));

        let unreadable: CacheError = IdentityError::Unreadable {
            entity: "Member".to_string(),
            reason: "poisoned".to_string(),
        }
        .into();
        assert!(matches!(
            unreadable,
            CacheError::IdentityAccessFailure { ref reason, .. } if reason == "poisoned"
        ));
    }

    #[test]
    fn test_tolerable_errors() {
        assert!(CacheError::from(StoreError::Unavailable).is_tolerable());
        assert!(CacheError::serialization("k", "bad json").is_tolerable());

        let loader = CacheError::LoaderFailure {
            key: "k".to_string(),
            source: "boom".into(),
        };
        assert!(!loader.is_tolerable());
        assert!(loader.to_string().contains("boom"));
    }
}
