//! kvstash - type-namespaced cache-aside layer over a remote key-value store
//!
//! Values are cached as JSON under keys derived from a process-wide prefix,
//! the value type's full generic shape, an optional bucket and the caller's
//! raw key, so equal raw keys of different types never collide. Expiry is
//! applied asynchronously by a bounded worker pool, and persisted entities
//! can evict their own entries through an event bus.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, port traits and the error taxonomy
//! - **Service Layer** (`services`): cache manager, key derivation, TTL
//!   scheduling, typed caches and change-driven invalidation
//! - **Adapters** (`adapters`): JSON codec, in-memory store and the optional
//!   Redis pool (`redis` feature)
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use kvstash::adapters::memory::MemoryStore;
//! use kvstash::{CacheManager, TypedRetriever};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> anyhow::Result<()> {
//! let manager = Arc::new(CacheManager::new(Arc::new(MemoryStore::new()), "shop-1")?);
//! let prices = TypedRetriever::<Vec<u32>>::new()
//!     .with_bucket("prices")
//!     .bind(&manager, 60);
//!
//! let value = prices
//!     .get_or_compute("sku-9", |_| async { Ok::<_, anyhow::Error>(vec![199, 249]) })
//!     .await?;
//! assert_eq!(value, vec![199, 249]);
//! assert_eq!(prices.key("sku-9"), "shop-1::Vec<u32>:prices:sku-9");
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use adapters::codec::JsonCodec;
pub use adapters::memory::MemoryStore;
pub use domain::errors::{CacheError, CacheResult, IdentityError, LoaderError, StoreError};
pub use domain::models::{
    CacheConfig, Config, Entity, EntityChanged, LoggingConfig, StoreConfig, TtlSchedulerConfig,
    TtlStatus, TypeDescribe, TypeDescriptor,
};
pub use domain::ports::{Codec, ConnectionPool, EntityChangeListener, StoreConnection};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::logging::LoggerImpl;
pub use services::{
    BoundCache, CacheManager, EventBus, InvalidationSubscriber, KeyBuilder, ShutdownPolicy,
    TtlSchedulerStats, TypedRetriever,
};
