//! Service layer: cache operations and change-driven invalidation.

pub mod cache_manager;
pub mod event_bus;
pub mod invalidation_subscriber;
pub mod key_builder;
pub mod store_facade;
pub mod ttl_scheduler;
pub mod typed_retriever;

pub use cache_manager::{CacheManager, MATCH_ALL};
pub use event_bus::EventBus;
pub use invalidation_subscriber::{InvalidationStats, InvalidationSubscriber};
pub use key_builder::KeyBuilder;
pub use store_facade::StoreFacade;
pub use ttl_scheduler::{ShutdownPolicy, TtlScheduler, TtlSchedulerStats};
pub use typed_retriever::{BoundCache, TypedRetriever};
