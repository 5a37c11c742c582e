//! Value types shared by the cache services and adapters.

pub mod config;
pub mod entity;
pub mod ttl;
pub mod type_descriptor;

pub use config::{
    CacheConfig, Config, EventBusConfig, LogFormat, LoggingConfig, RotationPolicy, StoreConfig,
    TtlSchedulerConfig,
};
pub use entity::{Entity, EntityChanged, EventId, SequenceNumber};
pub use ttl::TtlStatus;
pub use type_descriptor::{TypeDescribe, TypeDescriptor};
