//! Adapters for external systems.

pub mod codec;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;
