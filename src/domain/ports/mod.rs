//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the interfaces that adapters must implement:
//! - ConnectionPool / StoreConnection: the remote key-value store
//! - Codec: value serialization
//! - EntityChangeListener: inbound entity change notifications
//!
//! These traits keep the cache services independent of a specific store
//! client or serialization format.

pub mod codec;
pub mod entity_listener;
pub mod store;

pub use codec::Codec;
pub use entity_listener::EntityChangeListener;
pub use store::{ConnectionPool, StoreConnection};
