//! Domain layer for the kvstash cache
//!
//! This module contains the cache models, port traits and error taxonomy.

pub mod errors;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use errors::{CacheError, CacheResult, IdentityError, LoaderError, StoreError};
