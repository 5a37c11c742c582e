//! In-memory store adapter.
//!
//! Implements the store ports without a network hop. Used by the test
//! suites and for embedding the cache in a single process.

mod glob;
pub mod store;

pub use glob::glob_match;
pub use store::{MemoryConnection, MemoryStore, MemoryStoreBuilder};
