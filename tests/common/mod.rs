//! Common test utilities for integration tests
//!
//! Provides shared fixtures and helpers used across multiple integration
//! test files.

use std::sync::Arc;

use kvstash::adapters::memory::MemoryStore;
use kvstash::CacheManager;

/// Prefix used by every manager built here.
#[allow(dead_code)]
pub const TEST_PREFIX: &str = "test-1";

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
#[allow(dead_code)]
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// In-memory store plus a manager on top of it.
#[allow(dead_code)]
pub fn memory_cache() -> (Arc<MemoryStore>, Arc<CacheManager<MemoryStore>>) {
    memory_cache_with(MemoryStore::new())
}

/// Manager over an already configured in-memory store.
#[allow(dead_code)]
pub fn memory_cache_with(store: MemoryStore) -> (Arc<MemoryStore>, Arc<CacheManager<MemoryStore>>) {
    let store = Arc::new(store);
    let manager = Arc::new(CacheManager::new(store.clone(), TEST_PREFIX).unwrap());
    (store, manager)
}

/// Wait for a condition to be true with timeout
///
/// Polls the predicate every 10ms until it returns true or timeout is reached.
#[allow(dead_code)]
pub async fn wait_for<F>(mut predicate: F, timeout_ms: u64) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_millis(timeout_ms);

    while start.elapsed() < timeout {
        if predicate() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    predicate()
}
