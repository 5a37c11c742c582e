//! Thin access layer over the connection pool.
//!
//! Every call checks out one connection, issues one command and drops the
//! connection back into the pool before returning. Failures are not retried.

use std::sync::Arc;

use crate::domain::errors::StoreError;
use crate::domain::ports::{ConnectionPool, StoreConnection};

/// Scoped single-command access to the remote store.
pub struct StoreFacade<P: ConnectionPool> {
    pool: Arc<P>,
}

impl<P: ConnectionPool> StoreFacade<P> {
    /// Facade issuing commands through `pool`.
    pub fn new(pool: Arc<P>) -> Self {
        Self { pool }
    }

    /// Underlying connection pool.
    pub fn pool(&self) -> &Arc<P> {
        &self.pool
    }

    /// GET one key.
    pub async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.pool.checkout().await?;
        conn.get(key).await
    }

    /// SET one key, clearing any TTL it had.
    pub async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.pool.checkout().await?;
        conn.set(key, value).await
    }

    /// Batched DEL. An empty batch issues no command at all.
    pub async fn del(&self, keys: &[String]) -> Result<u64, StoreError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.pool.checkout().await?;
        conn.del(keys).await
    }

    /// EXPIRE one key; `false` when it does not exist.
    pub async fn expire(&self, key: &str, seconds: u64) -> Result<bool, StoreError> {
        let mut conn = self.pool.checkout().await?;
        conn.expire(key, seconds).await
    }

    /// Raw TTL reply: seconds, `-1` or `-2`.
    pub async fn ttl(&self, key: &str) -> Result<i64, StoreError> {
        let mut conn = self.pool.checkout().await?;
        conn.ttl(key).await
    }

    /// Walk the keyspace with SCAN until the store returns cursor `0`.
    ///
    /// One connection is held for the whole walk; each page is a separate
    /// command so the store never serves one huge reply.
    pub async fn scan_all(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.pool.checkout().await?;
        let mut keys = Vec::new();
        let mut cursor = 0;
        loop {
            let (next, page) = conn.scan(cursor, pattern).await?;
            keys.extend(page);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;

    #[tokio::test]
    async fn test_connection_released_after_each_call() {
        let store = Arc::new(MemoryStore::builder().max_connections(1).build());
        let facade = StoreFacade::new(store.clone());

        facade.set("a", "1").await.unwrap();
        assert_eq!(facade.get("a").await.unwrap().as_deref(), Some("1"));
        assert_eq!(store.available_connections(), 1);
    }

    #[tokio::test]
    async fn test_connection_released_on_failure() {
        let store = Arc::new(MemoryStore::builder().max_connections(1).build());
        let facade = StoreFacade::new(store.clone());

        store.set_available(false);
        // checkout itself fails while the store is down
        assert!(facade.get("a").await.is_err());
        store.set_available(true);
        facade.set("a", "1").await.unwrap();

        store.fail_commands(true);
        assert!(facade.get("a").await.is_err());
        assert_eq!(store.available_connections(), 1);
    }

    #[tokio::test]
    async fn test_empty_delete_issues_no_command() {
        let store = Arc::new(MemoryStore::new());
        let facade = StoreFacade::new(store.clone());

        assert_eq!(facade.del(&[]).await.unwrap(), 0);
        assert_eq!(store.checkouts(), 0);
        assert_eq!(store.commands_issued(), 0);
    }

    #[tokio::test]
    async fn test_scan_all_pages_to_completion() {
        let store = Arc::new(MemoryStore::builder().scan_page_size(1).build());
        let facade = StoreFacade::new(store.clone());
        for k in ["a:1", "a:2", "b:1", "a:3"] {
            facade.set(k, "v").await.unwrap();
        }

        let mut keys = facade.scan_all("a:*").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a:1", "a:2", "a:3"]);
        assert_eq!(store.checkouts(), 5);
    }
}
