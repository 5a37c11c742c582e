//! In-process implementation of the store ports.
//!
//! Behaves like a single-node Redis for the commands the cache uses:
//! lazy TTL expiry, `-1`/`-2` TTL replies, glob `MATCH` and cursor-paged
//! `SCAN` with a configurable page size. Connections are bounded by a
//! semaphore and hand their permit back when dropped.
//!
//! Every key gets a sequence number when it is first written, and a SCAN
//! cursor is the next sequence to visit. Deleting or expiring keys never
//! moves the cursor, so a key that stays live for a whole walk is always
//! returned.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

use super::glob::glob_match;
use crate::domain::errors::StoreError;
use crate::domain::models::StoreConfig;
use crate::domain::ports::{ConnectionPool, StoreConnection};

/// Default number of pooled connections.
const DEFAULT_MAX_CONNECTIONS: usize = 32;

/// Default keys examined per SCAN call.
const DEFAULT_SCAN_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    expires_at: Option<Instant>,
    seq: u64,
}

impl StoredValue {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Entries plus the insertion order SCAN walks.
#[derive(Debug, Default)]
struct Keyspace {
    entries: HashMap<String, StoredValue>,
    order: BTreeMap<u64, String>,
    last_seq: u64,
}

impl Keyspace {
    /// Live entry for `key`, dropping it first if it has expired.
    fn live(&mut self, key: &str, now: Instant) -> Option<&mut StoredValue> {
        if self.entries.get(key)?.is_expired(now) {
            self.remove(key);
            return None;
        }
        self.entries.get_mut(key)
    }

    /// SET semantics: replace the value, clear the TTL, keep the sequence.
    fn insert(&mut self, key: &str, value: &str) {
        if let Some(existing) = self.entries.get_mut(key) {
            existing.value = value.to_string();
            existing.expires_at = None;
            return;
        }
        self.last_seq += 1;
        self.order.insert(self.last_seq, key.to_string());
        self.entries.insert(
            key.to_string(),
            StoredValue {
                value: value.to_string(),
                expires_at: None,
                seq: self.last_seq,
            },
        );
    }

    fn remove(&mut self, key: &str) -> Option<StoredValue> {
        let removed = self.entries.remove(key)?;
        self.order.remove(&removed.seq);
        Some(removed)
    }
}

/// State shared between the pool and its connections.
#[derive(Debug)]
struct Shared {
    keyspace: Mutex<Keyspace>,
    scan_page_size: usize,
    fail_commands: AtomicBool,
    commands: AtomicU64,
}

impl Shared {
    fn keyspace(&self) -> MutexGuard<'_, Keyspace> {
        // A poisoned keyspace is still structurally valid.
        self.keyspace
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn begin(&self, command: &'static str) -> Result<(), StoreError> {
        self.commands.fetch_add(1, Ordering::SeqCst);
        if self.fail_commands.load(Ordering::SeqCst) {
            return Err(StoreError::Command {
                command,
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

/// Builder for [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct MemoryStoreBuilder {
    max_connections: usize,
    scan_page_size: usize,
}

impl Default for MemoryStoreBuilder {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            scan_page_size: DEFAULT_SCAN_PAGE_SIZE,
        }
    }
}

impl MemoryStoreBuilder {
    /// Pool size; at least one.
    #[must_use]
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max.max(1);
        self
    }

    /// Keys visited per SCAN page; at least one.
    #[must_use]
    pub fn scan_page_size(mut self, size: usize) -> Self {
        self.scan_page_size = size.max(1);
        self
    }

    /// Empty store with these settings.
    pub fn build(self) -> MemoryStore {
        MemoryStore {
            shared: Arc::new(Shared {
                keyspace: Mutex::new(Keyspace::default()),
                scan_page_size: self.scan_page_size,
                fail_commands: AtomicBool::new(false),
                commands: AtomicU64::new(0),
            }),
            permits: Arc::new(Semaphore::new(self.max_connections)),
            available: AtomicBool::new(true),
            checkouts: AtomicU64::new(0),
        }
    }
}

/// In-memory key-value store with a bounded connection pool.
#[derive(Debug)]
pub struct MemoryStore {
    shared: Arc<Shared>,
    permits: Arc<Semaphore>,
    available: AtomicBool,
    checkouts: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Empty store with default pool and page sizes.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Builder for a store with custom sizes.
    pub fn builder() -> MemoryStoreBuilder {
        MemoryStoreBuilder::default()
    }

    /// Store sized from the `store` config section.
    pub fn from_config(config: &StoreConfig) -> Self {
        Self::builder()
            .max_connections(usize::try_from(config.max_connections).unwrap_or(usize::MAX))
            .scan_page_size(config.scan_page_size)
            .build()
    }

    /// Simulate the store going away: checkouts fail while unavailable.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Make every command on existing and new connections fail.
    pub fn fail_commands(&self, fail: bool) {
        self.shared.fail_commands.store(fail, Ordering::SeqCst);
    }

    /// Connections successfully checked out so far.
    pub fn checkouts(&self) -> u64 {
        self.checkouts.load(Ordering::SeqCst)
    }

    /// Commands issued so far, failed ones included.
    pub fn commands_issued(&self) -> u64 {
        self.shared.commands.load(Ordering::SeqCst)
    }

    /// Connections currently idle in the pool.
    pub fn available_connections(&self) -> usize {
        self.permits.available_permits()
    }

    /// Stored payload without counting a command.
    pub fn peek(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        self.shared
            .keyspace()
            .entries
            .get(key)
            .filter(|v| !v.is_expired(now))
            .map(|v| v.value.clone())
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.shared
            .keyspace()
            .entries
            .values()
            .filter(|v| !v.is_expired(now))
            .count()
    }

    /// True when no live entry remains.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ConnectionPool for MemoryStore {
    type Connection = MemoryConnection;

    async fn checkout(&self) -> Result<MemoryConnection, StoreError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable);
        }
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| StoreError::Checkout(e.to_string()))?;
        self.checkouts.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryConnection {
            shared: self.shared.clone(),
            _permit: permit,
        })
    }
}

/// Connection checked out of a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryConnection {
    shared: Arc<Shared>,
    _permit: OwnedSemaphorePermit,
}

#[async_trait]
impl StoreConnection for MemoryConnection {
    async fn get(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        self.shared.begin("GET")?;
        let now = Instant::now();
        Ok(self
            .shared
            .keyspace()
            .live(key, now)
            .map(|v| v.value.clone()))
    }

    async fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.shared.begin("SET")?;
        self.shared.keyspace().insert(key, value);
        Ok(())
    }

    async fn del(&mut self, keys: &[String]) -> Result<u64, StoreError> {
        self.shared.begin("DEL")?;
        let now = Instant::now();
        let mut keyspace = self.shared.keyspace();
        let mut removed = 0;
        for key in keys {
            if keyspace.remove(key).is_some_and(|v| !v.is_expired(now)) {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn expire(&mut self, key: &str, seconds: u64) -> Result<bool, StoreError> {
        self.shared.begin("EXPIRE")?;
        let now = Instant::now();
        let mut keyspace = self.shared.keyspace();
        let Some(entry) = keyspace.live(key, now) else {
            return Ok(false);
        };
        if seconds == 0 {
            keyspace.remove(key);
        } else {
            entry.expires_at = Some(now + Duration::from_secs(seconds));
        }
        Ok(true)
    }

    async fn ttl(&mut self, key: &str) -> Result<i64, StoreError> {
        self.shared.begin("TTL")?;
        let now = Instant::now();
        let reply = match self.shared.keyspace().live(key, now) {
            None => -2,
            Some(StoredValue {
                expires_at: None, ..
            }) => -1,
            Some(StoredValue {
                expires_at: Some(at),
                ..
            }) => {
                let millis = at.saturating_duration_since(now).as_millis();
                i64::try_from(millis.div_ceil(1000)).unwrap_or(i64::MAX)
            }
        };
        Ok(reply)
    }

    async fn scan(&mut self, cursor: u64, pattern: &str) -> Result<(u64, Vec<String>), StoreError> {
        self.shared.begin("SCAN")?;
        let now = Instant::now();
        let page_size = self.shared.scan_page_size;
        let keyspace = self.shared.keyspace();

        // Sequences start at 1, so cursor 0 starts from the beginning.
        let mut walk = keyspace.order.range(cursor.max(1)..);
        let matches = walk
            .by_ref()
            .take(page_size)
            .filter(|(_, key)| {
                keyspace
                    .entries
                    .get(key.as_str())
                    .is_some_and(|v| !v.is_expired(now))
                    && glob_match(pattern, key)
            })
            .map(|(_, key)| key.clone())
            .collect();
        let next = walk.next().map_or(0, |(seq, _)| *seq);
        Ok((next, matches))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_del() {
        let store = MemoryStore::new();
        let mut conn = store.checkout().await.unwrap();

        assert_eq!(conn.get("a").await.unwrap(), None);
        conn.set("a", "1").await.unwrap();
        assert_eq!(conn.get("a").await.unwrap().as_deref(), Some("1"));
        assert_eq!(
            conn.del(&["a".to_string(), "b".to_string()]).await.unwrap(),
            1
        );
        assert_eq!(conn.get("a").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_replies_and_expiry() {
        let store = MemoryStore::new();
        let mut conn = store.checkout().await.unwrap();

        assert_eq!(conn.ttl("a").await.unwrap(), -2);
        conn.set("a", "1").await.unwrap();
        assert_eq!(conn.ttl("a").await.unwrap(), -1);
        assert!(conn.expire("a", 60).await.unwrap());
        assert_eq!(conn.ttl("a").await.unwrap(), 60);

        tokio::time::advance(Duration::from_millis(59_500)).await;
        assert_eq!(conn.ttl("a").await.unwrap(), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(conn.get("a").await.unwrap(), None);
        assert_eq!(conn.ttl("a").await.unwrap(), -2);
    }

    #[tokio::test]
    async fn test_set_clears_existing_ttl() {
        let store = MemoryStore::new();
        let mut conn = store.checkout().await.unwrap();

        conn.set("a", "1").await.unwrap();
        conn.expire("a", 30).await.unwrap();
        conn.set("a", "2").await.unwrap();
        assert_eq!(conn.ttl("a").await.unwrap(), -1);
    }

    #[tokio::test]
    async fn test_expire_missing_key() {
        let store = MemoryStore::new();
        let mut conn = store.checkout().await.unwrap();
        assert!(!conn.expire("nope", 10).await.unwrap());
    }

    #[tokio::test]
    async fn test_scan_pages_by_cursor() {
        let store = MemoryStore::builder().scan_page_size(2).build();
        let mut conn = store.checkout().await.unwrap();
        for k in ["k1", "k2", "k3", "x1", "k4"] {
            conn.set(k, "v").await.unwrap();
        }

        let (c1, p1) = conn.scan(0, "k*").await.unwrap();
        assert_eq!((c1, p1), (3, vec!["k1".to_string(), "k2".to_string()]));
        let (c2, p2) = conn.scan(c1, "k*").await.unwrap();
        assert_eq!((c2, p2), (5, vec!["k3".to_string()]));
        let (c3, p3) = conn.scan(c2, "k*").await.unwrap();
        assert_eq!((c3, p3), (0, vec!["k4".to_string()]));
    }

    async fn walk(conn: &mut MemoryConnection, mut cursor: u64, seen: &mut Vec<String>) {
        loop {
            let (next, page) = conn.scan(cursor, "*").await.unwrap();
            seen.extend(page);
            if next == 0 {
                break;
            }
            cursor = next;
        }
    }

    #[tokio::test]
    async fn test_scan_survives_deleting_a_visited_key() {
        let store = MemoryStore::builder().scan_page_size(1).build();
        let mut conn = store.checkout().await.unwrap();
        let mut other = store.checkout().await.unwrap();
        for k in ["k1", "k2", "k3"] {
            conn.set(k, "v").await.unwrap();
        }

        let (cursor, mut seen) = conn.scan(0, "*").await.unwrap();
        assert_eq!(seen, vec!["k1".to_string()]);
        other.del(&["k1".to_string()]).await.unwrap();
        walk(&mut conn, cursor, &mut seen).await;

        assert_eq!(seen, vec!["k1", "k2", "k3"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_survives_expiry_of_a_visited_key() {
        let store = MemoryStore::builder().scan_page_size(1).build();
        let mut conn = store.checkout().await.unwrap();
        for k in ["k1", "k2", "k3"] {
            conn.set(k, "v").await.unwrap();
        }
        conn.expire("k1", 1).await.unwrap();

        let (cursor, mut seen) = conn.scan(0, "*").await.unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;
        // Reading the expired key evicts it before the walk resumes.
        assert_eq!(conn.get("k1").await.unwrap(), None);
        walk(&mut conn, cursor, &mut seen).await;

        assert_eq!(seen, vec!["k1", "k2", "k3"]);
    }

    #[tokio::test]
    async fn test_rewrite_keeps_scan_position() {
        let store = MemoryStore::builder().scan_page_size(1).build();
        let mut conn = store.checkout().await.unwrap();
        for k in ["k1", "k2"] {
            conn.set(k, "v").await.unwrap();
        }

        let (cursor, mut seen) = conn.scan(0, "*").await.unwrap();
        conn.set("k1", "new").await.unwrap();
        walk(&mut conn, cursor, &mut seen).await;

        assert_eq!(seen, vec!["k1", "k2"]);
        assert_eq!(store.peek("k1").as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_pool_is_bounded() {
        let store = MemoryStore::builder().max_connections(2).build();
        let a = store.checkout().await.unwrap();
        let _b = store.checkout().await.unwrap();
        assert_eq!(store.available_connections(), 0);
        drop(a);
        assert_eq!(store.available_connections(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_store_rejects_checkout() {
        let store = MemoryStore::new();
        store.set_available(false);
        assert!(matches!(
            store.checkout().await,
            Err(StoreError::Unavailable)
        ));
        assert_eq!(store.checkouts(), 0);
    }
}
