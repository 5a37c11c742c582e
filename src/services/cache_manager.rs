//! Cache-aside manager over the remote store.
//!
//! All operations take the raw lookup key together with the value's
//! [`TypeDescriptor`] and an optional bucket, and work on the namespaced
//! key derived from them. The manager keeps no mutable state of its own
//! beyond the connection pool and the TTL worker pool; concurrent callers
//! race on the store with last-write-wins semantics.
//!
//! [`get_or_compute`](CacheManager::get_or_compute) has no single-flight
//! protection: N callers missing the same key at once run the loader N
//! times and the last write wins.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::key_builder::KeyBuilder;
use super::store_facade::StoreFacade;
use super::ttl_scheduler::{ShutdownPolicy, TtlScheduler, TtlSchedulerStats};
use crate::adapters::codec::JsonCodec;
use crate::domain::errors::{CacheError, CacheResult, LoaderError};
use crate::domain::models::{CacheConfig, Config, TtlSchedulerConfig, TtlStatus, TypeDescriptor};
use crate::domain::ports::{Codec, ConnectionPool};

/// Pattern used by [`CacheManager::scan_all`] when none is given.
pub const MATCH_ALL: &str = "*";

/// Cache-aside entry point owning the store facade and the TTL scheduler.
pub struct CacheManager<P: ConnectionPool, C: Codec = JsonCodec> {
    keys: KeyBuilder,
    store: Arc<StoreFacade<P>>,
    scheduler: TtlScheduler,
    codec: C,
    default_expiry: u64,
}

impl<P: ConnectionPool> CacheManager<P, JsonCodec> {
    /// Manager with the JSON codec and default settings under `prefix`.
    ///
    /// Spawns the TTL workers, so it must be called inside a tokio runtime.
    /// Fails with [`CacheError::InvalidPrefix`] for an unusable prefix.
    pub fn new(pool: Arc<P>, prefix: impl Into<String>) -> CacheResult<Self> {
        let cache = CacheConfig::default();
        Self::with_codec(
            pool,
            JsonCodec,
            prefix,
            cache.default_expiry_secs,
            &TtlSchedulerConfig::default(),
        )
    }

    /// Manager with the JSON codec configured from `config`.
    pub fn from_config(pool: Arc<P>, config: &Config) -> CacheResult<Self> {
        Self::with_codec(
            pool,
            JsonCodec,
            config.cache.key_prefix(),
            config.cache.default_expiry_secs,
            &config.ttl_scheduler,
        )
    }
}

impl<P: ConnectionPool, C: Codec> CacheManager<P, C> {
    /// Manager with an explicit codec, prefix, default expiry and TTL
    /// worker settings. The prefix is checked before any worker starts.
    pub fn with_codec(
        pool: Arc<P>,
        codec: C,
        prefix: impl Into<String>,
        default_expiry: u64,
        scheduler: &TtlSchedulerConfig,
    ) -> CacheResult<Self> {
        let keys = KeyBuilder::new(prefix)?;
        let store = Arc::new(StoreFacade::new(pool));
        let scheduler = TtlScheduler::start(store.clone(), scheduler);
        tracing::info!(prefix = keys.prefix(), default_expiry, "cache manager ready");
        Ok(Self {
            keys,
            store,
            scheduler,
            codec,
            default_expiry,
        })
    }

    /// Key builder bound to this manager's prefix.
    pub fn key_builder(&self) -> &KeyBuilder {
        &self.keys
    }

    /// Expiry in seconds applied by bound caches built without one.
    pub fn default_expiry(&self) -> u64 {
        self.default_expiry
    }

    /// Namespaced key `raw` would be stored under.
    pub fn namespaced_key(
        &self,
        key: &(impl Display + ?Sized),
        ty: &TypeDescriptor,
        bucket: Option<&str>,
    ) -> String {
        self.keys.build_key(key, ty, bucket)
    }

    /// Read one entry. A missing entry is `Ok(None)`; nothing is written.
    pub async fn get<T: DeserializeOwned>(
        &self,
        key: &(impl Display + ?Sized),
        ty: &TypeDescriptor,
        bucket: Option<&str>,
    ) -> CacheResult<Option<T>> {
        let namespaced = self.keys.build_key(key, ty, bucket);
        self.get_raw(&namespaced).await
    }

    /// Read one entry by its already namespaced key.
    pub async fn get_raw<T: DeserializeOwned>(&self, namespaced: &str) -> CacheResult<Option<T>> {
        match self.store.get(namespaced).await? {
            Some(payload) => {
                tracing::debug!(key = namespaced, "cache hit");
                self.decode(namespaced, &payload).map(Some)
            }
            None => {
                tracing::debug!(key = namespaced, "cache miss");
                Ok(None)
            }
        }
    }

    /// Return the cached value, or run `loader` once on a miss and cache
    /// whatever it returns, "not found" values included.
    ///
    /// The loader receives the raw key. Its failure is returned as
    /// [`CacheError::LoaderFailure`] and nothing is written. A positive
    /// `expiry_secs` is applied asynchronously after the write.
    pub async fn get_or_compute<T, F, Fut, E>(
        &self,
        key: &(impl Display + ?Sized),
        ty: &TypeDescriptor,
        bucket: Option<&str>,
        loader: F,
        expiry_secs: u64,
    ) -> CacheResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<LoaderError>,
    {
        let namespaced = self.keys.build_key(key, ty, bucket);
        if let Some(payload) = self.store.get(&namespaced).await? {
            tracing::debug!(key = %namespaced, "cache hit");
            return self.decode(&namespaced, &payload);
        }

        tracing::debug!(key = %namespaced, "cache miss, loading");
        let value = loader(key.to_string())
            .await
            .map_err(|e| CacheError::LoaderFailure {
                key: namespaced.clone(),
                source: e.into(),
            })?;
        self.write(&namespaced, &value, expiry_secs).await?;
        Ok(value)
    }

    /// Unconditionally write one entry.
    pub async fn put<T: Serialize + ?Sized>(
        &self,
        key: &(impl Display + ?Sized),
        ty: &TypeDescriptor,
        bucket: Option<&str>,
        value: &T,
        expiry_secs: u64,
    ) -> CacheResult<()> {
        let namespaced = self.keys.build_key(key, ty, bucket);
        self.write(&namespaced, value, expiry_secs).await
    }

    /// Write every entry, one put each, returning how many were written.
    ///
    /// Not transactional: a failure stops the walk and is returned, entries
    /// written before it stay written.
    pub async fn put_all<K, V, I>(
        &self,
        ty: &TypeDescriptor,
        bucket: Option<&str>,
        entries: I,
        expiry_secs: u64,
    ) -> CacheResult<usize>
    where
        K: Display,
        V: Serialize,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut written = 0;
        for (key, value) in entries {
            let namespaced = self.keys.build_key(&key, ty, bucket);
            self.write(&namespaced, &value, expiry_secs).await?;
            written += 1;
        }
        Ok(written)
    }

    /// Delete one entry. Deleting a missing entry is not an error.
    pub async fn invalidate(
        &self,
        key: &(impl Display + ?Sized),
        ty: &TypeDescriptor,
        bucket: Option<&str>,
    ) -> CacheResult<()> {
        let namespaced = self.keys.build_key(key, ty, bucket);
        self.invalidate_all_raw([namespaced]).await.map(|_| ())
    }

    /// Delete one entry addressed by a bare type name.
    pub async fn invalidate_plain(
        &self,
        key: &(impl Display + ?Sized),
        type_name: &str,
        bucket: Option<&str>,
    ) -> CacheResult<()> {
        let namespaced = self.keys.build_plain_key(key, type_name, bucket);
        self.invalidate_all_raw([namespaced]).await.map(|_| ())
    }

    /// Delete many entries of one type/bucket with a single batched DEL.
    ///
    /// An empty input issues no store command.
    pub async fn invalidate_all<K, I>(
        &self,
        keys: I,
        ty: &TypeDescriptor,
        bucket: Option<&str>,
    ) -> CacheResult<u64>
    where
        K: Display,
        I: IntoIterator<Item = K>,
    {
        let namespaced: Vec<String> = keys
            .into_iter()
            .map(|k| self.keys.build_key(&k, ty, bucket))
            .collect();
        self.invalidate_all_raw(namespaced).await
    }

    /// Delete entries by their already namespaced keys.
    pub async fn invalidate_all_raw<S, I>(&self, keys: I) -> CacheResult<u64>
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        if keys.is_empty() {
            return Ok(0);
        }
        let removed = self.store.del(&keys).await?;
        tracing::debug!(requested = keys.len(), removed, "cache entries invalidated");
        Ok(removed)
    }

    /// Remaining lifetime of one entry.
    pub async fn ttl(
        &self,
        key: &(impl Display + ?Sized),
        ty: &TypeDescriptor,
        bucket: Option<&str>,
    ) -> CacheResult<TtlStatus> {
        let namespaced = self.keys.build_key(key, ty, bucket);
        let reply = self.store.ttl(&namespaced).await?;
        Ok(TtlStatus::from_store_reply(reply))
    }

    /// Namespaced keys of one type/bucket whose raw part matches `pattern`
    /// (all of them when `None`).
    ///
    /// Walks the whole SCAN cursor before returning.
    pub async fn scan_all(
        &self,
        pattern: Option<&str>,
        ty: &TypeDescriptor,
        bucket: Option<&str>,
    ) -> CacheResult<Vec<String>> {
        let matcher = self
            .keys
            .scan_pattern(pattern.unwrap_or(MATCH_ALL), ty, bucket);
        let keys = self.store.scan_all(&matcher).await?;
        tracing::debug!(pattern = %matcher, found = keys.len(), "scan complete");
        Ok(keys)
    }

    /// Snapshot of the TTL worker counters.
    pub fn scheduler_stats(&self) -> TtlSchedulerStats {
        self.scheduler.stats()
    }

    /// Stop the TTL workers. Expirations not yet applied may be lost.
    pub async fn shutdown(&self, policy: ShutdownPolicy) {
        self.scheduler.shutdown(policy).await;
    }

    async fn write<T: Serialize + ?Sized>(
        &self,
        namespaced: &str,
        value: &T,
        expiry_secs: u64,
    ) -> CacheResult<()> {
        let payload = self
            .codec
            .encode(value)
            .map_err(|e| CacheError::serialization(namespaced, e))?;
        self.store.set(namespaced, &payload).await?;
        if expiry_secs > 0 {
            self.scheduler.schedule(namespaced, expiry_secs);
        }
        tracing::debug!(key = namespaced, expiry_secs, "cache entry written");
        Ok(())
    }

    fn decode<T: DeserializeOwned>(&self, namespaced: &str, payload: &str) -> CacheResult<T> {
        self.codec
            .decode(payload)
            .map_err(|e| CacheError::serialization(namespaced, e))
    }
}
