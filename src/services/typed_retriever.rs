//! Typed retriever and bound cache.
//!
//! A [`TypedRetriever`] captures a value type's full generic shape, its
//! bucket and whether failures should be tolerated. Binding it to a
//! [`CacheManager`] with an expiry yields a [`BoundCache`], which forwards
//! every call to the manager with those parameters filled in.

use std::fmt::{self, Display};
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::cache_manager::CacheManager;
use crate::adapters::codec::JsonCodec;
use crate::domain::errors::{CacheError, CacheResult, LoaderError};
use crate::domain::models::{TtlStatus, TypeDescribe, TypeDescriptor};
use crate::domain::ports::{Codec, ConnectionPool};

/// Definition-time description of a typed cache.
pub struct TypedRetriever<T> {
    descriptor: TypeDescriptor,
    bucket: Option<String>,
    tolerate_errors: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T: TypeDescribe> TypedRetriever<T> {
    /// Retriever keyed by `T`'s own descriptor.
    pub fn new() -> Self {
        Self::with_descriptor(T::descriptor())
    }
}

impl<T: TypeDescribe> Default for TypedRetriever<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TypedRetriever<T> {
    /// Retriever for a type described explicitly instead of through
    /// [`TypeDescribe`].
    pub fn with_descriptor(descriptor: TypeDescriptor) -> Self {
        Self {
            descriptor,
            bucket: None,
            tolerate_errors: false,
            _marker: PhantomData,
        }
    }

    /// Scope entries to a named bucket.
    #[must_use]
    pub fn with_bucket(mut self, name: impl Into<String>) -> Self {
        self.bucket = Some(name.into());
        self
    }

    /// When enabled, store and serialization failures degrade to a miss or
    /// a no-op instead of being returned.
    #[must_use]
    pub fn with_error_tolerance(mut self, tolerate: bool) -> Self {
        self.tolerate_errors = tolerate;
        self
    }

    /// Descriptor entries are keyed by.
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// Bucket entries are scoped to, if any.
    pub fn bucket(&self) -> Option<&str> {
        self.bucket.as_deref()
    }

    /// Bound cache applying `expiry_secs` to every write (0 = no expiry).
    pub fn bind<P, C>(&self, manager: &Arc<CacheManager<P, C>>, expiry_secs: u64) -> BoundCache<T, P, C>
    where
        P: ConnectionPool,
        C: Codec,
    {
        BoundCache {
            manager: manager.clone(),
            descriptor: self.descriptor.clone(),
            bucket: self.bucket.clone(),
            expiry_secs,
            tolerate_errors: self.tolerate_errors,
            _marker: PhantomData,
        }
    }

    /// Bound cache using the manager's default expiry.
    pub fn bind_default<P, C>(&self, manager: &Arc<CacheManager<P, C>>) -> BoundCache<T, P, C>
    where
        P: ConnectionPool,
        C: Codec,
    {
        self.bind(manager, manager.default_expiry())
    }
}

impl<T> Clone for TypedRetriever<T> {
    fn clone(&self) -> Self {
        Self {
            descriptor: self.descriptor.clone(),
            bucket: self.bucket.clone(),
            tolerate_errors: self.tolerate_errors,
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for TypedRetriever<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedRetriever")
            .field("descriptor", &self.descriptor.to_string())
            .field("bucket", &self.bucket)
            .field("tolerate_errors", &self.tolerate_errors)
            .finish()
    }
}

/// Cache of one value type with bucket, expiry and error policy fixed.
pub struct BoundCache<T, P: ConnectionPool, C: Codec = JsonCodec> {
    manager: Arc<CacheManager<P, C>>,
    descriptor: TypeDescriptor,
    bucket: Option<String>,
    expiry_secs: u64,
    tolerate_errors: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T, P: ConnectionPool, C: Codec> Clone for BoundCache<T, P, C> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
            descriptor: self.descriptor.clone(),
            bucket: self.bucket.clone(),
            expiry_secs: self.expiry_secs,
            tolerate_errors: self.tolerate_errors,
            _marker: PhantomData,
        }
    }
}

impl<T, P, C> BoundCache<T, P, C>
where
    T: Serialize + DeserializeOwned,
    P: ConnectionPool,
    C: Codec,
{
    /// Descriptor entries are keyed by.
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// Bucket entries are scoped to, if any.
    pub fn bucket(&self) -> Option<&str> {
        self.bucket.as_deref()
    }

    /// Expiry applied to writes, 0 for none.
    pub fn expiry_secs(&self) -> u64 {
        self.expiry_secs
    }

    /// True when tolerable failures are swallowed.
    pub fn tolerates_errors(&self) -> bool {
        self.tolerate_errors
    }

    /// Namespaced key for `key` in this cache.
    pub fn key(&self, key: &(impl Display + ?Sized)) -> String {
        self.manager
            .namespaced_key(key, &self.descriptor, self.bucket())
    }

    /// Cached value, or `None` on a miss.
    pub async fn get(&self, key: &(impl Display + ?Sized)) -> CacheResult<Option<T>> {
        let result = self.manager.get(key, &self.descriptor, self.bucket()).await;
        self.tolerate("get", result, || None)
    }

    /// Cached value, or the loader's result written back on a miss.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        key: &(impl Display + ?Sized),
        loader: F,
    ) -> CacheResult<T>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<LoaderError>,
    {
        if !self.tolerate_errors {
            return self
                .manager
                .get_or_compute(key, &self.descriptor, self.bucket(), loader, self.expiry_secs)
                .await;
        }

        if let Some(hit) = self.get(key).await? {
            return Ok(hit);
        }
        let value = loader(key.to_string())
            .await
            .map_err(|e| CacheError::LoaderFailure {
                key: self.key(key),
                source: e.into(),
            })?;
        self.put(key, &value).await?;
        Ok(value)
    }

    /// Write one entry.
    pub async fn put(&self, key: &(impl Display + ?Sized), value: &T) -> CacheResult<()> {
        let result = self
            .manager
            .put(key, &self.descriptor, self.bucket(), value, self.expiry_secs)
            .await;
        self.tolerate("put", result, || ())
    }

    /// Write every entry, returning how many were written.
    pub async fn put_all<K, I>(&self, entries: I) -> CacheResult<usize>
    where
        K: Display,
        I: IntoIterator<Item = (K, T)>,
    {
        let result = self
            .manager
            .put_all(&self.descriptor, self.bucket(), entries, self.expiry_secs)
            .await;
        self.tolerate("put_all", result, || 0)
    }

    /// Remove one entry.
    pub async fn invalidate(&self, key: &(impl Display + ?Sized)) -> CacheResult<()> {
        let result = self
            .manager
            .invalidate(key, &self.descriptor, self.bucket())
            .await;
        self.tolerate("invalidate", result, || ())
    }

    /// Remove the named entries, returning how many existed.
    pub async fn invalidate_all<K, I>(&self, keys: I) -> CacheResult<u64>
    where
        K: Display,
        I: IntoIterator<Item = K>,
    {
        let result = self
            .manager
            .invalidate_all(keys, &self.descriptor, self.bucket())
            .await;
        self.tolerate("invalidate_all", result, || 0)
    }

    /// Remaining lifetime of one entry.
    pub async fn ttl(&self, key: &(impl Display + ?Sized)) -> CacheResult<TtlStatus> {
        let result = self.manager.ttl(key, &self.descriptor, self.bucket()).await;
        self.tolerate("ttl", result, || TtlStatus::Absent)
    }

    /// Namespaced keys of this cache matching `pattern` (all when `None`).
    pub async fn scan_all(&self, pattern: Option<&str>) -> CacheResult<Vec<String>> {
        let result = self
            .manager
            .scan_all(pattern, &self.descriptor, self.bucket())
            .await;
        self.tolerate("scan_all", result, Vec::new)
    }

    fn tolerate<R>(
        &self,
        operation: &'static str,
        result: CacheResult<R>,
        fallback: impl FnOnce() -> R,
    ) -> CacheResult<R> {
        match result {
            Err(e) if self.tolerate_errors && e.is_tolerable() => {
                tracing::warn!(
                    operation,
                    cache = %self.descriptor,
                    bucket = ?self.bucket,
                    error = %e,
                    "cache failure tolerated"
                );
                Ok(fallback())
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;

    #[test]
    fn test_retriever_captures_generic_shape() {
        let retriever = TypedRetriever::<Vec<Option<String>>>::new().with_bucket("names");
        assert_eq!(retriever.descriptor().to_string(), "Vec<Option<String>>");
        assert_eq!(retriever.bucket(), Some("names"));
    }

    #[tokio::test]
    async fn test_bound_cache_fills_parameters() {
        let store = Arc::new(MemoryStore::new());
        let manager = Arc::new(CacheManager::new(store.clone(), "app-1").unwrap());
        let cache = TypedRetriever::<String>::new()
            .with_bucket("nick")
            .bind(&manager, 0);

        cache.put("42", &"kris".to_string()).await.unwrap();
        assert_eq!(store.peek("app-1::String:nick:42").as_deref(), Some("\"kris\""));
        assert_eq!(cache.get("42").await.unwrap().as_deref(), Some("kris"));
        assert_eq!(cache.ttl("42").await.unwrap(), TtlStatus::Persistent);
    }

    #[tokio::test]
    async fn test_bind_default_uses_manager_expiry() {
        let manager =
            Arc::new(CacheManager::new(Arc::new(MemoryStore::new()), "app-1").unwrap());
        let cache = TypedRetriever::<u64>::new().bind_default(&manager);
        assert_eq!(cache.expiry_secs(), 300);
    }

    #[tokio::test]
    async fn test_error_tolerance_degrades_reads_and_writes() {
        let store = Arc::new(MemoryStore::new());
        let manager = Arc::new(CacheManager::new(store.clone(), "app-1").unwrap());
        let cache = TypedRetriever::<u64>::new()
            .with_error_tolerance(true)
            .bind(&manager, 0);

        store.set_available(false);
        assert_eq!(cache.get("1").await.unwrap(), None);
        cache.put("1", &5).await.unwrap();
        cache.invalidate("1").await.unwrap();
        assert_eq!(cache.ttl("1").await.unwrap(), TtlStatus::Absent);

        let value = cache
            .get_or_compute("1", |_| async { Ok::<_, LoaderError>(9) })
            .await
            .unwrap();
        assert_eq!(value, 9);
    }

    #[tokio::test]
    async fn test_error_tolerance_never_hides_loader_failures() {
        let manager =
            Arc::new(CacheManager::new(Arc::new(MemoryStore::new()), "app-1").unwrap());
        let cache = TypedRetriever::<u64>::new()
            .with_error_tolerance(true)
            .bind(&manager, 0);

        let err = cache
            .get_or_compute("1", |_| async { Err::<u64, _>("nope") })
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::LoaderFailure { .. }));
    }

    #[tokio::test]
    async fn test_without_tolerance_errors_propagate() {
        let store = Arc::new(MemoryStore::new());
        let manager = Arc::new(CacheManager::new(store.clone(), "app-1").unwrap());
        let cache = TypedRetriever::<u64>::new().bind(&manager, 0);

        store.set_available(false);
        assert!(matches!(
            cache.get("1").await,
            Err(CacheError::StoreUnavailable(_))
        ));
    }
}
