//! Remote key-value store ports.

use async_trait::async_trait;

use crate::domain::errors::StoreError;

/// Pool of connections to the remote key-value store.
///
/// A checked-out connection goes back to the pool when it is dropped, so
/// every exit path of a caller releases it, including early returns on
/// errors.
#[async_trait]
pub trait ConnectionPool: Send + Sync + 'static {
    /// Connection handed out by [`checkout`](Self::checkout).
    type Connection: StoreConnection;

    /// Check out one connection for a single logical operation.
    async fn checkout(&self) -> Result<Self::Connection, StoreError>;
}

/// One checked-out connection to the remote key-value store.
///
/// Each method issues exactly one store command.
#[async_trait]
pub trait StoreConnection: Send {
    /// GET: stored payload, or `None` when the key is absent.
    async fn get(&mut self, key: &str) -> Result<Option<String>, StoreError>;

    /// SET without an implicit expiry. Replaces any existing TTL.
    async fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// DEL over one or more keys, returning how many existed.
    async fn del(&mut self, keys: &[String]) -> Result<u64, StoreError>;

    /// EXPIRE, returning whether the key existed.
    async fn expire(&mut self, key: &str, seconds: u64) -> Result<bool, StoreError>;

    /// TTL in seconds, `-1` when the key has no expiry and `-2` when absent.
    async fn ttl(&mut self, key: &str) -> Result<i64, StoreError>;

    /// SCAN one page. A returned cursor of `0` ends the iteration.
    async fn scan(&mut self, cursor: u64, pattern: &str) -> Result<(u64, Vec<String>), StoreError>;
}
