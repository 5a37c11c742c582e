//! Redis-backed store adapter.
//!
//! Requires the `redis` feature. Connections come from a `deadpool-redis`
//! pool and return to it when the [`RedisConnection`] guard is dropped.

use async_trait::async_trait;
use deadpool_redis::redis::{self, FromRedisValue};
use deadpool_redis::{Config as PoolSettings, Connection, Pool, PoolConfig, Runtime};

use crate::domain::errors::StoreError;
use crate::domain::models::StoreConfig;
use crate::domain::ports::{ConnectionPool, StoreConnection};

/// Pool of Redis connections.
#[derive(Clone)]
pub struct RedisPool {
    pool: Pool,
}

impl RedisPool {
    /// Build the pool and warm up `min_idle` connections.
    ///
    /// Fails when the URL is invalid or the server cannot be reached.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let mut settings = PoolSettings::from_url(config.url.as_str());
        settings.pool = Some(PoolConfig::new(config.max_connections as usize));
        let pool = settings
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| StoreError::Checkout(format!("failed to create pool: {e}")))?;

        let mut warm = Vec::with_capacity(config.min_idle as usize);
        for _ in 0..config.min_idle.min(config.max_connections) {
            warm.push(
                pool.get()
                    .await
                    .map_err(|e| StoreError::Checkout(e.to_string()))?,
            );
        }
        drop(warm);

        tracing::info!(
            url = %config.url,
            max_connections = config.max_connections,
            "redis pool ready"
        );
        Ok(Self { pool })
    }

    /// Wrap an already built pool.
    pub fn from_pool(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConnectionPool for RedisPool {
    type Connection = RedisConnection;

    async fn checkout(&self) -> Result<RedisConnection, StoreError> {
        let conn = self
            .pool
            .get()
            .await
            .map_err(|e| StoreError::Checkout(e.to_string()))?;
        Ok(RedisConnection { conn })
    }
}

/// Connection checked out of a [`RedisPool`].
pub struct RedisConnection {
    conn: Connection,
}

impl RedisConnection {
    async fn query<T: FromRedisValue>(
        &mut self,
        command: &'static str,
        cmd: &redis::Cmd,
    ) -> Result<T, StoreError> {
        let reply: T = cmd
            .query_async(&mut self.conn)
            .await
            .map_err(|e| StoreError::Command {
                command,
                reason: e.to_string(),
            })?;
        Ok(reply)
    }
}

#[async_trait]
impl StoreConnection for RedisConnection {
    async fn get(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        self.query("GET", redis::cmd("GET").arg(key)).await
    }

    async fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.query("SET", redis::cmd("SET").arg(key).arg(value)).await
    }

    async fn del(&mut self, keys: &[String]) -> Result<u64, StoreError> {
        self.query("DEL", redis::cmd("DEL").arg(keys)).await
    }

    async fn expire(&mut self, key: &str, seconds: u64) -> Result<bool, StoreError> {
        self.query("EXPIRE", redis::cmd("EXPIRE").arg(key).arg(seconds))
            .await
    }

    async fn ttl(&mut self, key: &str) -> Result<i64, StoreError> {
        self.query("TTL", redis::cmd("TTL").arg(key)).await
    }

    async fn scan(&mut self, cursor: u64, pattern: &str) -> Result<(u64, Vec<String>), StoreError> {
        self.query(
            "SCAN",
            redis::cmd("SCAN").arg(cursor).arg("MATCH").arg(pattern),
        )
        .await
    }
}
