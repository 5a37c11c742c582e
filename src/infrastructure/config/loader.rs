//! Hierarchical configuration loading and validation.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;
use crate::services::KeyBuilder;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    /// `cache.prefix` is empty.
    #[error("Cache prefix cannot be empty")]
    EmptyPrefix,

    /// `cache.prefix` holds `:` or a glob character.
    #[error("Invalid cache prefix: {0}. Must not contain ':' or glob characters")]
    InvalidPrefix(String),

    /// `store.url` is blank.
    #[error("Store url cannot be empty")]
    EmptyStoreUrl,

    /// `store.max_connections` is zero.
    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    /// `store.min_idle` exceeds the pool size.
    #[error("Invalid min_idle: {min_idle}. Must not exceed max_connections ({max_connections})")]
    InvalidMinIdle {
        /// Configured idle floor.
        min_idle: u32,
        /// Configured pool size.
        max_connections: u32,
    },

    /// `store.scan_page_size` is zero.
    #[error("Invalid scan_page_size: {0}. Must be at least 1")]
    InvalidScanPageSize(usize),

    /// No TTL workers configured.
    #[error("Invalid ttl_scheduler.workers: {0}. Must be at least 1")]
    InvalidWorkers(usize),

    /// TTL queue has no capacity.
    #[error("Invalid ttl_scheduler.queue_capacity: {0}. Must be at least 1")]
    InvalidQueueCapacity(usize),

    /// Event bus channel has no capacity.
    #[error("Invalid event_bus.channel_capacity: {0}. Must be at least 1")]
    InvalidChannelCapacity(usize),

    /// Unknown log level name.
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .kvstash/config.yaml (project config)
    /// 3. .kvstash/local.yaml (project local overrides, optional)
    /// 4. Environment variables (KVSTASH_* prefix, `__` separates sections)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".kvstash/config.yaml"))
            .merge(Yaml::file(".kvstash/local.yaml"))
            .merge(Env::prefixed("KVSTASH_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let prefix = &config.cache.prefix;
        if prefix.is_empty() {
            return Err(ConfigError::EmptyPrefix);
        }
        if KeyBuilder::validate_prefix(prefix).is_err() {
            return Err(ConfigError::InvalidPrefix(prefix.clone()));
        }

        let store = &config.store;
        if store.url.trim().is_empty() {
            return Err(ConfigError::EmptyStoreUrl);
        }
        if store.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(store.max_connections));
        }
        if store.min_idle > store.max_connections {
            return Err(ConfigError::InvalidMinIdle {
                min_idle: store.min_idle,
                max_connections: store.max_connections,
            });
        }
        if store.scan_page_size == 0 {
            return Err(ConfigError::InvalidScanPageSize(store.scan_page_size));
        }

        if config.ttl_scheduler.workers == 0 {
            return Err(ConfigError::InvalidWorkers(config.ttl_scheduler.workers));
        }
        if config.ttl_scheduler.queue_capacity == 0 {
            return Err(ConfigError::InvalidQueueCapacity(
                config.ttl_scheduler.queue_capacity,
            ));
        }

        if config.event_bus.channel_capacity == 0 {
            return Err(ConfigError::InvalidChannelCapacity(
                config.event_bus.channel_capacity,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        Ok(())
    }
}
