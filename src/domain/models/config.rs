//! Configuration model, deserialized by the config loader.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure for kvstash
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Key namespace and default expiry
    #[serde(default)]
    pub cache: CacheConfig,

    /// Remote store connection configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Background expiry worker configuration
    #[serde(default)]
    pub ttl_scheduler: TtlSchedulerConfig,

    /// Entity change notification bus
    #[serde(default)]
    pub event_bus: EventBusConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Cache namespace configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CacheConfig {
    /// Application part of the key prefix
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Instance or shard id appended to the prefix
    #[serde(default)]
    pub instance_id: u64,

    /// Expiry used by bound caches built without an explicit one
    #[serde(default = "default_expiry_secs")]
    pub default_expiry_secs: u64,
}

fn default_prefix() -> String {
    "kvstash".to_string()
}

const fn default_expiry_secs() -> u64 {
    300
}

impl CacheConfig {
    /// Process-wide key prefix, e.g. `kvstash-0`.
    pub fn key_prefix(&self) -> String {
        format!("{}-{}", self.prefix, self.instance_id)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            instance_id: 0,
            default_expiry_secs: default_expiry_secs(),
        }
    }
}

/// Remote store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StoreConfig {
    /// Connection URL of the store
    #[serde(default = "default_store_url")]
    pub url: String,

    /// Maximum number of pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connections kept warm in the pool
    #[serde(default = "default_min_idle")]
    pub min_idle: u32,

    /// Keys returned per SCAN page by the in-memory store
    #[serde(default = "default_scan_page_size")]
    pub scan_page_size: usize,
}

fn default_store_url() -> String {
    "redis://localhost:6379".to_string()
}

const fn default_max_connections() -> u32 {
    32
}

const fn default_min_idle() -> u32 {
    16
}

const fn default_scan_page_size() -> usize {
    10
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_store_url(),
            max_connections: default_max_connections(),
            min_idle: default_min_idle(),
            scan_page_size: default_scan_page_size(),
        }
    }
}

/// Async TTL scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TtlSchedulerConfig {
    /// Number of worker tasks applying expirations
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Pending expirations held before new ones are dropped
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

const fn default_workers() -> usize {
    4
}

const fn default_queue_capacity() -> usize {
    1024
}

impl Default for TtlSchedulerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Configuration for the EventBus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EventBusConfig {
    /// Channel capacity for the broadcast channel.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

const fn default_channel_capacity() -> usize {
    1024
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,

    /// Directory for log files (optional, if None logs only to stdout)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Log rotation policy
    #[serde(default)]
    pub rotation: RotationPolicy,
}

/// Stdout log line format.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable multi-line output.
    Pretty,
}

/// How often the log file rolls over.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    /// New file every day.
    #[default]
    Daily,
    /// New file every hour.
    Hourly,
    /// Single file, never rotated.
    Never,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_dir: None,
            rotation: RotationPolicy::default(),
        }
    }
}
