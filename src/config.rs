//! Configuration for the event replicator.
//!
//! Configuration is loaded once at process startup and is immutable
//! afterwards. It is passed explicitly to every component that needs it;
//! there is no process-wide config state.
//!
//! # Quick Start
//!
//! ```rust
//! use event_replicator::config::ReplicationConfig;
//!
//! let config = ReplicationConfig::for_testing();
//! assert!(config.validate().is_ok());
//! ```
//!
//! # Configuration Structure
//!
//! ```text
//! ReplicationConfig
//! ├── store: StoreConfig              # MongoDB connection + collection
//! ├── cache: CacheConfig              # Redis connection + watermark key
//! ├── replication: LoopConfig         # poll interval, write concurrency
//! └── formats: FormatConfig           # store / checkpoint / cache-key formats
//! ```
//!
//! # YAML Example
//!
//! ```yaml
//! store:
//!   connection_string: "mongodb://localhost:27017"
//!   database: "events"
//!   collection: "events"
//!
//! cache:
//!   redis_url: "redis://127.0.0.1:6379"
//!   checkpoint_key: "Last Timestamp"
//!
//! replication:
//!   poll_interval: "5s"
//!
//! formats:
//!   store: "%Y-%m-%dT%H:%M:%S%.3fZ"
//!   checkpoint: "%Y-%m-%dT%H:%M:%S%.3fZ"
//!   cache_key: "%Y%m%d%H%M%S"
//! ```

use crate::error::{ReplicationError, Result};
use crate::timestamp::TimestampCodec;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════════
// Top-level config
// ═══════════════════════════════════════════════════════════════════════════════

/// The top-level config object passed to `ReplicationEngine::new()`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplicationConfig {
    /// Document store (source) settings.
    pub store: StoreConfig,

    /// Cache (destination + checkpoint) settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Polling loop settings.
    #[serde(default)]
    pub replication: LoopConfig,

    /// Timestamp formats for the three roles.
    #[serde(default)]
    pub formats: FormatConfig,
}

impl ReplicationConfig {
    /// Create a config suitable for tests: short poll interval, local hosts.
    pub fn for_testing() -> Self {
        Self {
            replication: LoopConfig {
                poll_interval: "10ms".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Parse a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| ReplicationError::Config(format!("Invalid YAML configuration: {}", e)))
    }

    /// Read and parse a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ReplicationError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Validate every section.
    ///
    /// Timestamp formats are checked against the lexical ordering contract
    /// (see [`crate::timestamp`]).
    pub fn validate(&self) -> Result<()> {
        self.store.validate()?;
        self.cache.validate()?;
        self.replication.validate()?;
        TimestampCodec::from_config(&self.formats)?;
        Ok(())
    }
}

fn parse_duration(field: &str, value: &str) -> Result<Duration> {
    humantime::parse_duration(value)
        .map_err(|e| ReplicationError::Config(format!("Invalid {} {:?}: {}", field, value, e)))
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ReplicationError::Config(format!("{} must not be empty", field)));
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// StoreConfig: MongoDB source
// ═══════════════════════════════════════════════════════════════════════════════

/// Document store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// MongoDB connection string.
    pub connection_string: String,

    /// Database holding the events collection.
    #[serde(default = "default_database")]
    pub database: String,

    /// Collection the ingestion stage appends to.
    #[serde(default = "default_collection")]
    pub collection: String,
}

fn default_database() -> String {
    "events".to_string()
}

fn default_collection() -> String {
    "events".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            connection_string: "mongodb://localhost:27017".to_string(),
            database: default_database(),
            collection: default_collection(),
        }
    }
}

impl StoreConfig {
    fn validate(&self) -> Result<()> {
        require_non_empty("store.connection_string", &self.connection_string)?;
        require_non_empty("store.database", &self.database)?;
        require_non_empty("store.collection", &self.collection)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CacheConfig: Redis destination
// ═══════════════════════════════════════════════════════════════════════════════

/// Cache connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Redis URL, e.g. `"redis://127.0.0.1:6379"`.
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Well-known key holding the watermark.
    ///
    /// One replication instance per key; two instances sharing a key race
    /// on checkpoint advances.
    #[serde(default = "default_checkpoint_key")]
    pub checkpoint_key: String,

    /// Timeout for the initial connection (duration string, e.g. "5s").
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: String,
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_checkpoint_key() -> String {
    "Last Timestamp".to_string()
}

fn default_connection_timeout() -> String {
    "5s".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            checkpoint_key: default_checkpoint_key(),
            connection_timeout: default_connection_timeout(),
        }
    }
}

impl CacheConfig {
    /// Parse `connection_timeout`.
    pub fn connection_timeout_duration(&self) -> Result<Duration> {
        parse_duration("cache.connection_timeout", &self.connection_timeout)
    }

    fn validate(&self) -> Result<()> {
        require_non_empty("cache.redis_url", &self.redis_url)?;
        require_non_empty("cache.checkpoint_key", &self.checkpoint_key)?;
        self.connection_timeout_duration().map(|_| ())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LoopConfig: polling and persistence
// ═══════════════════════════════════════════════════════════════════════════════

/// Replication loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Sleep between iterations (duration string, e.g. "5s").
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,

    /// Maximum cache writes in flight within one batch.
    /// 1 keeps writes strictly sequential in timestamp order.
    #[serde(default = "default_max_concurrent_writes")]
    pub max_concurrent_writes: usize,

    /// How long `shutdown()` waits for the in-flight batch to finish.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: String,
}

fn default_poll_interval() -> String {
    "5s".to_string()
}

fn default_max_concurrent_writes() -> usize {
    1
}

fn default_shutdown_timeout() -> String {
    "10s".to_string()
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            max_concurrent_writes: default_max_concurrent_writes(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

impl LoopConfig {
    /// Parse `poll_interval`.
    pub fn poll_interval_duration(&self) -> Result<Duration> {
        parse_duration("replication.poll_interval", &self.poll_interval)
    }

    /// Parse `shutdown_timeout`.
    pub fn shutdown_timeout_duration(&self) -> Result<Duration> {
        parse_duration("replication.shutdown_timeout", &self.shutdown_timeout)
    }

    fn validate(&self) -> Result<()> {
        if self.poll_interval_duration()?.is_zero() {
            return Err(ReplicationError::Config(
                "replication.poll_interval must be greater than zero".to_string(),
            ));
        }
        if self.max_concurrent_writes == 0 {
            return Err(ReplicationError::Config(
                "replication.max_concurrent_writes must be at least 1".to_string(),
            ));
        }
        self.shutdown_timeout_duration().map(|_| ())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FormatConfig: the three timestamp formats
// ═══════════════════════════════════════════════════════════════════════════════

/// Strftime formats for the three timestamp roles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatConfig {
    /// Format of the `Timestamp` field as written by the ingestion stage.
    #[serde(default = "default_iso_format")]
    pub store: String,

    /// Format of the watermark.
    #[serde(default = "default_iso_format")]
    pub checkpoint: String,

    /// Format of the time suffix in derived cache keys.
    #[serde(default = "default_cache_key_format")]
    pub cache_key: String,

    /// Reject formats that break lexical ordering instead of warning.
    #[serde(default = "default_true")]
    pub strict: bool,
}

fn default_iso_format() -> String {
    "%Y-%m-%dT%H:%M:%S%.3fZ".to_string()
}

fn default_cache_key_format() -> String {
    "%Y%m%d%H%M%S".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            store: default_iso_format(),
            checkpoint: default_iso_format(),
            cache_key: default_cache_key_format(),
            strict: true,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
