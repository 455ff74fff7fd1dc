// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Key-value cache integration.
//!
//! The cache holds two kinds of string values:
//! - one record per replicated document, under its derived key
//! - the watermark, under a single well-known key (see [`crate::checkpoint`])
//!
//! # Example
//!
//! ```rust
//! # async fn example() -> event_replicator::Result<()> {
//! use event_replicator::cache::{CacheClient, InMemoryCache};
//!
//! let cache = InMemoryCache::new();
//! cache.set("reporter-1:20240101120000", "{}".to_string()).await?;
//! assert_eq!(cache.get("reporter-1:20240101120000").await?.as_deref(), Some("{}"));
//! # Ok(())
//! # }
//! ```

use crate::config::CacheConfig;
use crate::error::{ReplicationError, Result};
use crate::store::BoxFuture;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::info;

/// What the replicator needs from the cache.
pub trait CacheClient: Send + Sync + 'static {
    /// Read a string value; `None` if the key does not exist.
    fn get(&self, key: &str) -> BoxFuture<'_, Option<String>>;

    /// Write a string value, replacing any previous one.
    fn set(&self, key: &str, value: String) -> BoxFuture<'_, ()>;
}

/// Redis-backed cache.
///
/// Uses `redis::aio::ConnectionManager`, which reconnects on its own and is
/// multiplexed: cloning it per call is cheap and lets writes run
/// concurrently on one socket.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    /// Connect to Redis, failing after `connection_timeout`.
    pub async fn connect(config: &CacheConfig) -> Result<Self> {
        let connect_timeout = config.connection_timeout_duration()?;
        let client = Client::open(config.redis_url.as_str())
            .map_err(|e| ReplicationError::Config(format!("Invalid Redis URL: {}", e)))?;

        let conn = match timeout(connect_timeout, client.get_connection_manager()).await {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => return Err(ReplicationError::connection("redis", e)),
            Err(_) => {
                return Err(ReplicationError::connection(
                    "redis",
                    format!("connection timed out after {}ms", connect_timeout.as_millis()),
                ))
            }
        };

        info!("Connected to cache");
        Ok(Self { conn })
    }
}

impl CacheClient for RedisCache {
    fn get(&self, key: &str) -> BoxFuture<'_, Option<String>> {
        let key = key.to_string();
        let mut conn = self.conn.clone();
        Box::pin(async move {
            conn.get::<_, Option<String>>(&key)
                .await
                .map_err(|e| ReplicationError::query(format!("GET {}: {}", key, e)))
        })
    }

    fn set(&self, key: &str, value: String) -> BoxFuture<'_, ()> {
        let key = key.to_string();
        let mut conn = self.conn.clone();
        Box::pin(async move {
            conn.set::<_, _, ()>(&key, value)
                .await
                .map_err(|e| ReplicationError::write(key, e))
        })
    }
}

/// An in-memory cache for standalone mode and tests.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every entry.
    pub async fn entries(&self) -> HashMap<String, String> {
        self.entries.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Remove a key (used to simulate lost writes in tests).
    pub async fn remove(&self, key: &str) -> Option<String> {
        self.entries.write().await.remove(key)
    }
}

impl CacheClient for InMemoryCache {
    fn get(&self, key: &str) -> BoxFuture<'_, Option<String>> {
        let key = key.to_string();
        Box::pin(async move { Ok(self.entries.read().await.get(&key).cloned()) })
    }

    fn set(&self, key: &str, value: String) -> BoxFuture<'_, ()> {
        let key = key.to_string();
        Box::pin(async move {
            tracing::trace!(key = %key, len = value.len(), "InMemory: set");
            self.entries.write().await.insert(key, value);
            Ok(())
        })
    }
}
