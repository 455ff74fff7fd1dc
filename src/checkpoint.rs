// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Watermark persistence.
//!
//! The watermark is the highest document timestamp known to be fully
//! replicated. It lives in the cache itself, under one well-known key, so
//! the replicated records and the progress marker share a single backend.
//!
//! # Checkpoint Semantics
//!
//! The watermark stores the timestamp of the **last document of the last
//! fully persisted batch**. On restart we resume with a strict `>` query.
//!
//! ```text
//! fetch batch → write every record → write watermark
//!                (crash here = batch is re-fetched and re-written, idempotent)
//! ```
//!
//! An absent key (or an empty value left by an older deployment) means "no
//! prior checkpoint": the next query matches every document.

use crate::cache::CacheClient;
use crate::error::{ReplicationError, Result};
use std::sync::Arc;
use tracing::debug;

/// A non-empty watermark value, formatted with the checkpoint format.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Watermark(String);

impl Watermark {
    /// Wrap a watermark string; `None` for the empty string.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Watermark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reads and writes the watermark under a fixed cache key.
pub struct CheckpointStore<C: CacheClient> {
    cache: Arc<C>,
    key: String,
}

impl<C: CacheClient> CheckpointStore<C> {
    pub fn new(cache: Arc<C>, key: impl Into<String>) -> Self {
        Self {
            cache,
            key: key.into(),
        }
    }

    /// The well-known cache key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the current watermark.
    ///
    /// Returns `None` when nothing has been replicated yet.
    pub async fn read_watermark(&self) -> Result<Option<Watermark>> {
        let raw = self.cache.get(&self.key).await?;
        let watermark = raw.and_then(Watermark::new);
        debug!(
            key = %self.key,
            watermark = watermark.as_ref().map(Watermark::as_str).unwrap_or("<none>"),
            "Read watermark"
        );
        Ok(watermark)
    }

    /// Persist a new watermark.
    ///
    /// Callers must only invoke this after every record of the batch has
    /// been written.
    pub async fn write_watermark(&self, watermark: &Watermark) -> Result<()> {
        self.cache
            .set(&self.key, watermark.as_str().to_string())
            .await
            .map_err(|e| match e {
                ReplicationError::Write { message, .. } => ReplicationError::Write {
                    key: self.key.clone(),
                    message: format!("watermark {}: {}", watermark, message),
                },
                other => other,
            })?;
        debug!(key = %self.key, watermark = %watermark, "Watermark persisted");
        Ok(())
    }
}
