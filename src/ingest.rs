// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Ingestion stage: raw JSON events into the document store.
//!
//! The replication loop relies on stored `Timestamp` values being text in
//! the store format. Ingestion enforces that where it can, but is lenient
//! where replication is strict:
//!
//! | Stage | Unparseable `Timestamp` |
//! |-------|-------------------------|
//! | ingestion | warn, store the document with the field untouched |
//! | replication | fail the batch |
//!
//! A parseable timestamp is re-rendered with the store format, so stored
//! values are canonical and compare lexically: chrono accepts unpadded
//! numeric fields on input (`2024-1-2T3:04:05.678Z`), which would otherwise
//! sort out of order.

use crate::error::{ReplicationError, Result};
use crate::metrics;
use crate::store::{DocumentStore, EventDocument, TIMESTAMP_FIELD};
use crate::timestamp::{self, TimestampFormat};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

/// Normalizes and inserts raw events.
pub struct EventIngestor<D: DocumentStore> {
    store: Arc<D>,
    store_format: TimestampFormat,
}

impl<D: DocumentStore> EventIngestor<D> {
    pub fn new(store: Arc<D>, store_format: TimestampFormat) -> Self {
        Self { store, store_format }
    }

    /// Turn one raw JSON event into a store document.
    ///
    /// Only non-object input is an error.
    pub fn normalize(&self, raw: &str) -> Result<EventDocument> {
        let mut document = EventDocument::from_json_str(raw)?;

        let canonical = match document.get(TIMESTAMP_FIELD) {
            Some(Value::String(text)) => timestamp::parse(text, &self.store_format)
                .map_err(|e| e.to_string())
                .and_then(|instant| {
                    timestamp::format(&instant, &self.store_format).map_err(|e| e.to_string())
                }),
            Some(other) => Err(format!("not a string: {}", other)),
            None => Err("field missing".to_string()),
        };

        match canonical {
            Ok(text) => {
                document.insert(TIMESTAMP_FIELD, Value::String(text));
            }
            Err(reason) => {
                warn!(
                    document_id = %document.id(),
                    format = %self.store_format.as_str(),
                    reason = %reason,
                    "Failed to convert timestamp"
                );
                metrics::record_timestamp_fallback();
            }
        }

        Ok(document)
    }

    /// Normalize and insert one raw event.
    pub async fn ingest(&self, raw: &str) -> Result<EventDocument> {
        let document = self.normalize(raw)?;
        self.store.insert(document.clone()).await?;
        metrics::record_ingested();
        debug!(
            reporter_id = document.reporter_id().as_deref().unwrap_or("<none>"),
            timestamp = document.timestamp().unwrap_or("<none>"),
            "Sent to store"
        );
        Ok(document)
    }

    /// Ingest newline-delimited JSON, skipping blank lines.
    ///
    /// Stops at the first error; parse and read errors name the 1-based line.
    pub async fn ingest_lines<R>(&self, input: R) -> Result<usize>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        let mut line_number = 0;
        let mut count = 0;

        loop {
            line_number += 1;
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    return Err(ReplicationError::Internal(format!(
                        "reading line {}: {}",
                        line_number, e
                    )))
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            self.ingest(&line).await.map_err(|e| match e {
                ReplicationError::Parse { message, .. } => {
                    ReplicationError::parse(format!("line {}", line_number), message)
                }
                other => other,
            })?;
            count += 1;
        }

        Ok(count)
    }
}
