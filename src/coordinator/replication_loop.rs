// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! The replication loop: poll, fetch, persist, checkpoint, sleep, repeat.
//!
//! # One Iteration
//!
//! ```text
//! Idle ─→ Fetching                      Persisting                       ─→ Idle
//!         read watermark W              derive every key (parse errors
//!         find(Timestamp > W, asc)        abort here, before any write)
//!         │                             write records (≤ N in flight)
//!         └─ empty → Idle (W untouched) write watermark = last.Timestamp
//! ```
//!
//! # Delivery Guarantee
//!
//! The watermark is written only after every record of the batch is in the
//! cache. A crash between the two re-delivers the batch on restart, and since
//! keys are derived deterministically the re-delivery overwrites the same
//! keys with the same values (at-least-once, idempotent).
//!
//! # Failure Policy
//!
//! Any error ends the loop. There is no retry layer: restarting resumes from
//! the last persisted watermark.
//!
//! # Graceful Shutdown
//!
//! The shutdown signal is checked before each iteration and during the
//! sleep. A batch that has been fetched always runs to completion, including
//! its watermark write.

use crate::cache::CacheClient;
use crate::checkpoint::{CheckpointStore, Watermark};
use crate::error::{ReplicationError, Result};
use crate::key::KeyDeriver;
use crate::metrics;
use crate::query::incremental_query;
use crate::resilience::Bulkhead;
use crate::store::{DocumentStore, EventDocument};
use crate::timestamp::TimestampCodec;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span, Instrument};

use super::types::LoopPhase;

/// What one iteration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IterationOutcome {
    /// The query returned nothing; the watermark was not touched.
    Empty,
    /// A batch was written and the watermark advanced.
    Replicated { count: usize, watermark: Watermark },
}

/// A record ready to be written: derived key and serialized document.
struct PreparedRecord {
    key: String,
    value: String,
}

/// Incremental replication from a [`DocumentStore`] into a [`CacheClient`].
pub struct ReplicationLoop<D: DocumentStore, C: CacheClient> {
    store: Arc<D>,
    cache: Arc<C>,
    checkpoint: CheckpointStore<C>,
    keys: KeyDeriver,
    codec: TimestampCodec,
    bulkhead: Bulkhead,
    phase_tx: watch::Sender<LoopPhase>,
}

impl<D: DocumentStore, C: CacheClient> ReplicationLoop<D, C> {
    /// Build a loop.
    ///
    /// `max_concurrent_writes` bounds record writes within a batch; 1 writes
    /// strictly in timestamp order.
    pub fn new(
        store: Arc<D>,
        cache: Arc<C>,
        codec: TimestampCodec,
        checkpoint_key: impl Into<String>,
        max_concurrent_writes: usize,
    ) -> Self {
        let (phase_tx, _) = watch::channel(LoopPhase::Idle);
        Self {
            store,
            checkpoint: CheckpointStore::new(Arc::clone(&cache), checkpoint_key),
            cache,
            keys: KeyDeriver::new(codec.clone()),
            codec,
            bulkhead: Bulkhead::new(max_concurrent_writes),
            phase_tx,
        }
    }

    /// Watch the loop phase.
    pub fn phase_receiver(&self) -> watch::Receiver<LoopPhase> {
        self.phase_tx.subscribe()
    }

    /// Current phase.
    pub fn phase(&self) -> LoopPhase {
        *self.phase_tx.borrow()
    }

    pub fn checkpoint(&self) -> &CheckpointStore<C> {
        &self.checkpoint
    }

    fn set_phase(&self, phase: LoopPhase) {
        self.phase_tx.send_replace(phase);
    }

    /// Run iterations until shutdown is signalled or an error occurs.
    ///
    /// Returns the number of completed iterations. A dropped shutdown sender
    /// counts as a shutdown request.
    pub async fn run(&self, poll_interval: Duration, mut shutdown_rx: watch::Receiver<bool>) -> Result<u64> {
        let span = info_span!("replication_loop", checkpoint_key = %self.checkpoint.key());

        async move {
            info!(poll_interval_ms = poll_interval.as_millis() as u64, "Starting replication loop");
            let mut iterations: u64 = 0;

            loop {
                if *shutdown_rx.borrow() {
                    info!("Shutdown signal received, stopping before next fetch");
                    break;
                }

                let started = Instant::now();
                match self.run_iteration().await {
                    Ok(IterationOutcome::Empty) => {}
                    Ok(IterationOutcome::Replicated { count, watermark }) => {
                        info!(count, watermark = %watermark, "Batch replicated");
                    }
                    Err(e) => {
                        self.set_phase(LoopPhase::Idle);
                        metrics::record_error(e.kind());
                        error!(error = %e, kind = e.kind(), "Replication loop aborted");
                        return Err(e);
                    }
                }
                metrics::record_iteration_duration(started.elapsed());
                iterations += 1;

                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            info!("Shutdown signal received during poll sleep");
                            break;
                        }
                    }
                    _ = tokio::time::sleep(poll_interval) => {}
                }
            }

            info!(iterations, "Replication loop stopped");
            Ok(iterations)
        }
        .instrument(span)
        .await
    }

    /// Run exactly one fetch/persist/checkpoint cycle.
    pub async fn run_iteration(&self) -> Result<IterationOutcome> {
        self.set_phase(LoopPhase::Fetching);

        let previous = self.checkpoint.read_watermark().await?;
        let query = incremental_query(previous.as_ref());
        let documents = self.store.find(query).await?;
        metrics::record_documents_fetched(documents.len());

        let Some(last) = documents.last() else {
            info!(
                watermark = previous.as_ref().map(Watermark::as_str).unwrap_or("<none>"),
                "No new documents"
            );
            metrics::record_empty_poll();
            self.set_phase(LoopPhase::Idle);
            return Ok(IterationOutcome::Empty);
        };

        self.set_phase(LoopPhase::Persisting);
        debug!(count = documents.len(), "Fetched batch");

        let proposed = self.next_watermark(last)?;
        let records = self.prepare(&documents)?;
        let count = self.write_records(records).await?;

        if let Some(previous) = previous.as_ref() {
            if proposed <= *previous {
                return Err(ReplicationError::WatermarkRegression {
                    previous: previous.to_string(),
                    proposed: proposed.to_string(),
                });
            }
        }

        self.checkpoint.write_watermark(&proposed).await?;
        metrics::record_watermark_advanced();
        self.set_phase(LoopPhase::Idle);

        Ok(IterationOutcome::Replicated {
            count,
            watermark: proposed,
        })
    }

    /// Checkpoint-format rendering of the batch's last timestamp.
    fn next_watermark(&self, last: &EventDocument) -> Result<Watermark> {
        let instant = self.keys.document_instant(last)?;
        let rendered = self.codec.format_checkpoint(&instant)?;
        Watermark::new(rendered).ok_or_else(|| {
            ReplicationError::Internal(format!(
                "checkpoint format {:?} rendered an empty watermark",
                self.codec.checkpoint_format().as_str()
            ))
        })
    }

    /// Derive every key and serialize every document before any write.
    fn prepare(&self, documents: &[EventDocument]) -> Result<Vec<PreparedRecord>> {
        documents
            .iter()
            .map(|document| {
                Ok(PreparedRecord {
                    key: self.keys.derive_key(document)?,
                    value: document.to_json_string(),
                })
            })
            .collect()
    }

    /// Write records with at most `max_concurrent_writes` in flight.
    ///
    /// The first failure aborts the writes still running.
    async fn write_records(&self, records: Vec<PreparedRecord>) -> Result<usize> {
        let mut pending = records.into_iter().peekable();
        let mut join_set: JoinSet<Result<String>> = JoinSet::new();
        let mut written = 0;

        while pending.peek().is_some() || !join_set.is_empty() {
            if pending.peek().is_some() {
                if let Some(permit) = self.bulkhead.try_acquire() {
                    if let Some(record) = pending.next() {
                        let cache = Arc::clone(&self.cache);
                        join_set.spawn(async move {
                            let _permit = permit;
                            cache.set(&record.key, record.value).await?;
                            Ok(record.key)
                        });
                    }
                    continue;
                }
            }

            match join_set.join_next().await {
                Some(Ok(Ok(key))) => {
                    written += 1;
                    info!(key = %key, "Record written");
                }
                Some(Ok(Err(e))) => {
                    join_set.abort_all();
                    return Err(e);
                }
                Some(Err(e)) => {
                    join_set.abort_all();
                    return Err(ReplicationError::Internal(format!("write task failed: {}", e)));
                }
                None => break,
            }
        }

        metrics::record_records_written(written);
        Ok(written)
    }
}
