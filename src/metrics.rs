//! Metrics for observability.
//!
//! Emitted through the `metrics` facade; the binary decides whether an
//! exporter is installed. Without one every call is a no-op.
//!
//! # Metric Naming Convention
//!
//! All metrics are prefixed with `replicator_`:
//! - Counters end in `_total`
//! - Gauges represent current state
//! - Histograms track distributions (duration)

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Documents returned by one incremental query.
pub fn record_documents_fetched(count: usize) {
    counter!("replicator_documents_fetched_total").increment(count as u64);
}

/// Records written to the cache.
pub fn record_records_written(count: usize) {
    counter!("replicator_records_written_total").increment(count as u64);
}

/// An iteration whose query returned nothing.
pub fn record_empty_poll() {
    counter!("replicator_empty_polls_total").increment(1);
}

/// A watermark persisted after a batch.
pub fn record_watermark_advanced() {
    counter!("replicator_watermark_advances_total").increment(1);
}

/// Wall time of one iteration (query to watermark write).
pub fn record_iteration_duration(duration: Duration) {
    histogram!("replicator_iteration_duration_seconds").record(duration.as_secs_f64());
}

/// An error that terminated the loop, labelled by [`crate::error::ReplicationError::kind`].
pub fn record_error(kind: &'static str) {
    counter!("replicator_errors_total", "kind" => kind).increment(1);
}

/// Gauge for engine state.
pub fn set_engine_state(state: &str) {
    let value = match state {
        "Created" => 0.0,
        "Running" => 1.0,
        "ShuttingDown" => 2.0,
        "Stopped" => 3.0,
        "Failed" => 4.0,
        _ => -1.0,
    };
    gauge!("replicator_engine_state").set(value);
}

/// A document inserted by the ingestion stage.
pub fn record_ingested() {
    counter!("replicator_documents_ingested_total").increment(1);
}

/// An ingested `Timestamp` that could not be parsed and was kept as text.
pub fn record_timestamp_fallback() {
    counter!("replicator_ingest_timestamp_fallbacks_total").increment(1);
}
