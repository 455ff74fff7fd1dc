//! Shared test utilities for replication and integration tests.
//!
//! This module provides:
//! - Redis and MongoDB testcontainer setup
//! - Recording, fault-injecting store and cache doubles
//! - Event document helpers

#![allow(dead_code)]

pub mod containers;
pub mod recording;

pub use containers::*;
pub use recording::*;

use event_replicator::config::ReplicationConfig;
use event_replicator::store::EventDocument;
use event_replicator::timestamp::{TimestampCodec, TimestampFormat};

pub const CHECKPOINT_KEY: &str = "Last Timestamp";

/// Codec with the default formats.
pub fn default_codec() -> TimestampCodec {
    let iso = TimestampFormat::new("%Y-%m-%dT%H:%M:%S%.3fZ").unwrap();
    TimestampCodec::new(iso.clone(), iso, TimestampFormat::new("%Y%m%d%H%M%S").unwrap())
}

/// ISO timestamp for second `s` after 2024-05-01T12:00:00.
pub fn ts(s: u32) -> String {
    format!("2024-05-01T12:{:02}:{:02}.000Z", s / 60, s % 60)
}

/// Cache key for reporter `r` at second `s` (see [`ts`]).
pub fn key(r: &str, s: u32) -> String {
    format!("{}:2024050112{:02}{:02}", r, s / 60, s % 60)
}

/// An event with a payload field so cache values are distinguishable.
pub fn event(reporter: &str, s: u32) -> EventDocument {
    EventDocument::with_event(reporter, &ts(s)).with_field("Reading", serde_json::json!(s))
}

/// Test config with a short poll interval.
pub fn fast_config() -> ReplicationConfig {
    ReplicationConfig::for_testing()
}
