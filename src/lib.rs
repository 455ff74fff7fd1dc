//! # Event Replicator
//!
//! Incremental, checkpointed replication of event documents from a document
//! store (MongoDB) into a key-value cache (Redis), plus the ingestion stage
//! that feeds the store.
//!
//! ## Architecture
//!
//! ```text
//!  raw JSON ──► EventIngestor ──► ┌──────────────┐
//!                                 │ DocumentStore│ (MongoDB)
//!                                 └──────┬───────┘
//!                                        │ find(Timestamp > W, asc)
//! ┌──────────────────────────────────────▼────────────────────────────────┐
//! │                     ReplicationEngine / ReplicationLoop               │
//! │   read W ─► query ─► derive keys ─► write records ─► write new W      │
//! └──────────────────────────────────────┬────────────────────────────────┘
//!                                        │ SET ReporterId:yyyyMMddHHmmss
//!                                 ┌──────▼───────┐
//!                                 │ CacheClient  │ (Redis, also holds W)
//!                                 └──────────────┘
//! ```
//!
//! `W` is the watermark: the last timestamp of the last fully written batch.
//! Delivery is at-least-once; every error stops the loop and a restart
//! resumes from `W`.
//!
//! ## Usage
//!
//! ```rust
//! use event_replicator::cache::InMemoryCache;
//! use event_replicator::store::{EventDocument, InMemoryStore};
//! use event_replicator::{ReplicationConfig, ReplicationEngine};
//! use std::sync::Arc;
//!
//! # async fn example() -> event_replicator::Result<()> {
//! let store = Arc::new(InMemoryStore::with_documents(vec![
//!     EventDocument::with_event("sensor-1", "2024-01-01T00:00:00.000Z"),
//! ]));
//! let cache = Arc::new(InMemoryCache::new());
//!
//! let mut engine = ReplicationEngine::new(ReplicationConfig::for_testing(), store, cache)?;
//! engine.start()?;
//! engine.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod checkpoint;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod ingest;
pub mod key;
pub mod logging;
pub mod metrics;
pub mod mongo;
pub mod query;
pub mod resilience;
pub mod store;
pub mod timestamp;

// Re-exports for convenience
pub use cache::{CacheClient, InMemoryCache, RedisCache};
pub use checkpoint::{CheckpointStore, Watermark};
pub use config::{CacheConfig, FormatConfig, LoopConfig, ReplicationConfig, StoreConfig};
pub use coordinator::{EngineState, IterationOutcome, LoopPhase, ReplicationEngine, ReplicationLoop, ShutdownTrigger};
pub use error::{ReplicationError, Result};
pub use ingest::EventIngestor;
pub use key::KeyDeriver;
pub use mongo::MongoStore;
pub use store::{DocumentStore, EventDocument, Filter, InMemoryStore, Query, Sort};
pub use timestamp::{TimestampCodec, TimestampFormat};
