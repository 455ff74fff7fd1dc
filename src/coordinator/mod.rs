// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Replication engine coordinator.
//!
//! Owns the lifecycle around a [`ReplicationLoop`]:
//! - validates configuration and builds the timestamp codec
//! - spawns the loop task on [`start()`](ReplicationEngine::start)
//! - carries the cooperative shutdown signal ([`ShutdownTrigger`])
//! - publishes [`EngineState`] and [`LoopPhase`] on watch channels
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> event_replicator::Result<()> {
//! use event_replicator::config::ReplicationConfig;
//! use event_replicator::ReplicationEngine;
//!
//! let config = ReplicationConfig::from_yaml_file("config.yml")?;
//! let mut engine = ReplicationEngine::connect(config).await?;
//! engine.start()?;
//!
//! let trigger = engine.shutdown_trigger();
//! tokio::spawn(async move {
//!     let _ = tokio::signal::ctrl_c().await;
//!     trigger.trigger();
//! });
//!
//! engine.wait().await
//! # }
//! ```

mod replication_loop;
mod types;

pub use replication_loop::{IterationOutcome, ReplicationLoop};
pub use types::{EngineState, LoopPhase};

use crate::cache::{CacheClient, RedisCache};
use crate::config::ReplicationConfig;
use crate::error::{ReplicationError, Result};
use crate::metrics;
use crate::mongo::MongoStore;
use crate::store::DocumentStore;
use crate::timestamp::TimestampCodec;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

fn publish_state(state_tx: &watch::Sender<EngineState>, state: EngineState) {
    state_tx.send_replace(state);
    metrics::set_engine_state(&state.to_string());
}

/// Cloneable handle that asks the engine to stop after the current batch.
#[derive(Clone)]
pub struct ShutdownTrigger {
    shutdown_tx: Arc<watch::Sender<bool>>,
    state_tx: Arc<watch::Sender<EngineState>>,
}

impl ShutdownTrigger {
    /// Request shutdown. Idempotent.
    pub fn trigger(&self) {
        if !self.shutdown_tx.send_replace(true) {
            info!("Shutdown requested");
        }
        let moved = self.state_tx.send_if_modified(|state| {
            if *state == EngineState::Running {
                *state = EngineState::ShuttingDown;
                true
            } else {
                false
            }
        });
        if moved {
            metrics::set_engine_state("ShuttingDown");
        }
    }

    /// True once shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        *self.shutdown_tx.borrow()
    }
}

/// The replication engine.
///
/// Generic over its collaborators so tests can run it against the in-memory
/// store and cache; [`connect()`](ReplicationEngine::connect) builds the
/// MongoDB/Redis variant.
pub struct ReplicationEngine<D: DocumentStore, C: CacheClient> {
    poll_interval: Duration,
    shutdown_timeout: Duration,

    /// Moved into the loop task on `start()`.
    replication_loop: Option<ReplicationLoop<D, C>>,

    state_tx: Arc<watch::Sender<EngineState>>,
    state_rx: watch::Receiver<EngineState>,
    phase_rx: watch::Receiver<LoopPhase>,

    shutdown_tx: Arc<watch::Sender<bool>>,

    handle: Option<JoinHandle<Result<u64>>>,
}

impl ReplicationEngine<MongoStore, RedisCache> {
    /// Connect to MongoDB and Redis and build an engine.
    ///
    /// Connection failures are fatal ([`ReplicationError::Connection`]).
    pub async fn connect(config: ReplicationConfig) -> Result<Self> {
        config.validate()?;
        let store = MongoStore::connect(&config.store).await?;
        let cache = RedisCache::connect(&config.cache).await?;
        Self::new(config, Arc::new(store), Arc::new(cache))
    }
}

impl<D: DocumentStore, C: CacheClient> ReplicationEngine<D, C> {
    /// Create an engine in the `Created` state.
    pub fn new(config: ReplicationConfig, store: Arc<D>, cache: Arc<C>) -> Result<Self> {
        config.validate()?;
        let codec = TimestampCodec::from_config(&config.formats)?;
        let poll_interval = config.replication.poll_interval_duration()?;
        let shutdown_timeout = config.replication.shutdown_timeout_duration()?;

        let replication_loop = ReplicationLoop::new(
            store,
            cache,
            codec,
            config.cache.checkpoint_key.clone(),
            config.replication.max_concurrent_writes,
        );
        let phase_rx = replication_loop.phase_receiver();

        let (state_tx, state_rx) = watch::channel(EngineState::Created);
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            poll_interval,
            shutdown_timeout,
            replication_loop: Some(replication_loop),
            state_tx: Arc::new(state_tx),
            state_rx,
            phase_rx,
            shutdown_tx: Arc::new(shutdown_tx),
            handle: None,
        })
    }

    /// Get current engine state.
    pub fn state(&self) -> EngineState {
        *self.state_rx.borrow()
    }

    /// Get a receiver to watch state changes.
    pub fn state_receiver(&self) -> watch::Receiver<EngineState> {
        self.state_rx.clone()
    }

    /// Get a receiver to watch the loop phase.
    pub fn phase_receiver(&self) -> watch::Receiver<LoopPhase> {
        self.phase_rx.clone()
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state(), EngineState::Running)
    }

    /// A handle that requests cooperative shutdown from anywhere.
    pub fn shutdown_trigger(&self) -> ShutdownTrigger {
        ShutdownTrigger {
            shutdown_tx: Arc::clone(&self.shutdown_tx),
            state_tx: Arc::clone(&self.state_tx),
        }
    }

    /// Spawn the loop task. Only valid in the `Created` state.
    pub fn start(&mut self) -> Result<()> {
        let replication_loop = match (self.state(), self.replication_loop.take()) {
            (EngineState::Created, Some(replication_loop)) => replication_loop,
            (state, replication_loop) => {
                self.replication_loop = replication_loop;
                return Err(ReplicationError::InvalidState {
                    expected: "Created".to_string(),
                    actual: state.to_string(),
                });
            }
        };

        info!(
            checkpoint_key = %replication_loop.checkpoint().key(),
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Starting replication engine"
        );

        let poll_interval = self.poll_interval;
        let shutdown_rx = self.shutdown_tx.subscribe();
        let state_tx = Arc::clone(&self.state_tx);

        publish_state(&self.state_tx, EngineState::Running);

        self.handle = Some(tokio::spawn(async move {
            let result = replication_loop.run(poll_interval, shutdown_rx).await;
            match &result {
                Ok(_) => publish_state(&state_tx, EngineState::Stopped),
                Err(_) => publish_state(&state_tx, EngineState::Failed),
            }
            result
        }));

        Ok(())
    }

    /// Wait for the loop task to exit.
    ///
    /// Returns the loop's error if it failed. Returns immediately if the
    /// engine was never started.
    pub async fn wait(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        self.settle(handle.await)
    }

    /// Trigger shutdown and wait up to `shutdown_timeout` for the in-flight
    /// batch to finish.
    pub async fn shutdown(&mut self) -> Result<()> {
        info!("Shutting down replication engine");
        self.shutdown_trigger().trigger();

        let Some(mut handle) = self.handle.take() else {
            if self.state() == EngineState::Created {
                publish_state(&self.state_tx, EngineState::Stopped);
            }
            return Ok(());
        };

        match tokio::time::timeout(self.shutdown_timeout, &mut handle).await {
            Ok(joined) => self.settle(joined),
            Err(_) => {
                handle.abort();
                warn!(
                    timeout_ms = self.shutdown_timeout.as_millis() as u64,
                    "Loop did not stop in time, aborted (batch will be re-delivered on restart)"
                );
                publish_state(&self.state_tx, EngineState::Stopped);
                Ok(())
            }
        }
    }

    fn settle(&self, joined: std::result::Result<Result<u64>, tokio::task::JoinError>) -> Result<()> {
        match joined {
            Ok(Ok(iterations)) => {
                debug!(iterations, "Loop task completed");
                info!("Replication engine stopped");
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(e) => {
                error!(error = %e, "Loop task panicked");
                publish_state(&self.state_tx, EngineState::Failed);
                Err(ReplicationError::Internal(format!("loop task failed: {}", e)))
            }
        }
    }
}
