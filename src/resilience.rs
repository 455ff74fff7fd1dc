// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Concurrency limiting for cache writes.
//!
//! A batch can hold any number of documents. A record write is spawned onto
//! the batch's `JoinSet` only once it holds a slot from the [`Bulkhead`], so
//! at most `max_concurrent_writes` writes are in flight against the cache.
//! When no slot is free the caller reaps a finished write instead of waiting
//! on the semaphore, which lets the first failure surface immediately.
//!
//! # Example
//!
//! ```rust
//! use event_replicator::resilience::Bulkhead;
//!
//! let bulkhead = Bulkhead::new(2);
//! let first = bulkhead.try_acquire();
//! let _second = bulkhead.try_acquire();
//! assert!(bulkhead.try_acquire().is_none());
//!
//! drop(first);
//! assert!(bulkhead.try_acquire().is_some());
//! ```

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Bounds how many record writes of one batch run at once.
///
/// With a limit of 1 the writes of a batch are strictly sequential, which
/// keeps them in timestamp order.
#[derive(Debug, Clone)]
pub struct Bulkhead {
    slots: Arc<Semaphore>,
}

impl Bulkhead {
    /// A limit of 0 is raised to 1.
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Take a free slot if there is one. The slot is released when the
    /// permit drops.
    pub fn try_acquire(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.slots).try_acquire_owned().ok()
    }
}
