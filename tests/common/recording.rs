//! Recording, fault-injecting doubles for the store and the cache.
//!
//! Both wrap the crate's in-memory implementations and record every call so
//! tests can assert on ordering, re-delivery and concurrency.
//!
//! # Example
//! ```rust,ignore
//! let cache = RecordingCache::new(CHECKPOINT_KEY);
//! cache.fail_checkpoint_writes(true);
//!
//! // run an iteration...
//!
//! assert_eq!(cache.record_sets().await.len(), 3);
//! ```

use event_replicator::cache::{CacheClient, InMemoryCache};
use event_replicator::error::ReplicationError;
use event_replicator::store::{BoxFuture, DocumentStore, EventDocument, InMemoryStore, Query};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

// =============================================================================
// Cache
// =============================================================================

/// Cache double that records `set` calls and can be told to fail.
pub struct RecordingCache {
    inner: InMemoryCache,
    checkpoint_key: String,
    /// Every `set`, in call order.
    sets: RwLock<Vec<(String, String)>>,
    /// Fail record writes once this many have succeeded.
    fail_after_record_writes: AtomicUsize,
    record_writes: AtomicUsize,
    fail_checkpoint_writes: AtomicBool,
    fail_reads: AtomicBool,
    write_delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingCache {
    pub fn new(checkpoint_key: &str) -> Self {
        Self {
            inner: InMemoryCache::new(),
            checkpoint_key: checkpoint_key.to_string(),
            sets: RwLock::new(Vec::new()),
            fail_after_record_writes: AtomicUsize::new(usize::MAX),
            record_writes: AtomicUsize::new(0),
            fail_checkpoint_writes: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            write_delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Every write sleeps for `delay` first.
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = delay;
        self
    }

    pub fn fail_after_record_writes(&self, n: usize) {
        self.fail_after_record_writes.store(n, Ordering::SeqCst);
    }

    pub fn fail_checkpoint_writes(&self, fail: bool) {
        self.fail_checkpoint_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// All successful `set` calls, in order.
    pub async fn sets(&self) -> Vec<(String, String)> {
        self.sets.read().await.clone()
    }

    /// Successful record (non-checkpoint) writes, in order.
    pub async fn record_sets(&self) -> Vec<(String, String)> {
        self.sets
            .read()
            .await
            .iter()
            .filter(|(k, _)| *k != self.checkpoint_key)
            .cloned()
            .collect()
    }

    /// Successful checkpoint writes, in order.
    pub async fn checkpoint_sets(&self) -> Vec<String> {
        self.sets
            .read()
            .await
            .iter()
            .filter(|(k, _)| *k == self.checkpoint_key)
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub async fn entries(&self) -> HashMap<String, String> {
        self.inner.entries().await
    }

    pub async fn watermark(&self) -> Option<String> {
        self.inner.get(&self.checkpoint_key).await.unwrap()
    }

    /// Highest number of writes observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl CacheClient for RecordingCache {
    fn get(&self, key: &str) -> BoxFuture<'_, Option<String>> {
        let key = key.to_string();
        Box::pin(async move {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(ReplicationError::query(format!("GET {}: injected failure", key)));
            }
            self.inner.get(&key).await
        })
    }

    fn set(&self, key: &str, value: String) -> BoxFuture<'_, ()> {
        let key = key.to_string();
        Box::pin(async move {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if !self.write_delay.is_zero() {
                tokio::time::sleep(self.write_delay).await;
            }

            let result = if key == self.checkpoint_key {
                if self.fail_checkpoint_writes.load(Ordering::SeqCst) {
                    Err(ReplicationError::write(&key, "injected checkpoint failure"))
                } else {
                    Ok(())
                }
            } else if self.record_writes.load(Ordering::SeqCst)
                >= self.fail_after_record_writes.load(Ordering::SeqCst)
            {
                Err(ReplicationError::write(&key, "injected record failure"))
            } else {
                self.record_writes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            };

            if result.is_ok() {
                self.inner.set(&key, value.clone()).await?;
                self.sets.write().await.push((key, value));
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        })
    }
}

// =============================================================================
// Store
// =============================================================================

/// Store double that records queries and can be told to fail.
#[derive(Default)]
pub struct RecordingStore {
    inner: InMemoryStore,
    queries: RwLock<Vec<Query>>,
    fail_queries: AtomicBool,
}

impl RecordingStore {
    pub fn with_documents(documents: Vec<EventDocument>) -> Self {
        Self {
            inner: InMemoryStore::with_documents(documents),
            ..Default::default()
        }
    }

    pub fn fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    /// Every query issued, in order.
    pub async fn queries(&self) -> Vec<Query> {
        self.queries.read().await.clone()
    }

    pub async fn push(&self, document: EventDocument) {
        self.inner.insert(document).await.unwrap();
    }
}

impl DocumentStore for RecordingStore {
    fn find(&self, query: Query) -> BoxFuture<'_, Vec<EventDocument>> {
        Box::pin(async move {
            self.queries.write().await.push(query.clone());
            if self.fail_queries.load(Ordering::SeqCst) {
                return Err(ReplicationError::query("injected query failure"));
            }
            self.inner.find(query).await
        })
    }

    fn insert(&self, document: EventDocument) -> BoxFuture<'_, ()> {
        self.inner.insert(document)
    }
}
