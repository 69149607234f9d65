//! The ring cache: lock-light reads, asynchronous placement.
//!
//! [`RingCache`] maps keys to values over a fixed-capacity ring. Lookups go
//! straight to the key index under a shared read lock and return
//! immediately; every change to ring storage (placement, promotion,
//! eviction) is an instruction enqueued to the background worker, which is
//! the only thread allowed to touch the ring.
//!
//! ## Consistency contract
//!
//! The index is mutated under a write lock and read under a shared lock, so
//! reads are *eventually* consistent with the worker: a key can be observed
//! before its entry is physically placed, and an entry about to be evicted
//! can still be returned. What is never stale is the value itself: an
//! entry's value is immutable from creation, so a hit always returns the
//! exact value stored for that key's current generation.
//!
//! Concurrent misses on the same key are not deduplicated: each caller runs
//! its producer and the last `set` wins. Callers that need single-flight
//! semantics must layer it on top.
//!
//! ## Example
//!
//! ```
//! use ringcache::cache::RingCache;
//!
//! let cache: RingCache<String, u64> = RingCache::new(128);
//! cache.set("alpha".into(), 1);
//!
//! let beta = cache.get_or_insert_with("beta".into(), || 2);
//! assert_eq!(*beta, 2);
//! assert_eq!(*cache.get(&"alpha".into()).unwrap(), 1);
//! assert!(cache.get(&"gamma".into()).is_err());
//! ```

pub mod entry;
pub mod sink;

mod command;
mod index;
mod worker;

pub use command::{RingSnapshot, SnapshotEntry};

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel::{Sender, bounded, unbounded};

use crate::cache::command::Command;
use crate::cache::entry::CacheEntry;
use crate::cache::index::KeyIndex;
use crate::cache::sink::{DiagnosticSink, TracingSink};
use crate::cache::worker::Worker;
use crate::error::CacheMiss;
use crate::metrics::{CacheMetrics, CounterSet};

/// Capacity used by [`RingCache::default`].
pub const DEFAULT_CAPACITY: usize = 64;

/// Fixed-capacity key-value cache over a ring buffer, with an asynchronous
/// single-writer eviction/promotion pipeline.
///
/// Construction spawns the worker thread; dropping the cache closes the
/// instruction queue, lets the worker drain out and joins it.
pub struct RingCache<K, V> {
    index: Arc<KeyIndex<K, V>>,
    commands: Option<Sender<Command<K, V>>>,
    sink: Arc<dyn DiagnosticSink>,
    counters: Arc<CounterSet>,
    next_token: AtomicU64,
    capacity: usize,
    worker: Option<JoinHandle<()>>,
}

impl<K, V> fmt::Debug for RingCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingCache")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

impl<K, V> RingCache<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Creates a cache with `capacity` ring slots and the default diagnostic
    /// sink. Capacity is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        Self::with_parts(capacity.max(1), Arc::new(TracingSink))
    }

    pub(crate) fn with_parts(capacity: usize, sink: Arc<dyn DiagnosticSink>) -> Self {
        let capacity = capacity.max(1);
        let index = Arc::new(KeyIndex::with_capacity(capacity));
        let counters = Arc::new(CounterSet::default());
        let (tx, rx) = unbounded();

        let mut worker = Worker::new(capacity, index.clone(), rx, sink.clone(), counters.clone());
        let handle = std::thread::spawn(move || worker.run());

        Self {
            index,
            commands: Some(tx),
            sink,
            counters,
            next_token: AtomicU64::new(0),
            capacity,
            worker: Some(handle),
        }
    }

    /// Returns the value for `key`, promoting the entry.
    ///
    /// The value is returned immediately; the promotion is applied by the
    /// worker later. An absent key yields [`CacheMiss`].
    pub fn get(&self, key: &K) -> Result<Arc<V>, CacheMiss> {
        match self.index.lookup(key) {
            Some(entry) => {
                self.counters.inc_hit();
                self.promote(entry.clone());
                Ok(entry.shared_value())
            },
            None => {
                self.counters.inc_miss();
                Err(CacheMiss::new(format!(
                    "key {key:?} not found and no producer given"
                )))
            },
        }
    }

    /// Returns the value for `key`, computing and caching it on a miss.
    ///
    /// The producer runs on the caller's thread, without any cache lock held,
    /// and at most once per miss: its *result* is cached, never the producer
    /// itself. Concurrent misses on the same key may each run their producer.
    pub fn get_or_insert_with(&self, key: K, producer: impl FnOnce() -> V) -> Arc<V> {
        if let Some(entry) = self.index.lookup(&key) {
            self.counters.inc_hit();
            self.promote(entry.clone());
            return entry.shared_value();
        }
        self.counters.inc_miss();
        let value = producer();
        self.set(key, value)
    }

    /// Fallible variant of [`get_or_insert_with`](Self::get_or_insert_with).
    ///
    /// A producer error propagates to the caller and nothing is inserted.
    pub fn try_get_or_insert_with<E>(
        &self,
        key: K,
        producer: impl FnOnce() -> Result<V, E>,
    ) -> Result<Arc<V>, E> {
        if let Some(entry) = self.index.lookup(&key) {
            self.counters.inc_hit();
            self.promote(entry.clone());
            return Ok(entry.shared_value());
        }
        self.counters.inc_miss();
        let value = producer()?;
        Ok(self.set(key, value))
    }

    /// Installs `value` under `key` and returns it.
    ///
    /// The mapping is visible to readers as soon as `set` returns; physical
    /// placement in the ring is asynchronous. Any previous entry for the key
    /// is scheduled for eviction.
    pub fn set(&self, key: K, value: V) -> Arc<V> {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let entry = Arc::new(CacheEntry::new(key.clone(), value, token));
        let shared = entry.shared_value();

        {
            let mut map = self.index.write();
            if let Some(previous) = map.insert(key, entry.clone()) {
                self.enqueue(Command::Evict(previous));
            }
            self.enqueue(Command::Insert(entry));
        }

        self.counters.inc_insert();
        shared
    }

    /// Returns `true` if `key` is currently mapped.
    pub fn contains(&self, key: &K) -> bool {
        self.index.lookup(key).is_some()
    }

    /// Returns the number of mapped keys.
    ///
    /// Eventually consistent: keys scheduled for eviction are counted until
    /// the worker applies the eviction.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` if no key is mapped.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the ring capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns a point-in-time copy of the operation counters.
    pub fn metrics(&self) -> CacheMetrics {
        self.counters.snapshot()
    }

    /// Captures the ring contents, oldest-remaining entry first.
    ///
    /// Diagnostics and tests only; not part of the correctness contract for
    /// concurrent callers. Returns an empty snapshot if the worker is gone.
    pub fn snapshot(&self) -> RingSnapshot<K, V> {
        let (reply_tx, reply_rx) = bounded(1);
        self.enqueue(Command::Snapshot(reply_tx));
        reply_rx.recv().unwrap_or_default()
    }

    /// Blocks until every instruction enqueued before this call has been
    /// applied by the worker.
    pub fn flush(&self) {
        let _ = self.snapshot();
    }

    fn promote(&self, entry: Arc<CacheEntry<K, V>>) {
        self.counters.inc_promotion();
        self.enqueue(Command::Promote(entry));
    }

    fn enqueue(&self, command: Command<K, V>) {
        let Some(commands) = &self.commands else {
            return;
        };
        if commands.send(command).is_err() {
            // The worker thread is gone; the cache degrades to map-only
            // lookups rather than panicking.
            self.sink.report(&crate::error::WorkerError::new(
                "instruction queue disconnected; worker thread is gone",
            ));
        }
    }
}

impl<K, V> Default for RingCache<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Creates a cache with [`DEFAULT_CAPACITY`] slots.
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<K, V> Drop for RingCache<K, V> {
    fn drop(&mut self) {
        // Disconnect the queue so the worker's recv loop ends, then join.
        self.commands.take();
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}
