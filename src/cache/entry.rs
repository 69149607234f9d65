//! The stored cache record, shared between the index map, the ring, and
//! in-flight worker instructions.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Sentinel slot index for an entry the worker has not yet placed.
const UNPLACED: usize = usize::MAX;

/// A cached key/value pair plus its last known slot index and hit count.
///
/// Entries are shared as `Arc<CacheEntry<K, V>>`. The value is never mutated
/// after creation; only the placement (`slot`) and the hit counter change,
/// and only the cache worker writes them. Two entries for the same key are
/// told apart by their generation `token`, never by key equality: a key can
/// be superseded by a newer entry while the older one still sits in the ring
/// or in the instruction queue.
#[derive(Debug)]
pub struct CacheEntry<K, V> {
    key: K,
    value: Arc<V>,
    slot: AtomicUsize,
    hits: AtomicU64,
    token: u64,
}

impl<K, V> CacheEntry<K, V> {
    pub(crate) fn new(key: K, value: V, token: u64) -> Self {
        Self {
            key,
            value: Arc::new(value),
            slot: AtomicUsize::new(UNPLACED),
            hits: AtomicU64::new(0),
            token,
        }
    }

    /// Returns the cached key.
    #[inline]
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Returns the cached value.
    #[inline]
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Returns a shared handle to the cached value.
    #[inline]
    pub fn shared_value(&self) -> Arc<V> {
        Arc::clone(&self.value)
    }

    /// Returns the generation token distinguishing this entry from any other
    /// entry ever created for the same key.
    #[inline]
    pub fn token(&self) -> u64 {
        self.token
    }

    /// Returns the slot this entry last occupied, or `None` before first
    /// placement. Stale after eviction; the worker validates occupancy by
    /// token before trusting it.
    #[inline]
    pub fn slot(&self) -> Option<usize> {
        match self.slot.load(Ordering::Relaxed) {
            UNPLACED => None,
            position => Some(position),
        }
    }

    /// Returns how many times the worker repositioned this entry.
    #[inline]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub(crate) fn set_slot(&self, position: usize) {
        self.slot.store(position, Ordering::Relaxed);
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }
}
