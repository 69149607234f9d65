//! Cache operation counters.
//!
//! Counters are tracked with relaxed atomics so any thread can record
//! events without coordination; [`CacheMetrics`] is a point-in-time copy.

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of the cache's operation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheMetrics {
    /// Lookups that found a mapped key.
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
    /// New entries installed via `set`.
    pub inserts: u64,
    /// Entries removed by the worker's batched eviction.
    pub evictions: u64,
    /// Promotions enqueued on cache hits.
    pub promotions: u64,
}

#[derive(Debug, Default)]
pub(crate) struct CounterSet {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    evictions: AtomicU64,
    promotions: AtomicU64,
}

impl CounterSet {
    pub(crate) fn snapshot(&self) -> CacheMetrics {
        CacheMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            promotions: self.promotions.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn inc_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_promotion(&self) {
        self.promotions.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_reflect_in_snapshot() {
        let counters = CounterSet::default();
        counters.inc_hit();
        counters.inc_hit();
        counters.inc_miss();
        counters.inc_insert();
        counters.inc_eviction();
        counters.inc_promotion();

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.hits, 2);
        assert_eq!(snapshot.misses, 1);
        assert_eq!(snapshot.inserts, 1);
        assert_eq!(snapshot.evictions, 1);
        assert_eq!(snapshot.promotions, 1);
    }

    #[test]
    fn default_metrics_are_zero() {
        assert_eq!(CacheMetrics::default(), CounterSet::default().snapshot());
    }
}
