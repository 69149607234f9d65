//! Worker instructions and the diagnostic ring snapshot.

use std::fmt;
use std::sync::Arc;

use crossbeam_channel::Sender;

use crate::cache::entry::CacheEntry;

/// One instruction for the background worker.
///
/// `Promote`, `Insert` and `Evict` carry the entry they act on; `Snapshot`
/// is diagnostics-only and doubles as a quiescence fence, since the queue is
/// strictly FIFO: once the reply arrives, every earlier instruction has been
/// applied.
pub(crate) enum Command<K, V> {
    Promote(Arc<CacheEntry<K, V>>),
    Insert(Arc<CacheEntry<K, V>>),
    Evict(Arc<CacheEntry<K, V>>),
    Snapshot(Sender<RingSnapshot<K, V>>),
}

/// One occupied slot captured by a ring snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotEntry<K, V> {
    /// The cached key.
    pub key: K,
    /// The cached value.
    pub value: Arc<V>,
    /// The slot the entry occupied when the snapshot was taken.
    pub slot: usize,
    /// The entry's hit count when the snapshot was taken.
    pub hits: u64,
}

/// Ring contents in ring order from the writer cursor (oldest-remaining
/// entry first), captured by the worker between instructions.
///
/// Snapshots are for diagnostics and tests; they say nothing about keys whose
/// insertion is still in flight.
#[derive(Debug, Clone)]
pub struct RingSnapshot<K, V> {
    entries: Vec<SnapshotEntry<K, V>>,
}

impl<K, V> RingSnapshot<K, V> {
    pub(crate) fn new(entries: Vec<SnapshotEntry<K, V>>) -> Self {
        Self { entries }
    }

    /// Returns the number of occupied slots captured.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the ring held no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the captured entries, oldest-remaining first.
    #[inline]
    pub fn entries(&self) -> &[SnapshotEntry<K, V>] {
        &self.entries
    }

    /// Iterates over the captured keys, oldest-remaining first.
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.entries.iter().map(|entry| &entry.key)
    }
}

impl<K, V> Default for RingSnapshot<K, V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K, V> fmt::Display for RingSnapshot<K, V>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (position, entry) in self.entries.iter().enumerate() {
            if position > 0 {
                write!(f, ", ")?;
            }
            write!(
                f,
                "{{ key: {:?}, value: {:?}, hits: {} }}",
                entry.key, entry.value, entry.hits
            )?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot_renders_brackets() {
        let snapshot: RingSnapshot<&str, u32> = RingSnapshot::default();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.to_string(), "[]");
    }

    #[test]
    fn snapshot_renders_entries_in_order() {
        let snapshot = RingSnapshot::new(vec![
            SnapshotEntry {
                key: "a",
                value: Arc::new(1),
                slot: 3,
                hits: 2,
            },
            SnapshotEntry {
                key: "b",
                value: Arc::new(2),
                slot: 4,
                hits: 0,
            },
        ]);

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.keys().copied().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(
            snapshot.to_string(),
            "[{ key: \"a\", value: 1, hits: 2 }, { key: \"b\", value: 2, hits: 0 }]"
        );
    }
}
