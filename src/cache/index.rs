//! Key→entry index with locked mutation and read-side lookups.
//!
//! Every mutation of the map happens under the write lock; lookups take only
//! a shared read lock and never exclude each other. Readers are therefore
//! eventually consistent with respect to in-flight worker operations: a key
//! may be observed as present while its slot has not been written yet, or an
//! entry may still be visible moments before its eviction is applied. That
//! window is the intended trade-off, not a defect.
//!
//! The write guard is handed out as a whole so the worker can run an entire
//! eviction batch under one lock acquisition.

use std::hash::Hash;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockWriteGuard};
use rustc_hash::FxHashMap;

use crate::cache::entry::CacheEntry;

pub(crate) type EntryMap<K, V> = FxHashMap<K, Arc<CacheEntry<K, V>>>;

/// The canonical key→entry mapping.
#[derive(Debug)]
pub(crate) struct KeyIndex<K, V> {
    map: RwLock<EntryMap<K, V>>,
}

impl<K, V> KeyIndex<K, V>
where
    K: Eq + Hash,
{
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            map: RwLock::new(EntryMap::with_capacity_and_hasher(
                capacity,
                Default::default(),
            )),
        }
    }

    /// Looks up the current entry for `key` under a read lock.
    pub(crate) fn lookup(&self, key: &K) -> Option<Arc<CacheEntry<K, V>>> {
        self.map.read().get(key).cloned()
    }

    /// Returns `true` if the mapping for `key` still carries `token`.
    ///
    /// The worker uses this to detect entries superseded or evicted between a
    /// caller's lookup and the instruction being processed.
    pub(crate) fn is_current(&self, key: &K, token: u64) -> bool {
        self.map
            .read()
            .get(key)
            .is_some_and(|entry| entry.token() == token)
    }

    /// Returns the number of mapped keys.
    pub(crate) fn len(&self) -> usize {
        self.map.read().len()
    }

    /// Takes the mutation lock. All map writes go through this guard.
    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, EntryMap<K, V>> {
        self.map.write()
    }

    /// Deletes `key` from an already-locked map only if its current entry
    /// carries `expected_token`. A mismatch means a newer entry superseded
    /// the expected one, and the mapping is left alone.
    pub(crate) fn compare_and_delete(
        map: &mut EntryMap<K, V>,
        key: &K,
        expected_token: u64,
    ) -> bool {
        match map.get(key) {
            Some(current) if current.token() == expected_token => {
                map.remove(key);
                true
            },
            _ => false,
        }
    }
}
