//! The background worker: sole mutator of the ring.
//!
//! Caller threads never touch ring storage. They enqueue instructions; the
//! worker drains them in order, repositions or clears slots, and runs the
//! batched eviction pass when an insertion lands on an occupied slot.
//!
//! ## Instruction Flow
//!
//! ```text
//!   recv(command)
//!        │
//!        ▼
//!   ┌──────────────────────────────────────────────────────────────────┐
//!   │ Entry has a known slot index?                                    │
//!   │   YES → seek search cursor there; clear the slot if it still     │
//!   │         holds this entry (token match); bump the hit counter     │
//!   │   NO  → entry was never placed; nothing to clear                 │
//!   └──────────────────────────────────────────────────────────────────┘
//!        │
//!        ▼
//!   ┌──────────────────────────────────────────────────────────────────┐
//!   │ Evict    → done                                                  │
//!   │ Insert   → place at the writer cursor                            │
//!   │ Promote  → place at the writer cursor, unless the index map has  │
//!   │            moved on to a newer entry for the key                 │
//!   └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Batched Eviction
//!
//! When the writer cursor lands on an occupied slot the ring is full at the
//! write head. Instead of evicting exactly one victim, the worker clears up
//! to 20% of capacity in a single pass under one index-map lock acquisition,
//! so the next several insertions find their slot already empty and pay no
//! lock traffic at all. Victims are unmapped with a token-checked delete: a
//! key that was superseded since the victim was placed keeps its newer
//! mapping.
//!
//! A processing failure is reported to the diagnostic sink and the worker
//! continues with the next instruction; one bad message never stops the
//! pipeline.

use std::hash::Hash;
use std::sync::Arc;

use crossbeam_channel::Receiver;

use crate::cache::command::{Command, RingSnapshot, SnapshotEntry};
use crate::cache::entry::CacheEntry;
use crate::cache::index::KeyIndex;
use crate::cache::sink::DiagnosticSink;
use crate::ds::ring::{RingBuffer, Slot, SlotCursor};
use crate::error::WorkerError;
use crate::metrics::CounterSet;

/// Divisor applied to capacity for the eviction batch size (20%).
const EVICTION_BATCH_DIVISOR: usize = 5;

pub(crate) struct Worker<K, V> {
    ring: RingBuffer<Arc<CacheEntry<K, V>>>,
    index: Arc<KeyIndex<K, V>>,
    commands: Receiver<Command<K, V>>,
    writer: SlotCursor,
    search: SlotCursor,
    sink: Arc<dyn DiagnosticSink>,
    counters: Arc<CounterSet>,
}

impl<K, V> Worker<K, V>
where
    K: Eq + Hash + Clone,
{
    pub(crate) fn new(
        capacity: usize,
        index: Arc<KeyIndex<K, V>>,
        commands: Receiver<Command<K, V>>,
        sink: Arc<dyn DiagnosticSink>,
        counters: Arc<CounterSet>,
    ) -> Self {
        let ring = RingBuffer::new(capacity);
        let writer = ring.cursor();
        let search = ring.cursor();
        Self {
            ring,
            index,
            commands,
            writer,
            search,
            sink,
            counters,
        }
    }

    /// Drains the instruction queue until every sender is gone.
    pub(crate) fn run(&mut self) {
        while let Ok(command) = self.commands.recv() {
            if let Err(error) = self.process(command) {
                self.sink.report(&error);
            }
        }
    }

    fn process(&mut self, command: Command<K, V>) -> Result<(), WorkerError> {
        match command {
            Command::Promote(entry) => {
                self.clear_previous_placement(&entry)?;
                // The entry may have been evicted or superseded between the
                // caller's lookup and now; re-placing it would leave a ring
                // slot with no index-map counterpart.
                if self.index.is_current(entry.key(), entry.token()) {
                    self.place_at_tail(entry);
                }
                Ok(())
            },
            Command::Insert(entry) => {
                self.clear_previous_placement(&entry)?;
                self.place_at_tail(entry);
                Ok(())
            },
            Command::Evict(entry) => self.clear_previous_placement(&entry),
            Command::Snapshot(reply) => {
                // The requester may have stopped waiting; that is not an error.
                let _ = reply.send(self.snapshot());
                Ok(())
            },
        }
    }

    /// Removes the entry's old physical placement, if it still holds it.
    ///
    /// Clearing an already-empty slot is a no-op. A slot occupied by a
    /// different entry (the position was recycled after this entry left the
    /// ring) is left untouched.
    fn clear_previous_placement(
        &mut self,
        entry: &Arc<CacheEntry<K, V>>,
    ) -> Result<(), WorkerError> {
        let Some(position) = entry.slot() else {
            return Ok(());
        };
        if position >= self.ring.capacity() {
            return Err(WorkerError::new(format!(
                "slot index {position} out of range for capacity {}",
                self.ring.capacity()
            )));
        }

        self.search.seek(position);
        let still_placed = self
            .ring
            .slot(self.search.index())
            .value()
            .is_some_and(|occupant| occupant.token() == entry.token());
        if still_placed {
            self.ring.clear(self.search.index());
        }
        entry.record_hit();
        Ok(())
    }

    /// Places the entry at the writer cursor and advances it, evicting a
    /// batch first if the cursor's slot is occupied.
    fn place_at_tail(&mut self, entry: Arc<CacheEntry<K, V>>) {
        if self.ring.is_occupied(self.writer.index()) {
            self.evict_batch();
        }
        entry.set_slot(self.writer.index());
        self.ring.place(self.writer.index(), entry);
        self.writer.advance();
    }

    /// Evicts up to `max(1, capacity / 5)` occupied slots in one pass under a
    /// single index-map lock acquisition, starting at the writer cursor.
    ///
    /// Already-empty slots are skipped without counting against the batch;
    /// the scan stops after one full revolution regardless.
    fn evict_batch(&mut self) {
        let capacity = self.ring.capacity();
        let batch = (capacity / EVICTION_BATCH_DIVISOR).max(1);
        let mut scan = self.writer;
        let mut evicted = 0usize;

        let mut map = self.index.write();
        for _ in 0..capacity {
            if evicted == batch {
                break;
            }
            if let Slot::Occupied(victim) = self.ring.clear(scan.index()) {
                KeyIndex::compare_and_delete(&mut map, victim.key(), victim.token());
                self.counters.inc_eviction();
                evicted += 1;
            }
            scan.advance();
        }
        drop(map);

        tracing::trace!(target: "ringcache", evicted, batch, "applied eviction batch");
    }

    /// Captures ring contents in ring order from the writer cursor, so the
    /// oldest remaining entry comes first.
    fn snapshot(&self) -> RingSnapshot<K, V> {
        let mut walk = self.writer;
        let mut entries = Vec::with_capacity(self.ring.len());
        for _ in 0..self.ring.capacity() {
            if let Some(entry) = self.ring.slot(walk.index()).value() {
                entries.push(SnapshotEntry {
                    key: entry.key().clone(),
                    value: entry.shared_value(),
                    slot: walk.index(),
                    hits: entry.hits(),
                });
            }
            walk.advance();
        }
        RingSnapshot::new(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crossbeam_channel::{Sender, unbounded};
    use parking_lot::Mutex;

    struct RecordingSink(Mutex<Vec<WorkerError>>);

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self(Mutex::new(Vec::new())))
        }

        fn reports(&self) -> Vec<WorkerError> {
            self.0.lock().clone()
        }
    }

    impl DiagnosticSink for RecordingSink {
        fn report(&self, error: &WorkerError) {
            self.0.lock().push(error.clone());
        }
    }

    struct Harness {
        tx: Sender<Command<&'static str, u32>>,
        worker: Worker<&'static str, u32>,
        index: Arc<KeyIndex<&'static str, u32>>,
        sink: Arc<RecordingSink>,
        counters: Arc<CounterSet>,
        next_token: u64,
    }

    impl Harness {
        fn new(capacity: usize) -> Self {
            let index = Arc::new(KeyIndex::with_capacity(capacity));
            let sink = RecordingSink::new();
            let counters = Arc::new(CounterSet::default());
            let (tx, rx) = unbounded();
            let worker = Worker::new(capacity, index.clone(), rx, sink.clone(), counters.clone());
            Self {
                tx,
                worker,
                index,
                sink,
                counters,
                next_token: 0,
            }
        }

        fn entry(&mut self, key: &'static str, value: u32) -> Arc<CacheEntry<&'static str, u32>> {
            let token = self.next_token;
            self.next_token += 1;
            Arc::new(CacheEntry::new(key, value, token))
        }

        /// Installs into the map and enqueues the insert, like `set` does.
        fn set(&mut self, key: &'static str, value: u32) -> Arc<CacheEntry<&'static str, u32>> {
            let entry = self.entry(key, value);
            if let Some(previous) = self.index.write().insert(key, entry.clone()) {
                self.tx.send(Command::Evict(previous)).unwrap();
            }
            self.tx.send(Command::Insert(entry.clone())).unwrap();
            entry
        }

        /// Closes the queue and drains the worker to quiescence.
        fn drain(mut self) -> Worker<&'static str, u32> {
            drop(self.tx);
            self.worker.run();
            self.worker
        }
    }

    fn assert_map_ring_consistent(worker: &Worker<&'static str, u32>) {
        worker.ring.debug_validate_invariants();
        let mut occupied = 0usize;
        let mut walk = worker.ring.cursor();
        for _ in 0..worker.ring.capacity() {
            if let Some(entry) = worker.ring.slot(walk.index()).value() {
                occupied += 1;
                assert_eq!(entry.slot(), Some(walk.index()));
                assert!(worker.index.is_current(entry.key(), entry.token()));
            }
            walk.advance();
        }
        assert_eq!(worker.index.len(), occupied);
    }

    #[test]
    fn inserts_fill_slots_in_order() {
        let mut harness = Harness::new(5);
        harness.set("a", 1);
        harness.set("b", 2);
        harness.set("c", 3);

        let worker = harness.drain();
        assert_eq!(worker.ring.len(), 3);
        assert_eq!(worker.writer.index(), 3);
        let keys: Vec<_> = worker.snapshot().keys().copied().collect();
        assert_eq!(keys, ["a", "b", "c"]);
        assert_map_ring_consistent(&worker);
    }

    #[test]
    fn wraparound_keeps_only_the_newest_entries() {
        let keys = [
            "k0", "k1", "k2", "k3", "k4", "k5", "k6", "k7", "k8", "k9",
        ];
        let mut harness = Harness::new(5);
        for (position, key) in keys.into_iter().enumerate() {
            harness.set(key, position as u32);
        }

        let worker = harness.drain();
        let remaining: Vec<_> = worker.snapshot().keys().copied().collect();
        assert_eq!(remaining, ["k5", "k6", "k7", "k8", "k9"]);
        assert_map_ring_consistent(&worker);
    }

    #[test]
    fn batch_eviction_frees_a_run_of_slots() {
        let mut harness = Harness::new(10);
        for (position, key) in [
            "k0", "k1", "k2", "k3", "k4", "k5", "k6", "k7", "k8", "k9",
        ]
        .into_iter()
        .enumerate()
        {
            harness.set(key, position as u32);
        }
        // the ring is full; this insertion triggers one batch of 2
        harness.set("k10", 10);
        let counters = harness.counters.clone();

        let worker = harness.drain();
        assert_eq!(counters.snapshot().evictions, 2);
        assert_eq!(worker.ring.len(), 9);
        // slot 1 was cleared by the batch but not reused yet
        assert!(!worker.ring.is_occupied(1));
        assert_map_ring_consistent(&worker);
    }

    #[test]
    fn promote_moves_entry_to_the_write_head() {
        let mut harness = Harness::new(5);
        let promoted = harness.set("a", 1);
        harness.set("b", 2);
        harness.set("c", 3);
        harness.tx.send(Command::Promote(promoted.clone())).unwrap();

        let worker = harness.drain();
        // cleared from slot 0, re-placed at the writer position (3)
        assert_eq!(promoted.slot(), Some(3));
        assert_eq!(promoted.hits(), 1);
        assert!(!worker.ring.is_occupied(0));
        assert_map_ring_consistent(&worker);
    }

    #[test]
    fn promote_of_superseded_entry_is_not_replaced() {
        let mut harness = Harness::new(5);
        let stale = harness.set("a", 1);
        harness.set("a", 2);
        harness.tx.send(Command::Promote(stale)).unwrap();

        let worker = harness.drain();
        // only the newer generation remains
        assert_eq!(worker.ring.len(), 1);
        let snapshot = worker.snapshot();
        assert_eq!(snapshot.entries()[0].value.as_ref(), &2);
        assert_map_ring_consistent(&worker);
    }

    #[test]
    fn evict_clears_without_replacing() {
        let mut harness = Harness::new(5);
        let entry = harness.set("a", 1);
        harness.index.write().remove(&"a");
        harness.tx.send(Command::Evict(entry.clone())).unwrap();

        let worker = harness.drain();
        assert!(worker.ring.is_empty());
        assert_eq!(entry.hits(), 1);
        assert_map_ring_consistent(&worker);
    }

    #[test]
    fn out_of_range_slot_is_reported_and_skipped() {
        let mut harness = Harness::new(5);
        let poisoned = harness.entry("poison", 0);
        poisoned.set_slot(99);
        harness.tx.send(Command::Promote(poisoned)).unwrap();
        // the pipeline must keep going after the failure
        harness.set("a", 1);
        let sink = harness.sink.clone();

        let worker = harness.drain();
        let reports = sink.reports();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].message().contains("out of range"));
        assert_eq!(worker.ring.len(), 1);
        assert_map_ring_consistent(&worker);
    }

    #[test]
    fn snapshot_starts_at_the_oldest_remaining_entry() {
        let mut harness = Harness::new(3);
        harness.set("a", 1);
        harness.set("b", 2);
        harness.set("c", 3);
        harness.set("d", 4);

        let worker = harness.drain();
        // "a" was evicted; the writer sits at slot 1, so "b" is oldest
        let keys: Vec<_> = worker.snapshot().keys().copied().collect();
        assert_eq!(keys, ["b", "c", "d"]);
    }

    #[test]
    fn capacity_one_ring_churns_in_place() {
        let mut harness = Harness::new(1);
        harness.set("a", 1);
        harness.set("b", 2);
        harness.set("c", 3);

        let worker = harness.drain();
        assert_eq!(worker.ring.len(), 1);
        let keys: Vec<_> = worker.snapshot().keys().copied().collect();
        assert_eq!(keys, ["c"]);
        assert_map_ring_consistent(&worker);
    }
}
