//! Value pool with slot reuse
//!
//! All values of one VM, global or local, live in a single growable pool.
//! Released slots go onto a freelist and are handed out again before the
//! pool grows. Each entry carries a generation counter so that stale
//! [`Slot`] handles are detected instead of silently aliasing new data.
//!
//! # Invariants
//! - A slot is live iff its entry holds a value and the handle's generation
//!   matches the entry's.
//! - Every index on the freelist refers to an empty entry.
//! - Growth never invalidates a handle; the pool is only ever accessed by
//!   slot, never through a cached reference.
//!
//! The pool can also keep a journal of allocations; the evaluator uses it to
//! find the slots a statement created so it can reclaim the unreachable ones.

mod slot;

pub use slot::Slot;

use tracing::trace;

use crate::runtime::value::{Value, ValueKind};
use crate::vm::{VMError, VMResult};

#[derive(Debug)]
struct Entry {
    generation: u32,
    value: Option<Value>,
}

/// Allocation counters, mostly useful to tests and host diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Total successful allocations
    pub allocated: usize,
    /// Allocations served from the freelist
    pub reused: usize,
    /// Total successful releases
    pub released: usize,
    /// String payloads allocated
    pub strings_allocated: usize,
    /// String payloads freed by release
    pub strings_released: usize,
}

/// Growable array of values indexed by [`Slot`]
#[derive(Debug, Default)]
pub struct ValuePool {
    entries: Vec<Entry>,
    free: Vec<u32>,
    live: usize,
    stats: PoolStats,
    /// Slots allocated while at least one journal is open
    journal: Vec<Slot>,
    open_journals: usize,
}

impl ValuePool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pool with room for `capacity` slots before the first growth
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Store a value, reusing a released slot when one is available
    pub fn allocate(
        &mut self,
        value: Value,
    ) -> Slot {
        if matches!(value, Value::String(_)) {
            self.stats.strings_allocated += 1;
        }
        self.stats.allocated += 1;
        self.live += 1;

        if let Some(index) = self.free.pop() {
            let entry = &mut self.entries[index as usize];
            debug_assert!(entry.value.is_none());
            entry.value = Some(value);
            self.stats.reused += 1;
            let slot = Slot::new(index, entry.generation);
            trace!(%slot, "reuse slot");
            self.note(slot);
            return slot;
        }

        // Vec growth doubles the backing storage; handles stay valid.
        let index = self.entries.len() as u32;
        self.entries.push(Entry {
            generation: 0,
            value: Some(value),
        });
        let slot = Slot::new(index, 0);
        trace!(%slot, "new slot");
        self.note(slot);
        slot
    }

    fn note(
        &mut self,
        slot: Slot,
    ) {
        if self.open_journals > 0 {
            self.journal.push(slot);
        }
    }

    /// Start recording allocations. Journals nest; the returned mark must be
    /// passed to [`end_journal`](Self::end_journal).
    pub fn begin_journal(&mut self) -> usize {
        self.open_journals += 1;
        self.journal.len()
    }

    /// Stop recording and return every slot allocated since `mark`
    pub fn end_journal(
        &mut self,
        mark: usize,
    ) -> Vec<Slot> {
        self.open_journals = self.open_journals.saturating_sub(1);
        self.journal.split_off(mark.min(self.journal.len()))
    }

    /// Hand slots back to the enclosing journal, if any
    pub fn record(
        &mut self,
        slots: &[Slot],
    ) {
        if self.open_journals > 0 {
            self.journal.extend_from_slice(slots);
        }
    }

    /// Release a slot and free its payload.
    ///
    /// Releasing a slot that is out of range, already free, or from an older
    /// generation fails with `InvalidHandle`.
    pub fn release(
        &mut self,
        slot: Slot,
    ) -> VMResult<()> {
        let entry = self
            .entries
            .get_mut(slot.index())
            .filter(|e| e.generation == slot.generation())
            .ok_or(VMError::InvalidHandle(slot))?;
        let value = entry.value.take().ok_or(VMError::InvalidHandle(slot))?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(slot.index() as u32);
        self.live -= 1;
        self.stats.released += 1;

        if matches!(value, Value::String(_)) {
            self.stats.strings_released += 1;
        }
        trace!(%slot, kind = %value.kind(), "release slot");
        drop(value);
        Ok(())
    }

    /// Borrow the value stored in a live slot
    pub fn get(
        &self,
        slot: Slot,
    ) -> VMResult<&Value> {
        self.entries
            .get(slot.index())
            .filter(|e| e.generation == slot.generation())
            .and_then(|e| e.value.as_ref())
            .ok_or(VMError::InvalidHandle(slot))
    }

    /// Mutably borrow the value stored in a live slot
    pub fn get_mut(
        &mut self,
        slot: Slot,
    ) -> VMResult<&mut Value> {
        self.entries
            .get_mut(slot.index())
            .filter(|e| e.generation == slot.generation())
            .and_then(|e| e.value.as_mut())
            .ok_or(VMError::InvalidHandle(slot))
    }

    /// Overwrite the value of a live slot, returning the previous value
    pub fn replace(
        &mut self,
        slot: Slot,
        value: Value,
    ) -> VMResult<Value> {
        let current = self.get_mut(slot)?;
        Ok(std::mem::replace(current, value))
    }

    /// Tag of the value in a live slot
    pub fn kind(
        &self,
        slot: Slot,
    ) -> VMResult<ValueKind> {
        self.get(slot).map(Value::kind)
    }

    /// Check if a handle refers to a live slot
    pub fn is_live(
        &self,
        slot: Slot,
    ) -> bool {
        self.get(slot).is_ok()
    }

    /// Number of live slots
    pub fn len(&self) -> usize {
        self.live
    }

    /// Check if no slot is live
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of slots ever created (live or free)
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Number of slots waiting on the freelist
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    /// Iterate over all live slots in index order
    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.entries.iter().enumerate().filter_map(|(i, e)| {
            e.value
                .as_ref()
                .map(|_| Slot::new(i as u32, e.generation))
        })
    }
}

#[cfg(test)]
mod tests;
