// Copyright (c) 2023 MASSA LABS <info@massa.net>

use lattice_models::slot::Slot;

/// Tracks the highest slot that has been evicted so far. All in-memory state
/// at or below this slot may be dropped, root anchors excepted.
#[derive(Debug, Clone, Default)]
pub struct EvictionIndex {
    last_evicted: Option<Slot>,
}

impl EvictionIndex {
    /// Creates an index with no evicted slot yet
    pub fn new() -> Self {
        Self::default()
    }

    /// First slot that has not been evicted yet
    pub fn next_index(&self) -> Slot {
        match self.last_evicted {
            Some(slot) => slot.next(),
            None => Slot::min(),
        }
    }

    /// The highest evicted slot, if any
    pub fn last_evicted(&self) -> Option<Slot> {
        self.last_evicted
    }

    /// Returns whether the given slot has already been evicted
    pub fn is_evicted(&self, slot: Slot) -> bool {
        match self.last_evicted {
            Some(last) => slot <= last,
            None => false,
        }
    }

    /// Records that `slot` has been evicted. The index only moves forward.
    pub fn mark_evicted(&mut self, slot: Slot) {
        match self.last_evicted {
            Some(last) if slot <= last => {}
            _ => self.last_evicted = Some(slot),
        }
    }
}
