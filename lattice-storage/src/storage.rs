// Copyright (c) 2023 MASSA LABS <info@massa.net>

use lattice_models::prehash::{PreHashMap, PreHashed};
use lattice_models::slot::Slot;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::hash::Hash;
use std::sync::Arc;

/// A mapping `slot -> (key -> entry)` whose hot path is bulk eviction: an
/// entire slot is dropped in one operation, freeing all its entries at once,
/// while readers of other slots proceed on the inner locks.
///
/// Values are cheap to clone (typically `Arc`s or `Copy` ids); accessors hand
/// out clones so no lock is held across caller code.
pub struct IndexedStorage<K: PreHashed + Eq + Hash + Clone, V: Clone> {
    slots: Arc<RwLock<BTreeMap<Slot, Arc<RwLock<PreHashMap<K, V>>>>>>,
}

impl<K: PreHashed + Eq + Hash + Clone, V: Clone> Clone for IndexedStorage<K, V> {
    fn clone(&self) -> Self {
        IndexedStorage {
            slots: self.slots.clone(),
        }
    }
}

impl<K: PreHashed + Eq + Hash + Clone, V: Clone> Default for IndexedStorage<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: PreHashed + Eq + Hash + Clone, V: Clone> IndexedStorage<K, V> {
    /// Creates an empty storage
    pub fn new() -> Self {
        IndexedStorage {
            slots: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    fn slot_map(&self, slot: Slot, create: bool) -> Option<Arc<RwLock<PreHashMap<K, V>>>> {
        {
            let slots = self.slots.read();
            if let Some(map) = slots.get(&slot) {
                return Some(map.clone());
            }
        }
        if !create {
            return None;
        }
        let mut slots = self.slots.write();
        Some(slots.entry(slot).or_default().clone())
    }

    /// Gets the entry for `key` in `slot`, creating it with `factory` if
    /// absent. Returns the entry and whether it was created by this call.
    pub fn get_or_create<F: FnOnce() -> V>(&self, slot: Slot, key: K, factory: F) -> (V, bool) {
        let map = self
            .slot_map(slot, true)
            .expect("slot map creation cannot fail");
        let mut map = map.write();
        match map.get(&key) {
            Some(value) => (value.clone(), false),
            None => {
                let value = factory();
                map.insert(key, value.clone());
                (value, true)
            }
        }
    }

    /// Gets the entry for `key` in `slot` if present
    pub fn get(&self, slot: Slot, key: &K) -> Option<V> {
        let map = self.slot_map(slot, false)?;
        let map = map.read();
        map.get(key).cloned()
    }

    /// Returns whether an entry exists for `key` in `slot`
    pub fn contains(&self, slot: Slot, key: &K) -> bool {
        self.get(slot, key).is_some()
    }

    /// Removes the entry for `key` in `slot`, returning it if it was present
    pub fn delete(&self, slot: Slot, key: &K) -> Option<V> {
        let map = self.slot_map(slot, false)?;
        let mut map = map.write();
        map.remove(key)
    }

    /// Atomically removes the whole inner map for `slot` and returns it, so
    /// the caller can run cleanups over the evicted entries.
    pub fn evict(&self, slot: Slot) -> Option<PreHashMap<K, V>> {
        let map = {
            let mut slots = self.slots.write();
            slots.remove(&slot)?
        };
        // this storage held the only strong reference in the common case;
        // otherwise the concurrent holder keeps the map alive until it is done
        match Arc::try_unwrap(map) {
            Ok(lock) => Some(lock.into_inner()),
            Err(shared) => Some(std::mem::take(&mut *shared.write())),
        }
    }

    /// Number of entries currently stored for `slot`
    pub fn slot_len(&self, slot: Slot) -> usize {
        self.slot_map(slot, false)
            .map(|map| map.read().len())
            .unwrap_or(0)
    }

    /// Total number of entries over all slots
    pub fn len(&self) -> usize {
        let slots = self.slots.read();
        slots.values().map(|map| map.read().len()).sum()
    }

    /// Returns whether the storage holds no entry at all
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
