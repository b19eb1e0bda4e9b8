// Copyright (c) 2023 MASSA LABS <info@massa.net>

use lattice_models::prehash::{PreHashMap, PreHashed};
use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};
use std::hash::Hash;
use std::sync::Arc;

struct Entry {
    mutex: Arc<Mutex<()>>,
    waiters: usize,
}

/// A lock table with one mutex per id, so independent vertices of a DAG can
/// be locked without contending on a single lock.
///
/// A holder of a child lock may acquire the parent lock: edges always point
/// towards lower-or-equal slots, so that acquisition order cannot cycle.
/// Holding two sibling locks at once is not allowed.
pub struct DagMutex<K: PreHashed + Eq + Hash + Clone> {
    entries: Mutex<PreHashMap<K, Entry>>,
}

impl<K: PreHashed + Eq + Hash + Clone> Default for DagMutex<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: PreHashed + Eq + Hash + Clone> DagMutex<K> {
    /// Creates an empty lock table
    pub fn new() -> Self {
        DagMutex {
            entries: Mutex::new(PreHashMap::default()),
        }
    }

    /// Locks the entry for `key`, creating it on first use. The entry is
    /// dropped again once the last guard for the key is released.
    pub fn lock(&self, key: K) -> DagMutexGuard<'_, K> {
        let mutex = {
            let mut entries = self.entries.lock();
            let entry = entries.entry(key.clone()).or_insert_with(|| Entry {
                mutex: Arc::new(Mutex::new(())),
                waiters: 0,
            });
            entry.waiters += 1;
            entry.mutex.clone()
        };
        let guard = mutex.lock_arc();
        DagMutexGuard {
            owner: self,
            key,
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn entry_count(&self) -> usize {
        self.entries.lock().len()
    }
}

/// RAII guard returned by [`DagMutex::lock`]
pub struct DagMutexGuard<'a, K: PreHashed + Eq + Hash + Clone> {
    owner: &'a DagMutex<K>,
    key: K,
    guard: Option<ArcMutexGuard<RawMutex, ()>>,
}

impl<'a, K: PreHashed + Eq + Hash + Clone> Drop for DagMutexGuard<'a, K> {
    fn drop(&mut self) {
        // release the per-id mutex before touching the table so waiters can
        // proceed as soon as possible
        drop(self.guard.take());
        let mut entries = self.owner.entries.lock();
        if let Some(entry) = entries.get_mut(&self.key) {
            entry.waiters -= 1;
            if entry.waiters == 0 {
                entries.remove(&self.key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_hash::Hash;
    use lattice_models::commitment_id::CommitmentId;
    use lattice_models::slot::Slot;
    use std::thread;

    fn id(slot: u64, seed: &str) -> CommitmentId {
        CommitmentId::new(Slot(slot), Hash::compute_from(seed.as_bytes()))
    }

    #[test]
    fn test_independent_ids_do_not_contend() {
        let table = Arc::new(DagMutex::new());
        let _a = table.lock(id(1, "a"));
        // locking a different id from another thread must not block
        let table_clone = table.clone();
        let handle = thread::spawn(move || {
            let _b = table_clone.lock(id(2, "b"));
        });
        handle.join().unwrap();
    }

    #[test]
    fn test_parent_and_child_lockable_together() {
        let table = DagMutex::new();
        let _child = table.lock(id(2, "child"));
        let _parent = table.lock(id(1, "parent"));
        assert_eq!(table.entry_count(), 2);
    }

    #[test]
    fn test_entries_are_cleaned_up() {
        let table = DagMutex::new();
        {
            let _a = table.lock(id(1, "a"));
            assert_eq!(table.entry_count(), 1);
        }
        assert_eq!(table.entry_count(), 0);
    }

    #[test]
    fn test_same_id_is_mutually_exclusive() {
        let table = Arc::new(DagMutex::new());
        let counter = Arc::new(Mutex::new(0u64));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let table = table.clone();
            let counter = counter.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    let _g = table.lock(id(1, "shared"));
                    let mut value = counter.lock();
                    *value += 1;
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(*counter.lock(), 400);
        assert_eq!(table.entry_count(), 0);
    }
}
