// Copyright (c) 2023 MASSA LABS <info@massa.net>

use crate::{EvictionIndex, IndexedStorage};
use lattice_hash::Hash;
use lattice_models::block_id::BlockId;
use lattice_models::slot::Slot;
use std::sync::Arc;

fn id(slot: u64, seed: &str) -> BlockId {
    BlockId::new(Slot(slot), Hash::compute_from(seed.as_bytes()))
}

#[test]
fn test_get_or_create_is_idempotent() {
    let storage: IndexedStorage<BlockId, Arc<u64>> = IndexedStorage::new();
    let key = id(1, "a");
    let (v1, created1) = storage.get_or_create(Slot(1), key, || Arc::new(7));
    let (v2, created2) = storage.get_or_create(Slot(1), key, || Arc::new(8));
    assert!(created1);
    assert!(!created2);
    assert!(Arc::ptr_eq(&v1, &v2));
    assert_eq!(*v2, 7);
}

#[test]
fn test_eviction_drops_whole_slot() {
    let storage: IndexedStorage<BlockId, u64> = IndexedStorage::new();
    storage.get_or_create(Slot(1), id(1, "a"), || 1);
    storage.get_or_create(Slot(1), id(1, "b"), || 2);
    storage.get_or_create(Slot(2), id(2, "c"), || 3);

    let evicted = storage.evict(Slot(1)).unwrap();
    assert_eq!(evicted.len(), 2);
    assert_eq!(storage.slot_len(Slot(1)), 0);
    assert_eq!(storage.get(Slot(2), &id(2, "c")), Some(3));
    assert!(storage.evict(Slot(1)).is_none());
}

#[test]
fn test_delete_single_entry() {
    let storage: IndexedStorage<BlockId, u64> = IndexedStorage::new();
    let key = id(4, "k");
    storage.get_or_create(Slot(4), key, || 9);
    assert_eq!(storage.delete(Slot(4), &key), Some(9));
    assert_eq!(storage.delete(Slot(4), &key), None);
    assert!(!storage.contains(Slot(4), &key));
}

#[test]
fn test_eviction_index_moves_forward_only() {
    let mut index = EvictionIndex::new();
    assert_eq!(index.next_index(), Slot(0));
    assert!(!index.is_evicted(Slot(0)));

    index.mark_evicted(Slot(0));
    assert_eq!(index.next_index(), Slot(1));
    assert!(index.is_evicted(Slot(0)));

    index.mark_evicted(Slot(4));
    assert_eq!(index.next_index(), Slot(5));
    assert!(index.is_evicted(Slot(3)));
    assert!(!index.is_evicted(Slot(5)));

    // moving backwards is a no-op
    index.mark_evicted(Slot(2));
    assert_eq!(index.next_index(), Slot(5));
}
