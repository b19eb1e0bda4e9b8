// Copyright (c) 2023 MASSA LABS <info@massa.net>
//! Hash-table specializations for identifier keys that already carry a
//! content hash (`BlockId`, `CommitmentId`, `PeerId`, `ValidatorId`).

use std::collections::{HashMap, HashSet};
use std::hash::{BuildHasherDefault, Hasher};
use std::marker::PhantomData;

impl PreHashed for lattice_hash::Hash {}

/// Marker for key types whose `Hash` impl ends by writing at least 8 bytes of
/// an already uniformly distributed content hash. The ids of this workspace
/// qualify: they write their slot index first and their content hash last.
pub trait PreHashed {}

/// Hasher for `PreHashed` keys: instead of re-hashing, it keeps the last 8
/// bytes of the most recent sufficiently long write. Structured id prefixes
/// such as the slot index are overwritten by the trailing content hash and
/// cannot bias bucket assignment; writes shorter than 8 bytes are ignored.
pub struct IdHasher<T: PreHashed> {
    hash: u64,
    marker: PhantomData<T>,
}

impl<T: PreHashed> Default for IdHasher<T> {
    fn default() -> Self {
        IdHasher {
            hash: 0,
            marker: PhantomData,
        }
    }
}

impl<T: PreHashed> Hasher for IdHasher<T> {
    #[inline]
    fn finish(&self) -> u64 {
        self.hash
    }

    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        if let Some(tail) = bytes.len().checked_sub(8) {
            let mut word = [0u8; 8];
            word.copy_from_slice(&bytes[tail..]);
            self.hash = u64::from_le_bytes(word);
        }
    }
}

/// `BuildHasherDefault` specialization for `IdHasher`
pub type BuildIdHasher<T> = BuildHasherDefault<IdHasher<T>>;

/// `HashMap` keyed by pre-hashed ids, skipping the default re-hashing pass
pub type PreHashMap<K, V> = HashMap<K, V, BuildIdHasher<K>>;

/// `HashSet` of pre-hashed ids, skipping the default re-hashing pass
pub type PreHashSet<T> = HashSet<T, BuildIdHasher<T>>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_id::BlockId;
    use crate::slot::Slot;
    use lattice_hash::Hash;

    #[test]
    fn test_slot_prefix_does_not_drive_the_bucket() {
        // two ids differing only in slot collide on the hasher (the bucket
        // comes from the content-hash tail) but stay distinct entries via Eq
        let content = Hash::compute_from(b"same content");
        let a = BlockId::new(Slot(1), content);
        let b = BlockId::new(Slot(2), content);
        let mut set: PreHashSet<BlockId> = PreHashSet::default();
        assert!(set.insert(a));
        assert!(set.insert(b));
        assert!(set.contains(&a));
        assert!(set.contains(&b));
    }
}
