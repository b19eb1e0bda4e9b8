// Copyright (c) 2023 MASSA LABS <info@massa.net>

use lattice_models::commitment_id::CommitmentId;
use lattice_models::prehash::PreHashed;
use lattice_models::slot::Slot;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// A chain is identified by its forking point: the first commitment that
/// diverged from its parent's chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChainId(pub CommitmentId);

impl PreHashed for ChainId {}

impl std::fmt::Display for ChainId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A contiguous run of commitments sharing a forking point, ordered by slot.
pub struct Chain {
    id: ChainId,
    commitments: RwLock<BTreeMap<Slot, CommitmentId>>,
}

impl Chain {
    /// Creates a chain beginning at the given forking point
    pub fn new(forking_point: CommitmentId) -> Self {
        let mut commitments = BTreeMap::new();
        commitments.insert(forking_point.slot(), forking_point);
        Chain {
            id: ChainId(forking_point),
            commitments: RwLock::new(commitments),
        }
    }

    /// Id of the chain (the id of its forking point)
    pub fn id(&self) -> ChainId {
        self.id
    }

    /// The first commitment of this chain
    pub fn forking_point(&self) -> CommitmentId {
        self.id.0
    }

    /// Registers a commitment on this chain at the slot of its id
    pub fn add_commitment(&self, id: CommitmentId) {
        self.commitments.write().insert(id.slot(), id);
    }

    /// Removes the given commitment from this chain, if it is the one
    /// registered at its slot
    pub fn remove_commitment(&self, id: &CommitmentId) {
        let mut commitments = self.commitments.write();
        if commitments.get(&id.slot()) == Some(id) {
            commitments.remove(&id.slot());
        }
    }

    /// The commitment registered at the given slot, if any
    pub fn commitment_at(&self, slot: Slot) -> Option<CommitmentId> {
        self.commitments.read().get(&slot).copied()
    }

    /// The latest commitment of this chain
    pub fn latest_commitment(&self) -> Option<CommitmentId> {
        self.commitments
            .read()
            .last_key_value()
            .map(|(_, id)| *id)
    }

    /// Drops every commitment strictly above the given slot, returning the
    /// dropped ids
    pub fn drop_commitments_after(&self, slot: Slot) -> Vec<CommitmentId> {
        let mut commitments = self.commitments.write();
        let dropped = commitments.split_off(&slot.next());
        dropped.into_values().collect()
    }

    /// Number of commitments registered on this chain
    pub fn len(&self) -> usize {
        self.commitments.read().len()
    }

    /// Returns whether the chain has no commitment
    pub fn is_empty(&self) -> bool {
        self.commitments.read().is_empty()
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let commitments = self.commitments.read();
        f.debug_struct("Chain")
            .field("id", &self.id)
            .field("len", &commitments.len())
            .field("latest", &commitments.last_key_value().map(|(_, id)| *id))
            .finish()
    }
}
