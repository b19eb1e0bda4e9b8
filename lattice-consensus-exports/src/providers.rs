// Copyright (c) 2023 MASSA LABS <info@massa.net>

use lattice_models::block_id::BlockId;
use lattice_models::commitment::Commitment;
use lattice_models::commitment_id::CommitmentId;
use lattice_models::slot::Slot;
use lattice_time::LatticeTime;

/// Lookup of the commitments this node has produced locally. Implemented by
/// the notarization pipeline.
pub trait CommitmentProvider: Send + Sync {
    /// Returns the commitment sealed for `slot`, or `None` when that slot has
    /// not been committed locally yet.
    fn commitment(&self, slot: Slot) -> Option<Commitment>;
}

/// A root block: a synthetic anchor from an already-committed slot,
/// implicitly solid, below which the DAG may prune freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootBlock {
    /// id of the anchor block
    pub id: BlockId,
    /// the commitment the anchor was issued under
    pub slot_commitment_id: CommitmentId,
    /// issuing time of the anchor
    pub issuing_time: LatticeTime,
}

/// Provider of root blocks, updated through commitment finalisation and
/// read-only from the DAG's perspective.
pub trait RootBlockProvider: Send + Sync {
    /// Returns whether the id denotes a root block
    fn is_root_block(&self, id: &BlockId) -> bool;

    /// Returns the root block for the id, if it is one
    fn root_block(&self, id: &BlockId) -> Option<RootBlock>;
}
