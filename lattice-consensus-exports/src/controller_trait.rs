// Copyright (c) 2023 MASSA LABS <info@massa.net>

use crate::block_status::BlockStatus;
use crate::error::ConsensusResult;
use crate::events::Fork;
use lattice_models::block::Block;
use lattice_models::block_id::BlockId;
use lattice_models::commitment::Commitment;
use lattice_models::commitment_id::CommitmentId;
use lattice_models::node::PeerId;
use lattice_models::slot::Slot;

/// Interface of the consensus core offered to the rest of the node.
///
/// Mutations are forwarded as commands to the worker thread and processed in
/// order of arrival; reads go through the shared state and may observe
/// commands that are still in flight.
pub trait ConsensusController: Send + Sync {
    /// Register a block received from gossip.
    fn register_block(&self, block: Block);

    /// Register a commitment received from a peer. Fork detection runs
    /// against the source peer.
    fn register_commitment_from_peer(&self, commitment: Commitment, source: PeerId);

    /// Register a commitment without fork detection, e.g. one extracted from
    /// a snapshot candidate.
    fn register_candidate_commitment(&self, commitment: Commitment);

    /// Notify the core that the local node committed a slot. The chain
    /// manager adopts the commitment and parked future blocks for that slot
    /// become eligible for solidification.
    fn notify_slot_committed(&self, commitment: Commitment);

    /// Switch the main chain to the chain containing the given head.
    fn switch_main_chain(&self, head: CommitmentId);

    /// Drop all in-memory state up to and including the given slot.
    fn evict_until(&self, slot: Slot);

    /// Mark a block as orphaned.
    fn mark_block_orphaned(&self, block_id: BlockId);

    /// Get the statuses of the given blocks, in the same order.
    fn get_block_statuses(&self, ids: &[BlockId]) -> Vec<BlockStatus>;

    /// Get the current root commitment.
    fn get_root_commitment(&self) -> Commitment;

    /// Get the id of the forking point of the chain holding the given
    /// commitment, if known.
    fn get_chain_of(&self, id: CommitmentId) -> Option<CommitmentId>;

    /// Get the fork recorded for the given forking point, if any.
    fn get_fork_by_forking_point(&self, forking_point: CommitmentId) -> Option<Fork>;

    /// Walk `prev_id` links from the given commitment, returning up to
    /// `amount` commitments (most recent first).
    fn get_commitment_chain(
        &self,
        id: CommitmentId,
        amount: usize,
    ) -> ConsensusResult<Vec<Commitment>>;

    /// Returns a boxed clone of self
    fn clone_box(&self) -> Box<dyn ConsensusController>;
}

impl Clone for Box<dyn ConsensusController> {
    fn clone(&self) -> Box<dyn ConsensusController> {
        self.clone_box()
    }
}

/// Stop handle of the consensus worker thread.
pub trait ConsensusManager {
    /// Stop the worker: in-flight commands are drained, the commitment
    /// requester stops ticking, and the thread is joined.
    fn stop(&mut self);
}
