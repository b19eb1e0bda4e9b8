// Copyright (c) 2023 MASSA LABS <info@massa.net>

use lattice_models::block::Block;
use lattice_models::block_id::BlockId;
use lattice_models::commitment::Commitment;
use lattice_models::commitment_id::CommitmentId;
use lattice_models::node::PeerId;
use lattice_models::slot::Slot;

/// Commands that can be processed by the consensus worker.
#[allow(clippy::large_enum_variant)]
#[derive(Debug, Clone)]
pub enum ConsensusCommand {
    /// A block arrived from gossip
    RegisterBlock(Block),
    /// A commitment arrived; `source` is set when it came from a peer and
    /// fork detection should run against it
    RegisterCommitment {
        /// the received commitment
        commitment: Commitment,
        /// peer that announced the commitment, if any
        source: Option<PeerId>,
    },
    /// The local node sealed a slot with the given commitment
    SlotCommitted(Commitment),
    /// Switch the main chain to the chain containing the given head
    SwitchMainChain(CommitmentId),
    /// Drop all in-memory state up to and including the slot
    EvictUntil(Slot),
    /// Mark a block as orphaned
    MarkBlockOrphaned(BlockId),
    /// Stop the worker
    Stop,
}
