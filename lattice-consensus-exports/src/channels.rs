// Copyright (c) 2023 MASSA LABS <info@massa.net>

use crate::events::{BlockInvalidEvent, Fork};
use lattice_models::block_id::BlockId;
use lattice_models::commitment_id::CommitmentId;
use lattice_models::slot::Slot;
use tokio::sync::broadcast;

/// Event streams of the block DAG. Each stream has a single writer (the DAG)
/// and any number of subscribers obtained through `subscribe()` on the
/// senders. For any single block, `block_attached` precedes `block_solid`.
#[derive(Clone)]
pub struct BlockDagChannels {
    /// a new block was attached to the DAG
    pub block_attached: broadcast::Sender<BlockId>,
    /// a previously missing block was received and attached
    pub missing_block_attached: broadcast::Sender<BlockId>,
    /// a block was referenced as parent but is unknown
    pub block_missing: broadcast::Sender<BlockId>,
    /// the whole causal past of a block is known
    pub block_solid: broadcast::Sender<BlockId>,
    /// a block was rejected
    pub block_invalid: broadcast::Sender<BlockInvalidEvent>,
    /// a block was orphaned
    pub block_orphaned: broadcast::Sender<BlockId>,
    /// all in-memory block state of a slot was dropped
    pub slot_evicted: broadcast::Sender<Slot>,
}

impl BlockDagChannels {
    /// Creates the event streams with the given per-stream buffer capacity
    pub fn new(capacity: usize) -> Self {
        BlockDagChannels {
            block_attached: broadcast::channel(capacity).0,
            missing_block_attached: broadcast::channel(capacity).0,
            block_missing: broadcast::channel(capacity).0,
            block_solid: broadcast::channel(capacity).0,
            block_invalid: broadcast::channel(capacity).0,
            block_orphaned: broadcast::channel(capacity).0,
            slot_evicted: broadcast::channel(capacity).0,
        }
    }
}

/// Event streams of the chain manager. For any single commitment id,
/// `commitment_missing` (if emitted) precedes `missing_commitment_received`.
#[derive(Clone)]
pub struct ChainManagerChannels {
    /// a commitment was referenced as parent but is unknown
    pub commitment_missing: broadcast::Sender<CommitmentId>,
    /// a previously missing commitment was received
    pub missing_commitment_received: broadcast::Sender<CommitmentId>,
    /// a received commitment is below the root and was discarded
    pub commitment_below_root: broadcast::Sender<CommitmentId>,
    /// an unknown commitment should be requested from peers again
    pub request_commitment: broadcast::Sender<CommitmentId>,
    /// a peer produced a chain diverging from the main chain
    pub fork_detected: broadcast::Sender<Fork>,
    /// the main chain was switched to the given head
    pub main_chain_switched: broadcast::Sender<CommitmentId>,
}

impl ChainManagerChannels {
    /// Creates the event streams with the given per-stream buffer capacity
    pub fn new(capacity: usize) -> Self {
        ChainManagerChannels {
            commitment_missing: broadcast::channel(capacity).0,
            missing_commitment_received: broadcast::channel(capacity).0,
            commitment_below_root: broadcast::channel(capacity).0,
            request_commitment: broadcast::channel(capacity).0,
            fork_detected: broadcast::channel(capacity).0,
            main_chain_switched: broadcast::channel(capacity).0,
        }
    }
}

/// All event streams of the consensus core, handed to `start_consensus_worker`
/// so subscribers can be wired before the worker starts.
#[derive(Clone)]
pub struct ConsensusChannels {
    /// block DAG event streams
    pub block_dag: BlockDagChannels,
    /// chain manager event streams
    pub chain_manager: ChainManagerChannels,
}

impl ConsensusChannels {
    /// Creates all event streams with the given per-stream buffer capacity
    pub fn new(capacity: usize) -> Self {
        ConsensusChannels {
            block_dag: BlockDagChannels::new(capacity),
            chain_manager: ChainManagerChannels::new(capacity),
        }
    }
}
