// Copyright (c) 2023 MASSA LABS <info@massa.net>

use lattice_models::block_id::BlockId;
use lattice_models::commitment::Commitment;
use lattice_models::node::PeerId;

/// Emitted when a block is marked invalid, with the reason of the rejection.
#[derive(Debug, Clone)]
pub struct BlockInvalidEvent {
    /// the invalid block
    pub block_id: BlockId,
    /// why the block was rejected
    pub reason: String,
}

/// A fork of the commitment chain announced by a peer: the chain diverges
/// from the main chain at `forking_point` and currently extends up to
/// `commitment`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fork {
    /// peer the forked chain was received from
    pub source: PeerId,
    /// latest observed commitment of the forked chain
    pub commitment: Commitment,
    /// first commitment diverging from the main chain
    pub forking_point: Commitment,
}
