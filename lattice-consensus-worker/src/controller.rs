// Copyright (c) 2023 MASSA LABS <info@massa.net>

use crate::chain::ChainManager;
use crate::commands::ConsensusCommand;
use crate::dag::BlockDag;
use lattice_channel::sender::LatticeSender;
use lattice_consensus_exports::block_status::BlockStatus;
use lattice_consensus_exports::error::ConsensusResult;
use lattice_consensus_exports::events::Fork;
use lattice_consensus_exports::ConsensusController;
use lattice_models::block::Block;
use lattice_models::block_id::BlockId;
use lattice_models::commitment::Commitment;
use lattice_models::commitment_id::CommitmentId;
use lattice_models::node::PeerId;
use lattice_models::slot::Slot;
use std::sync::Arc;
use tracing::warn;

/// Mutations are sent as commands to the worker thread so they are processed
/// in arrival order without blocking the caller; reads go through the shared
/// state and may be slightly ahead of the command queue.
#[derive(Clone)]
pub struct ConsensusControllerImpl {
    command_sender: LatticeSender<ConsensusCommand>,
    block_dag: Arc<BlockDag>,
    chain_manager: Arc<ChainManager>,
}

impl ConsensusControllerImpl {
    pub(crate) fn new(
        command_sender: LatticeSender<ConsensusCommand>,
        block_dag: Arc<BlockDag>,
        chain_manager: Arc<ChainManager>,
    ) -> Self {
        ConsensusControllerImpl {
            command_sender,
            block_dag,
            chain_manager,
        }
    }

    fn send_command(&self, command: ConsensusCommand) {
        if let Err(err) = self.command_sender.send(command) {
            warn!("failed to send command to consensus worker: {}", err);
        }
    }
}

impl ConsensusController for ConsensusControllerImpl {
    fn register_block(&self, block: Block) {
        self.send_command(ConsensusCommand::RegisterBlock(block));
    }

    fn register_commitment_from_peer(&self, commitment: Commitment, source: PeerId) {
        self.send_command(ConsensusCommand::RegisterCommitment {
            commitment,
            source: Some(source),
        });
    }

    fn register_candidate_commitment(&self, commitment: Commitment) {
        self.send_command(ConsensusCommand::RegisterCommitment {
            commitment,
            source: None,
        });
    }

    fn notify_slot_committed(&self, commitment: Commitment) {
        self.send_command(ConsensusCommand::SlotCommitted(commitment));
    }

    fn switch_main_chain(&self, head: CommitmentId) {
        self.send_command(ConsensusCommand::SwitchMainChain(head));
    }

    fn evict_until(&self, slot: Slot) {
        self.send_command(ConsensusCommand::EvictUntil(slot));
    }

    fn mark_block_orphaned(&self, block_id: BlockId) {
        self.send_command(ConsensusCommand::MarkBlockOrphaned(block_id));
    }

    fn get_block_statuses(&self, ids: &[BlockId]) -> Vec<BlockStatus> {
        ids.iter().map(|id| self.block_dag.block_status(id)).collect()
    }

    fn get_root_commitment(&self) -> Commitment {
        self.chain_manager
            .root_commitment()
            .commitment()
            .expect("root commitment must be published")
    }

    fn get_chain_of(&self, id: CommitmentId) -> Option<CommitmentId> {
        self.chain_manager.chain_of(id).map(|chain_id| chain_id.0)
    }

    fn get_fork_by_forking_point(&self, forking_point: CommitmentId) -> Option<Fork> {
        self.chain_manager.fork_by_forking_point(&forking_point)
    }

    fn get_commitment_chain(
        &self,
        id: CommitmentId,
        amount: usize,
    ) -> ConsensusResult<Vec<Commitment>> {
        Ok(self
            .chain_manager
            .commitments(id, amount)?
            .into_iter()
            .map(|commitment| {
                commitment
                    .commitment()
                    .expect("commitments() only returns published entries")
            })
            .collect())
    }

    fn clone_box(&self) -> Box<dyn ConsensusController> {
        Box::new(self.clone())
    }
}
