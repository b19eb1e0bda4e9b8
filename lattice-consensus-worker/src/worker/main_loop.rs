// Copyright (c) 2023 MASSA LABS <info@massa.net>

use std::time::Instant;

use crossbeam::channel::RecvTimeoutError;
use lattice_consensus_exports::error::ConsensusError;
use lattice_time::LatticeTime;
use tracing::{info, warn};

use crate::commands::ConsensusCommand;

use super::ConsensusWorker;

enum WaitingStatus {
    Ended,
    Interrupted,
    Disconnected,
}

impl ConsensusWorker {
    /// Execute a command received from the controller.
    ///
    /// # Returns:
    /// If successful, returns true if the loop should continue, false if it
    /// should stop. An error if the command failed.
    fn manage_command(&mut self, command: ConsensusCommand) -> Result<bool, ConsensusError> {
        match command {
            ConsensusCommand::RegisterBlock(block) => {
                let block_id = block.id();
                if let Err(err) = self.block_dag.attach(block) {
                    warn!("failed to attach block {}: {}", block_id, err);
                }
                Ok(true)
            }
            ConsensusCommand::RegisterCommitment { commitment, source } => {
                match source {
                    Some(peer) => {
                        self.chain_manager
                            .process_commitment_from_source(commitment, peer);
                    }
                    None => {
                        self.chain_manager.process_candidate_commitment(commitment);
                    }
                }
                Ok(true)
            }
            ConsensusCommand::SlotCommitted(commitment) => {
                let slot = commitment.slot();
                self.chain_manager.process_commitment(commitment)?;
                self.block_dag.promote_future_blocks_until(slot);
                Ok(true)
            }
            ConsensusCommand::SwitchMainChain(head) => {
                self.chain_manager.switch_main_chain(head)?;
                Ok(true)
            }
            ConsensusCommand::EvictUntil(slot) => {
                self.chain_manager.evict_until(slot);
                self.block_dag.evict_until(slot);
                Ok(true)
            }
            ConsensusCommand::MarkBlockOrphaned(block_id) => {
                if let Some(block) = self.block_dag.block(&block_id) {
                    self.block_dag.set_orphaned(&block);
                }
                Ok(true)
            }
            ConsensusCommand::Stop => Ok(false),
        }
    }

    /// Wait for a command until `deadline`, interrupting on reception.
    fn wait_command_or_deadline(&mut self, deadline: Instant) -> WaitingStatus {
        match self.command_receiver.recv_deadline(deadline) {
            Ok(command) => match self.manage_command(command) {
                Ok(true) => WaitingStatus::Interrupted,
                Ok(false) => WaitingStatus::Disconnected,
                Err(err) => {
                    warn!("error in consensus worker: {}", err);
                    WaitingStatus::Interrupted
                }
            },
            Err(RecvTimeoutError::Timeout) => WaitingStatus::Ended,
            Err(RecvTimeoutError::Disconnected) => WaitingStatus::Disconnected,
        }
    }

    /// Instant at which the worker should wake up to drive the commitment
    /// requester, even if no command arrives.
    fn next_deadline(&self) -> Instant {
        let fallback = self.config.commitment_request_period;
        let wait = match (LatticeTime::now(), self.next_requester_deadline) {
            (Ok(now), Some(deadline)) => deadline.saturating_sub(now).min(fallback),
            _ => fallback,
        };
        Instant::now() + wait.to_duration()
    }

    /// Runs until a stop command arrives or the controller side is dropped.
    /// Wakes up periodically to re-request still-missing commitments.
    pub(crate) fn run(&mut self) {
        info!("consensus worker started");
        loop {
            match self.wait_command_or_deadline(self.next_deadline()) {
                WaitingStatus::Ended => {
                    self.next_requester_deadline = self.chain_manager.tick_requester();
                }
                WaitingStatus::Interrupted => {
                    continue;
                }
                WaitingStatus::Disconnected => {
                    break;
                }
            }
        }
        info!("consensus worker exited its main loop");
    }
}
