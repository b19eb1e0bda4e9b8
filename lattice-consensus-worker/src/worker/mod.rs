// Copyright (c) 2023 MASSA LABS <info@massa.net>

use crate::chain::ChainManager;
use crate::commands::ConsensusCommand;
use crate::controller::ConsensusControllerImpl;
use crate::dag::BlockDag;
use crate::manager::ConsensusManagerImpl;
use lattice_channel::receiver::LatticeReceiver;
use lattice_channel::LatticeChannel;
use lattice_consensus_exports::channels::ConsensusChannels;
use lattice_consensus_exports::providers::{CommitmentProvider, RootBlockProvider};
use lattice_consensus_exports::{ConsensusConfig, ConsensusController, ConsensusManager};
use lattice_models::commitment::Commitment;
use lattice_time::LatticeTime;
use std::sync::Arc;
use std::thread;

mod main_loop;

/// The consensus worker: owns the block DAG and the chain manager and
/// processes commands received from the controller on a dedicated thread.
pub struct ConsensusWorker {
    /// Channel to receive commands from the controller
    command_receiver: LatticeReceiver<ConsensusCommand>,
    /// Configuration of the consensus
    config: ConsensusConfig,
    /// Block DAG shared with the controller
    block_dag: Arc<BlockDag>,
    /// Chain manager shared with the controller
    chain_manager: Arc<ChainManager>,
    /// Next instant the commitment requester wants to tick at
    next_requester_deadline: Option<LatticeTime>,
}

/// Create a new consensus worker thread.
///
/// # Arguments:
/// * `config`: consensus configuration
/// * `channels`: event streams the core publishes on; create them first and
///   subscribe before starting the worker
/// * `root_commitment`: the last known-good commitment the chain forest is
///   rooted at
/// * `commitment_provider`: lookup of locally sealed commitments
/// * `root_block_provider`: lookup of root block anchors
///
/// # Returns:
/// * the controller to interact with the worker
/// * the manager to stop it
pub fn start_consensus_worker(
    config: ConsensusConfig,
    channels: ConsensusChannels,
    root_commitment: Commitment,
    commitment_provider: Arc<dyn CommitmentProvider>,
    root_block_provider: Arc<dyn RootBlockProvider>,
) -> (Box<dyn ConsensusController>, Box<dyn ConsensusManager>) {
    let (tx, rx) = LatticeChannel::new(
        "consensus_command".to_string(),
        Some(config.channel_size),
    );

    let block_dag = Arc::new(BlockDag::new(
        channels.block_dag.clone(),
        commitment_provider,
        root_block_provider,
    ));
    let chain_manager = Arc::new(ChainManager::new(&config, channels.chain_manager.clone()));
    chain_manager.initialize(root_commitment);

    let mut worker = ConsensusWorker {
        command_receiver: rx,
        config: config.clone(),
        block_dag: block_dag.clone(),
        chain_manager: chain_manager.clone(),
        next_requester_deadline: None,
    };

    let consensus_thread = thread::Builder::new()
        .name("consensus worker".into())
        .spawn(move || worker.run())
        .expect("Can't spawn consensus thread.");

    let manager = ConsensusManagerImpl {
        consensus_thread: Some((tx.clone(), consensus_thread)),
    };

    let controller = ConsensusControllerImpl::new(tx, block_dag, chain_manager);

    (Box::new(controller), Box::new(manager))
}
