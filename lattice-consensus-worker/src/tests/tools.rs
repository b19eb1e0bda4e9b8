// Copyright (c) 2023 MASSA LABS <info@massa.net>

use crate::chain::ChainManager;
use crate::dag::BlockDag;
use lattice_consensus_exports::channels::{BlockDagChannels, ChainManagerChannels};
use lattice_consensus_exports::providers::{CommitmentProvider, RootBlock, RootBlockProvider};
use lattice_consensus_exports::ConsensusConfig;
use lattice_hash::Hash;
use lattice_models::block_id::BlockId;
use lattice_models::commitment::Commitment;
use lattice_models::commitment_id::CommitmentId;
use lattice_models::node::PeerId;
use lattice_models::prehash::PreHashMap;
use lattice_models::slot::Slot;
use lattice_time::LatticeTime;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::broadcast;

/// The genesis commitment all test chains are rooted at
pub fn genesis_commitment() -> Commitment {
    Commitment::new(
        CommitmentId::new(Slot(0), Hash::compute_from(b"void")),
        Slot(0),
        Hash::compute_from(b"genesis roots"),
    )
    .unwrap()
}

/// The deterministic commitment the test store seals for `slot`
pub fn commitment_for(slot: Slot) -> Commitment {
    let mut current = genesis_commitment();
    for index in 1..=slot.0 {
        current = Commitment::new(
            current.id(),
            Slot(index),
            Hash::compute_from(format!("roots {}", index).as_bytes()),
        )
        .unwrap();
    }
    current
}

/// Builds `count` commitments chained on top of `start`, one per slot
pub fn commitment_chain_from(start: &Commitment, count: usize, tag: &str) -> Vec<Commitment> {
    let mut out = Vec::with_capacity(count);
    let mut prev = *start;
    for _ in 0..count {
        let slot = prev.slot().next();
        let commitment = Commitment::new(
            prev.id(),
            slot,
            Hash::compute_from(format!("{} roots {}", tag, slot).as_bytes()),
        )
        .unwrap();
        out.push(commitment);
        prev = commitment;
    }
    out
}

pub fn peer(seed: &str) -> PeerId {
    PeerId(Hash::compute_from(seed.as_bytes()))
}

/// In-memory commitment store standing in for the local notarization
/// pipeline. Starts with the genesis commitment sealed.
pub struct TestCommitmentStore {
    commitments: RwLock<BTreeMap<Slot, Commitment>>,
}

impl TestCommitmentStore {
    pub fn new() -> Self {
        let mut commitments = BTreeMap::new();
        commitments.insert(Slot(0), genesis_commitment());
        TestCommitmentStore {
            commitments: RwLock::new(commitments),
        }
    }

    /// Seals every slot up to `slot` and returns the last commitment
    pub fn commit_until(&self, slot: Slot) -> Commitment {
        let mut commitments = self.commitments.write();
        for index in 0..=slot.0 {
            commitments
                .entry(Slot(index))
                .or_insert_with(|| commitment_for(Slot(index)));
        }
        *commitments.get(&slot).unwrap()
    }
}

impl CommitmentProvider for TestCommitmentStore {
    fn commitment(&self, slot: Slot) -> Option<Commitment> {
        self.commitments.read().get(&slot).copied()
    }
}

/// Root-block provider backed by a plain map
#[derive(Default)]
pub struct TestRootBlocks {
    roots: RwLock<PreHashMap<BlockId, RootBlock>>,
}

impl TestRootBlocks {
    pub fn add(&self, root: RootBlock) {
        self.roots.write().insert(root.id, root);
    }
}

impl RootBlockProvider for TestRootBlocks {
    fn is_root_block(&self, id: &BlockId) -> bool {
        self.roots.read().contains_key(id)
    }

    fn root_block(&self, id: &BlockId) -> Option<RootBlock> {
        self.roots.read().get(id).copied()
    }
}

/// Collects the events of one broadcast stream for assertions. Subscribe
/// before triggering the operations under test.
pub struct EventCollector<T: Clone> {
    receiver: broadcast::Receiver<T>,
}

impl<T: Clone> EventCollector<T> {
    pub fn new(sender: &broadcast::Sender<T>) -> Self {
        EventCollector {
            receiver: sender.subscribe(),
        }
    }

    pub fn drain(&mut self) -> Vec<T> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }
}

/// A block DAG wired to in-memory collaborators, with the genesis slot
/// sealed and one genesis root block registered.
pub struct DagFixture {
    pub dag: Arc<BlockDag>,
    pub store: Arc<TestCommitmentStore>,
    pub roots: Arc<TestRootBlocks>,
    pub channels: BlockDagChannels,
    pub genesis: Commitment,
    pub genesis_block: RootBlock,
}

pub fn dag_fixture() -> DagFixture {
    let channels = BlockDagChannels::new(64);
    let store = Arc::new(TestCommitmentStore::new());
    let genesis = genesis_commitment();
    let roots = Arc::new(TestRootBlocks::default());
    let genesis_block = RootBlock {
        id: BlockId::new(Slot(0), Hash::compute_from(b"genesis block")),
        slot_commitment_id: genesis.id(),
        issuing_time: LatticeTime::from_millis(0),
    };
    roots.add(genesis_block);
    let dag = Arc::new(BlockDag::new(
        channels.clone(),
        store.clone(),
        roots.clone(),
    ));
    DagFixture {
        dag,
        store,
        roots,
        channels,
        genesis,
        genesis_block,
    }
}

/// A chain manager initialised at the genesis commitment
pub struct ChainFixture {
    pub manager: Arc<ChainManager>,
    pub channels: ChainManagerChannels,
    pub genesis: Commitment,
}

pub fn chain_fixture(minimum_fork_depth: u64) -> ChainFixture {
    let config = ConsensusConfig {
        minimum_fork_depth,
        ..Default::default()
    };
    let channels = ChainManagerChannels::new(64);
    let manager = Arc::new(ChainManager::new(&config, channels.clone()));
    let genesis = genesis_commitment();
    manager.initialize(genesis);
    ChainFixture {
        manager,
        channels,
        genesis,
    }
}
