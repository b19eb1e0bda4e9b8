// Copyright (c) 2023 MASSA LABS <info@massa.net>

use crate::chain::chain::{Chain, ChainId};
use crate::chain::commitment::{ChainCommitment, ChildRegistration};
use crate::chain::requester::CommitmentRequester;
use crate::sync::DagMutex;
use lattice_consensus_exports::channels::ChainManagerChannels;
use lattice_consensus_exports::error::{ConsensusError, ConsensusResult};
use lattice_consensus_exports::events::Fork;
use lattice_consensus_exports::ConsensusConfig;
use lattice_models::commitment::Commitment;
use lattice_models::commitment_id::CommitmentId;
use lattice_models::node::PeerId;
use lattice_models::prehash::PreHashMap;
use lattice_models::slot::Slot;
use lattice_storage::{EvictionIndex, IndexedStorage};
use lattice_time::LatticeTime;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info};

/// Maintains the forest of commitment chains rooted at the last known-good
/// commitment.
///
/// All chain commitments and chains are owned here; commitments reference
/// their chain by id. Entry points take the coarse eviction coordinator
/// shared, eviction takes it exclusively; individual commitments are guarded
/// by the per-id [`DagMutex`].
pub struct ChainManager {
    channels: ChainManagerChannels,
    minimum_fork_depth: u64,
    commitments: IndexedStorage<CommitmentId, Arc<ChainCommitment>>,
    chains: RwLock<PreHashMap<ChainId, Arc<Chain>>>,
    root_commitment: RwLock<Option<Arc<ChainCommitment>>>,
    /// forking points indexed by the commitment whose arrival triggered the
    /// detection, so eviction can clean the fork records up
    forking_points_by_commitment: IndexedStorage<CommitmentId, CommitmentId>,
    forks_by_forking_point: RwLock<PreHashMap<CommitmentId, Fork>>,
    eviction_lock: RwLock<EvictionIndex>,
    commitment_mutex: DagMutex<CommitmentId>,
    requester: CommitmentRequester,
}

impl ChainManager {
    /// Creates an uninitialised manager; call [`ChainManager::initialize`]
    /// with the root commitment before processing anything.
    pub fn new(config: &ConsensusConfig, channels: ChainManagerChannels) -> Self {
        ChainManager {
            requester: CommitmentRequester::new(
                channels.clone(),
                config.commitment_request_period,
            ),
            channels,
            minimum_fork_depth: config.minimum_fork_depth,
            commitments: IndexedStorage::new(),
            chains: RwLock::new(PreHashMap::default()),
            root_commitment: RwLock::new(None),
            forking_points_by_commitment: IndexedStorage::new(),
            forks_by_forking_point: RwLock::new(PreHashMap::default()),
            eviction_lock: RwLock::new(EvictionIndex::new()),
            commitment_mutex: DagMutex::new(),
        }
    }

    /// Installs the root commitment: it is solid by definition and starts the
    /// main chain.
    pub fn initialize(&self, commitment: Commitment) {
        let _eviction = self.eviction_lock.write();
        let (root, _) = self.get_or_create_commitment(commitment.id());
        root.publish_commitment(commitment);
        root.set_solid(true);
        let chain = self.create_chain(root.id());
        root.publish_chain(chain.id());
        *self.root_commitment.write() = Some(root);
    }

    /// Processes a commitment received from a peer and runs fork detection
    /// against that peer. Returns the solid flag and the chain of the
    /// commitment, if it was adopted.
    pub fn process_commitment_from_source(
        &self,
        commitment: Commitment,
        source: PeerId,
    ) -> (bool, Option<ChainId>) {
        let _eviction = self.eviction_lock.read();
        let (_, is_solid, chain_commitment) = self.process(&commitment);
        let Some(chain_commitment) = chain_commitment else {
            return (false, None);
        };
        self.detect_forks(&chain_commitment, source);
        (is_solid, chain_commitment.chain())
    }

    /// Processes a commitment from a source that must not trigger fork
    /// detection, e.g. a snapshot candidate.
    pub fn process_candidate_commitment(&self, commitment: Commitment) -> (bool, Option<ChainId>) {
        let _eviction = self.eviction_lock.read();
        let (_, is_solid, chain_commitment) = self.process(&commitment);
        let Some(chain_commitment) = chain_commitment else {
            return (false, None);
        };
        (is_solid, chain_commitment.chain())
    }

    /// Processes a commitment produced by the local slot-commitment pipeline.
    /// If the commitment was already known, the main chain is switched to it
    /// unconditionally.
    pub fn process_commitment(
        &self,
        commitment: Commitment,
    ) -> ConsensusResult<(bool, Option<ChainId>)> {
        let _eviction = self.eviction_lock.read();
        let (is_new, is_solid, chain_commitment) = self.process(&commitment);
        let Some(chain_commitment) = chain_commitment else {
            return Ok((false, None));
        };
        if !is_new {
            self.switch_main_chain_to(&chain_commitment)?;
        }
        Ok((is_solid, chain_commitment.chain()))
    }

    /// Switches the main chain to the chain holding `head`
    pub fn switch_main_chain(&self, head: CommitmentId) -> ConsensusResult<()> {
        let _eviction = self.eviction_lock.read();
        let commitment = self
            .commitment(&head)
            .ok_or(ConsensusError::CommitmentUnknown(head))?;
        self.switch_main_chain_to(&commitment)
    }

    /// Drops all chain state up to and including `slot`, along with the fork
    /// records whose observed commitment lived there.
    pub fn evict_until(&self, slot: Slot) {
        let mut eviction = self.eviction_lock.write();
        for index in eviction.next_index().0..=slot.0 {
            self.evict(Slot(index));
            eviction.mark_evicted(Slot(index));
        }
        self.requester.evict_until(slot);
    }

    /// The current root commitment
    pub fn root_commitment(&self) -> Arc<ChainCommitment> {
        let _eviction = self.eviction_lock.read();
        self.root()
    }

    /// Advances the root to an already-stored commitment. The commitment must
    /// exist and must not move the root backwards; violations are bugs of the
    /// finalisation pipeline and abort the node.
    pub fn set_root_commitment(&self, commitment: &Commitment) -> Arc<ChainCommitment> {
        let _eviction = self.eviction_lock.write();
        let new_root = self.commitment(&commitment.id()).unwrap_or_else(|| {
            panic!(
                "we should always have the commitment we confirmed in storage: {}",
                commitment
            )
        });
        let current = self.root();
        let current_payload = current
            .commitment()
            .expect("root commitment must be published");
        if commitment.slot() <= current_payload.slot() && commitment.id() != current_payload.id() {
            panic!(
                "we should never move the root below the current root commitment {} - root: {}",
                commitment, current_payload
            );
        }
        *self.root_commitment.write() = Some(new_root.clone());
        new_root
    }

    /// The chain holding the given commitment, if known
    pub fn chain_of(&self, id: CommitmentId) -> Option<ChainId> {
        let _eviction = self.eviction_lock.read();
        self.commitment(&id).and_then(|commitment| commitment.chain())
    }

    /// Walks `prev_id` links from `id`, returning `amount` chain commitments
    /// (most recent first). Fails with `CommitmentUnknown` when the walk
    /// crosses the in-memory horizon.
    pub fn commitments(
        &self,
        id: CommitmentId,
        amount: usize,
    ) -> ConsensusResult<Vec<Arc<ChainCommitment>>> {
        let _eviction = self.eviction_lock.read();
        let mut result = Vec::with_capacity(amount);
        let mut current_id = id;
        for _ in 0..amount {
            let commitment = self
                .commitment(&current_id)
                .ok_or(ConsensusError::CommitmentUnknown(current_id))?;
            let payload = commitment
                .commitment()
                .ok_or(ConsensusError::CommitmentUnknown(current_id))?;
            current_id = payload.prev_id();
            result.push(commitment);
        }
        Ok(result)
    }

    /// The fork recorded for the given forking point, if any
    pub fn fork_by_forking_point(&self, forking_point: &CommitmentId) -> Option<Fork> {
        let _eviction = self.eviction_lock.read();
        self.forks_by_forking_point.read().get(forking_point).cloned()
    }

    /// Resolves a chain commitment by id. The root commitment stays
    /// resolvable even after its slot storage was evicted.
    pub fn commitment(&self, id: &CommitmentId) -> Option<Arc<ChainCommitment>> {
        if let Some(root) = self.root_commitment.read().clone() {
            if root.id() == *id {
                return Some(root);
            }
        }
        self.commitments.get(id.slot(), id)
    }

    /// Re-fires pending commitment requests; returns the next deadline while
    /// any request is pending.
    pub fn tick_requester(&self) -> Option<LatticeTime> {
        self.requester.tick()
    }

    /// Commitment ids currently being re-requested
    pub fn requested_commitments(&self) -> Vec<CommitmentId> {
        self.requester.pending_ids()
    }

    fn root(&self) -> Arc<ChainCommitment> {
        self.root_commitment
            .read()
            .clone()
            .expect("chain manager used before initialization")
    }

    fn chain(&self, id: &ChainId) -> Option<Arc<Chain>> {
        self.chains.read().get(id).cloned()
    }

    fn create_chain(&self, forking_point: CommitmentId) -> Arc<Chain> {
        let chain = Arc::new(Chain::new(forking_point));
        self.chains.write().insert(chain.id(), chain.clone());
        chain
    }

    fn get_or_create_commitment(&self, id: CommitmentId) -> (Arc<ChainCommitment>, bool) {
        if let Some(root) = self.root_commitment.read().clone() {
            if root.id() == id {
                return (root, false);
            }
        }
        self.commitments
            .get_or_create(id.slot(), id, || Arc::new(ChainCommitment::new(id)))
    }

    /// Registers a received commitment and propagates chain membership and
    /// solidity into the already-known part of its future cone.
    fn process(&self, commitment: &Commitment) -> (bool, bool, Option<Arc<ChainCommitment>>) {
        let root = self.root();
        let root_payload = root
            .commitment()
            .expect("root commitment must be published");
        if commitment.slot() <= root_payload.slot() {
            if commitment.id() == root_payload.id() {
                return (false, true, Some(root));
            }
            self.requester.stop_ticker(&commitment.id());
            let _ = self.channels.commitment_below_root.send(commitment.id());
            return (false, false, None);
        }

        let (is_new, is_solid, _was_forked, chain_commitment) =
            self.register_commitment(commitment);
        if !is_new || chain_commitment.chain().is_none() {
            return (is_new, is_solid, Some(chain_commitment));
        }

        // lock this commitment so no children are added while propagating
        let _guard = self.commitment_mutex.lock(chain_commitment.id());
        let chain_id = chain_commitment
            .chain()
            .expect("chain was published just above");
        if let Some(main_child) = chain_commitment.main_child() {
            let mut worklist = vec![main_child];
            while let Some(child_id) = worklist.pop() {
                worklist.extend(self.propagate_chain_to_main_child(&child_id, chain_id));
            }
        }
        if is_solid {
            let mut worklist = chain_commitment.children();
            while let Some(child_id) = worklist.pop() {
                worklist.extend(self.propagate_solidity(&child_id));
            }
        }
        (is_new, is_solid, Some(chain_commitment))
    }

    fn register_commitment(
        &self,
        commitment: &Commitment,
    ) -> (bool, bool, bool, Arc<ChainCommitment>) {
        let _child_guard = self.commitment_mutex.lock(commitment.id());
        let _parent_guard = self.commitment_mutex.lock(commitment.prev_id());

        let (parent, parent_created) = self.get_or_create_commitment(commitment.prev_id());
        if parent_created {
            let _ = self.channels.commitment_missing.send(parent.id());
            self.requester.start_ticker(parent.id());
        }

        let (child, child_created) = self.get_or_create_commitment(commitment.id());
        if !child.publish_commitment(*commitment) {
            return (false, child.is_solid(), false, child);
        }
        if !child_created {
            self.requester.stop_ticker(&child.id());
            let _ = self.channels.missing_commitment_received.send(child.id());
        }

        let (is_solid, was_forked) = self.register_child(&parent, &child);
        (true, is_solid, was_forked, child)
    }

    fn register_child(
        &self,
        parent: &Arc<ChainCommitment>,
        child: &Arc<ChainCommitment>,
    ) -> (bool, bool) {
        let (parent_solid, registration) = parent.register_child(child.id());
        match registration {
            ChildRegistration::AlreadyRegistered => {
                // the id stayed registered on the parent while the child
                // object itself was evicted and recreated: re-derive its
                // chain membership instead of leaving it unchained
                if child.chain().is_none() {
                    if parent.main_child() == Some(child.id()) {
                        if let Some(chain_id) = parent.chain() {
                            let chain = self
                                .chain(&chain_id)
                                .expect("a commitment can only reference a registered chain");
                            chain.add_commitment(child.id());
                            child.publish_chain(chain_id);
                            child.set_solid(parent_solid);
                            return (parent_solid, false);
                        }
                        return (false, false);
                    }
                    // the child had forked off into a chain of its own
                    let chain_id = ChainId(child.id());
                    let chain = match self.chain(&chain_id) {
                        Some(chain) => chain,
                        None => self.create_chain(child.id()),
                    };
                    chain.add_commitment(child.id());
                    child.publish_chain(chain_id);
                    child.set_solid(parent_solid);
                    return (parent_solid, true);
                }
                (child.is_solid(), false)
            }
            // the parent has no chain yet: the child gets one once chain
            // membership propagates down to it
            ChildRegistration::Inherited(None) => (false, false),
            ChildRegistration::Inherited(Some(chain_id)) => {
                let chain = self
                    .chain(&chain_id)
                    .expect("a commitment can only reference a registered chain");
                chain.add_commitment(child.id());
                child.publish_chain(chain_id);
                child.set_solid(parent_solid);
                (parent_solid, false)
            }
            ChildRegistration::Forked => {
                let chain = self.create_chain(child.id());
                child.publish_chain(chain.id());
                child.set_solid(parent_solid);
                debug!(
                    "commitment {} forks off a new chain from {}",
                    child.id(),
                    parent.id()
                );
                (parent_solid, true)
            }
        }
    }

    fn propagate_chain_to_main_child(
        &self,
        child_id: &CommitmentId,
        chain_id: ChainId,
    ) -> Vec<CommitmentId> {
        let Some(child) = self.commitment(child_id) else {
            return Vec::new();
        };
        let _guard = self.commitment_mutex.lock(*child_id);
        if !child.publish_chain(chain_id) {
            return Vec::new();
        }
        let chain = self
            .chain(&chain_id)
            .expect("a commitment can only reference a registered chain");
        chain.add_commitment(*child_id);
        child.main_child().into_iter().collect()
    }

    fn propagate_solidity(&self, child_id: &CommitmentId) -> Vec<CommitmentId> {
        let Some(child) = self.commitment(child_id) else {
            return Vec::new();
        };
        let _guard = self.commitment_mutex.lock(*child_id);
        if child.set_solid(true) {
            child.children()
        } else {
            Vec::new()
        }
    }

    /// Fork detection against the main chain. Only runs for commitments that
    /// arrived from an explicit peer source.
    fn detect_forks(&self, commitment: &Arc<ChainCommitment>, source: PeerId) {
        let forking_point = match self.forking_point_against_main_chain(commitment) {
            Ok(Some(forking_point)) => forking_point,
            // rejoining or still unsolidified chains yield no fork
            _ => return,
        };

        // do not fire another event for the same forking point
        if self
            .forks_by_forking_point
            .read()
            .contains_key(&forking_point.id())
        {
            return;
        }

        let Some(chain_id) = commitment.chain() else {
            return;
        };
        let Some(chain) = self.chain(&chain_id) else {
            return;
        };
        let Some(latest_id) = chain.latest_commitment() else {
            return;
        };
        let Some(latest) = self.commitment(&latest_id) else {
            return;
        };
        let (Some(latest_payload), Some(forking_payload)) =
            (latest.commitment(), forking_point.commitment())
        else {
            return;
        };

        // the forking point must be at least minimum_fork_depth slots in the
        // past w.r.t. the latest commitment of the forked chain
        let depth = latest_id.slot().0 as i64 - forking_point.id().slot().0 as i64;
        if depth < self.minimum_fork_depth as i64 {
            return;
        }

        let fork = Fork {
            source,
            commitment: latest_payload,
            forking_point: forking_payload,
        };
        self.forks_by_forking_point
            .write()
            .insert(forking_point.id(), fork.clone());
        self.forking_points_by_commitment.get_or_create(
            commitment.id().slot(),
            commitment.id(),
            || forking_point.id(),
        );
        info!(
            "fork detected from peer {}: diverging at {} up to {}",
            source,
            fork.forking_point.id(),
            fork.commitment.id()
        );
        let _ = self.channels.fork_detected.send(fork);
    }

    /// Walks from the commitment's chain towards the main chain by jumping
    /// from forking point to forking point. Returns the divergence point: the
    /// forking point closest to the root that is not the main child of its
    /// parent. `None` means every hop is main-child connected, i.e. the
    /// commitment already is on the main chain.
    fn forking_point_against_main_chain(
        &self,
        commitment: &Arc<ChainCommitment>,
    ) -> ConsensusResult<Option<Arc<ChainCommitment>>> {
        if !commitment.is_solid() || commitment.chain().is_none() {
            return Err(ConsensusError::CommitmentNotSolid(commitment.id()));
        }
        let root_chain_id = self
            .root()
            .chain()
            .expect("root commitment must have a chain");
        let mut current = commitment.clone();
        let mut forking_point: Option<Arc<ChainCommitment>> = None;
        loop {
            let chain_id = current
                .chain()
                .ok_or(ConsensusError::CommitmentNotSolid(current.id()))?;
            if chain_id == root_chain_id {
                break;
            }
            let fp = self
                .commitment(&chain_id.0)
                .ok_or(ConsensusError::CommitmentUnknown(chain_id.0))?;
            let prev_id = fp
                .commitment()
                .ok_or(ConsensusError::CommitmentNotSolid(fp.id()))?
                .prev_id();
            let parent = self
                .commitment(&prev_id)
                .ok_or(ConsensusError::CommitmentUnknown(prev_id))?;
            if parent.main_child() != Some(fp.id()) {
                forking_point = Some(fp);
            }
            current = parent;
        }
        Ok(forking_point)
    }

    /// Reorganises the forest so that the chain of `commitment` becomes the
    /// main chain, and scrubs the displaced subtree from storage.
    fn switch_main_chain_to(&self, commitment: &Arc<ChainCommitment>) -> ConsensusResult<()> {
        let Some(forking_point) = self.forking_point_against_main_chain(commitment)? else {
            // already part of the main chain
            return Ok(());
        };

        let fork_prev_id = forking_point
            .commitment()
            .ok_or(ConsensusError::CommitmentNotSolid(forking_point.id()))?
            .prev_id();
        let parent_commitment = self
            .commitment(&fork_prev_id)
            .ok_or(ConsensusError::CommitmentUnknown(fork_prev_id))?;
        let old_main_id = parent_commitment.main_child().ok_or_else(|| {
            ConsensusError::ContainerInconsistency(format!(
                "main chain has no extension above {}",
                parent_commitment.id()
            ))
        })?;

        // for each forking point between the new head and the divergence
        // point, redesignate the main child and move the displaced extension
        // onto a chain of its own
        let start_chain = commitment
            .chain()
            .expect("solid commitment must have a chain");
        let mut fork_cursor = self
            .commitment(&start_chain.0)
            .ok_or(ConsensusError::CommitmentUnknown(start_chain.0))?;
        loop {
            let cursor_prev_id = fork_cursor
                .commitment()
                .ok_or(ConsensusError::CommitmentNotSolid(fork_cursor.id()))?
                .prev_id();
            let cursor_parent = self
                .commitment(&cursor_prev_id)
                .ok_or(ConsensusError::CommitmentUnknown(cursor_prev_id))?;
            // hops whose forking point already is the designated extension
            // displace nothing
            if cursor_parent.main_child() != Some(fork_cursor.id()) {
                let displaced_id = cursor_parent.main_child().ok_or_else(|| {
                    ConsensusError::ContainerInconsistency(format!(
                        "forked commitment {} has a parent without main child",
                        fork_cursor.id()
                    ))
                })?;
                let displaced_chain = self.create_chain(displaced_id);
                cursor_parent.set_main_child(fork_cursor.id())?;
                let mut worklist = vec![displaced_id];
                while let Some(child_id) = worklist.pop() {
                    worklist
                        .extend(self.propagate_replace_chain(&child_id, displaced_chain.id()));
                }
            }
            if fork_cursor.id() == forking_point.id() {
                break;
            }
            let next_chain = cursor_parent
                .chain()
                .ok_or(ConsensusError::CommitmentNotSolid(cursor_parent.id()))?;
            fork_cursor = self
                .commitment(&next_chain.0)
                .ok_or(ConsensusError::CommitmentUnknown(next_chain.0))?;
        }

        // truncate the previous main chain above the new head
        let root_chain_id = self
            .root()
            .chain()
            .expect("root commitment must have a chain");
        if let Some(root_chain) = self.chain(&root_chain_id) {
            root_chain.drop_commitments_after(commitment.id().slot());
        }

        // detach the displaced extension and scrub its subtree from storage,
        // dropping the chains that were rooted inside it
        parent_commitment.delete_child(&old_main_id);
        let mut deleted_chains: Vec<ChainId> = Vec::new();
        let mut worklist = vec![old_main_id];
        while let Some(id) = worklist.pop() {
            worklist.extend(self.delete_commitment_subtree(&id, &mut deleted_chains));
        }
        {
            let mut chains = self.chains.write();
            for chain_id in deleted_chains {
                chains.remove(&chain_id);
            }
        }

        info!("main chain switched to {}", commitment.id());
        let _ = self.channels.main_chain_switched.send(commitment.id());
        Ok(())
    }

    fn propagate_replace_chain(
        &self,
        child_id: &CommitmentId,
        chain_id: ChainId,
    ) -> Vec<CommitmentId> {
        let Some(child) = self.commitment(child_id) else {
            return Vec::new();
        };
        let _guard = self.commitment_mutex.lock(*child_id);
        let previous = child.replace_chain(chain_id);
        if let Some(previous) = previous {
            if previous != chain_id {
                if let Some(previous_chain) = self.chain(&previous) {
                    previous_chain.remove_commitment(child_id);
                }
            }
        }
        let chain = self
            .chain(&chain_id)
            .expect("a commitment can only reference a registered chain");
        chain.add_commitment(*child_id);
        child.main_child().into_iter().collect()
    }

    fn delete_commitment_subtree(
        &self,
        id: &CommitmentId,
        deleted_chains: &mut Vec<ChainId>,
    ) -> Vec<CommitmentId> {
        let _guard = self.commitment_mutex.lock(*id);
        let Some(commitment) = self.commitments.delete(id.slot(), id) else {
            return Vec::new();
        };
        if let Some(chain_id) = commitment.chain() {
            if chain_id.0 == *id {
                deleted_chains.push(chain_id);
            }
        }
        commitment.children()
    }

    fn evict(&self, slot: Slot) {
        // forget the forks detected at that slot so they can be detected
        // again if they persist
        if let Some(evicted) = self.forking_points_by_commitment.evict(slot) {
            let mut forks = self.forks_by_forking_point.write();
            for (_, forking_point) in evicted {
                forks.remove(&forking_point);
            }
        }
        self.commitments.evict(slot);
        let root_chain_id = self
            .root()
            .chain()
            .expect("root commitment must have a chain");
        self.chains
            .write()
            .retain(|chain_id, _| *chain_id == root_chain_id || chain_id.0.slot() > slot);
    }
}
