// Copyright (c) 2023 MASSA LABS <info@massa.net>
//! The block DAG ingests blocks from gossip, settles their causal order,
//! parks blocks committing to future slots, and evicts committed slots.

mod block;
mod solidifier;

pub use block::BlockMetadata;

use crate::dag::solidifier::{Solidifier, SolidifierHost};
use lattice_consensus_exports::block_status::BlockStatus;
use lattice_consensus_exports::channels::BlockDagChannels;
use lattice_consensus_exports::error::{ConsensusError, ConsensusResult};
use lattice_consensus_exports::events::BlockInvalidEvent;
use lattice_consensus_exports::providers::{CommitmentProvider, RootBlockProvider};
use lattice_models::block::{Block, Parent};
use lattice_models::block_id::BlockId;
use lattice_models::commitment_id::CommitmentId;
use lattice_models::prehash::PreHashMap;
use lattice_models::slot::Slot;
use lattice_storage::{EvictionIndex, IndexedStorage};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

type FutureBucket = Arc<RwLock<Vec<Arc<BlockMetadata>>>>;

/// Causally ordered DAG of blocks, the central ingest structure of the node.
///
/// Lock order: the solidifier coordinator is taken before the future-blocks
/// coordinator (attach and promote take it shared, eviction exclusively), and
/// the eviction coordinator is only ever taken after the solidifier one.
pub struct BlockDag {
    channels: BlockDagChannels,
    /// all non-root blocks, owned by the DAG
    storage: IndexedStorage<BlockId, Arc<BlockMetadata>>,
    /// metadata wrappers for root blocks, built on first lookup
    roots: RwLock<PreHashMap<BlockId, Arc<BlockMetadata>>>,
    solidifier: Solidifier,
    /// outer coordinator: readers are the attach/promote paths, writer is the
    /// evictor
    solidifier_lock: RwLock<()>,
    /// blocks committing to a slot the local node has not sealed yet, keyed
    /// by (declared slot, declared commitment id)
    future_blocks: IndexedStorage<CommitmentId, FutureBucket>,
    /// inner coordinator: writer is the promote path, readers the future
    /// check inside solidification
    future_blocks_lock: RwLock<()>,
    next_index_to_promote: RwLock<Slot>,
    eviction: RwLock<EvictionIndex>,
    commitment_provider: Arc<dyn CommitmentProvider>,
    root_block_provider: Arc<dyn RootBlockProvider>,
}

impl BlockDag {
    /// Creates an empty DAG wired to the given collaborators
    pub fn new(
        channels: BlockDagChannels,
        commitment_provider: Arc<dyn CommitmentProvider>,
        root_block_provider: Arc<dyn RootBlockProvider>,
    ) -> Self {
        BlockDag {
            channels,
            storage: IndexedStorage::new(),
            roots: RwLock::new(PreHashMap::default()),
            solidifier: Solidifier::new(),
            solidifier_lock: RwLock::new(()),
            future_blocks: IndexedStorage::new(),
            future_blocks_lock: RwLock::new(()),
            next_index_to_promote: RwLock::new(Slot::min()),
            eviction: RwLock::new(EvictionIndex::new()),
            commitment_provider,
            root_block_provider,
        }
    }

    /// Attaches a block to the DAG and queues it for solidification.
    /// Returns the block metadata and whether this call attached it.
    pub fn attach(&self, data: Block) -> ConsensusResult<(Arc<BlockMetadata>, bool)> {
        let (block, was_attached) = self.attach_inner(data)?;
        if was_attached {
            let _ = self.channels.block_attached.send(block.id());
            let _solidifier = self.solidifier_lock.read();
            self.solidifier.queue(block.clone(), self);
        }
        Ok((block, was_attached))
    }

    /// Resolves a block by id, root blocks included
    pub fn block(&self, id: &BlockId) -> Option<Arc<BlockMetadata>> {
        let _eviction = self.eviction.read();
        self.resolve(id)
    }

    /// Status of a block for queries. Decisive states shadow transient ones.
    pub fn block_status(&self, id: &BlockId) -> BlockStatus {
        match self.block(id) {
            None => BlockStatus::NotFound,
            Some(block) => {
                if block.is_invalid() {
                    BlockStatus::Invalid
                } else if block.is_orphaned() {
                    BlockStatus::Orphaned
                } else if block.is_solid() {
                    BlockStatus::Solid
                } else if block.is_future() {
                    BlockStatus::Future
                } else if block.is_missing() {
                    BlockStatus::Missing
                } else {
                    BlockStatus::Attached
                }
            }
        }
    }

    /// Marks a block invalid, firing `block_invalid` on transition
    pub fn set_invalid(&self, block: &Arc<BlockMetadata>, reason: String) -> bool {
        if !block.set_invalid() {
            return false;
        }
        debug!("block {} marked invalid: {}", block.id(), reason);
        let _ = self.channels.block_invalid.send(BlockInvalidEvent {
            block_id: block.id(),
            reason,
        });
        true
    }

    /// Marks a block orphaned, firing `block_orphaned` on transition
    pub fn set_orphaned(&self, block: &Arc<BlockMetadata>) -> bool {
        if !block.set_orphaned(true) {
            return false;
        }
        let _ = self.channels.block_orphaned.send(block.id());
        true
    }

    /// Re-queues the blocks parked under the locally sealed commitment of
    /// every slot up to `slot`, and drops the parking buckets. Idempotent:
    /// already promoted slots are skipped.
    pub fn promote_future_blocks_until(&self, slot: Slot) {
        let _solidifier = self.solidifier_lock.read();
        let to_requeue: Vec<Arc<BlockMetadata>> = {
            let _future = self.future_blocks_lock.write();
            let mut next_index = self.next_index_to_promote.write();
            let mut collected = Vec::new();
            for index in next_index.0..=slot.0 {
                let index = Slot(index);
                let commitment = self
                    .commitment_provider
                    .commitment(index)
                    .unwrap_or_else(|| {
                        panic!("failed to load commitment for slot {} during promotion", index)
                    });
                if let Some(bucket) = self.future_blocks.get(index, &commitment.id()) {
                    collected.extend(bucket.read().iter().cloned());
                }
                self.future_blocks.evict(index);
            }
            *next_index = slot.next();
            collected
        };
        for block in to_requeue {
            self.solidifier.queue(block, self);
        }
    }

    /// Evicts all in-memory block state up to and including `slot`
    pub fn evict_until(&self, slot: Slot) {
        let next = self.eviction.read().next_index();
        for index in next.0..=slot.0 {
            self.evict_slot(Slot(index));
        }
    }

    /// Evicts the in-memory block state of one slot and tells the solidifier
    /// to forget all blocks of that slot
    pub fn evict_slot(&self, slot: Slot) {
        {
            let _solidifier = self.solidifier_lock.write();
            self.solidifier.evict_until(slot);
        }
        {
            let mut eviction = self.eviction.write();
            eviction.mark_evicted(slot);
            self.storage.evict(slot);
        }
        let _ = self.channels.slot_evicted.send(slot);
    }

    fn attach_inner(&self, data: Block) -> ConsensusResult<(Arc<BlockMetadata>, bool)> {
        let eviction = self.eviction.read();

        // can_attach: the block must address a non-evicted slot
        if eviction.is_evicted(data.slot()) && !self.root_block_provider.is_root_block(&data.id())
        {
            return Err(ConsensusError::BelowEvictionHorizon(data.slot()));
        }
        let stored = self.resolve(&data.id());
        if let Some(stored) = &stored {
            if !stored.is_missing() {
                return Ok((stored.clone(), false));
            }
        }

        // can_attach_to_parents: all parents must live in non-evicted slots
        for parent in data.parents() {
            if eviction.is_evicted(parent.id.slot())
                && !self.root_block_provider.is_root_block(&parent.id)
            {
                if let Some(stored) = &stored {
                    self.set_invalid(
                        stored,
                        format!(
                            "block {} references parent {} below the eviction horizon",
                            data.id(),
                            parent.id
                        ),
                    );
                }
                return Err(ConsensusError::BelowEvictionHorizon(parent.id.slot()));
            }
        }

        let data = Arc::new(data);
        let id = data.id();
        let (block, created) = self
            .storage
            .get_or_create(id.slot(), id, || Arc::new(BlockMetadata::new(data.clone())));
        if !created {
            if !block.update(data.clone()) {
                return Ok((block, false));
            }
            let _ = self.channels.missing_block_attached.send(id);
        }
        for parent in data.parents() {
            self.register_child(&block, parent);
        }
        Ok((block, true))
    }

    /// Registers `child` on its parent, synthesising a missing placeholder
    /// and firing `block_missing` if the parent is unknown and not a root.
    fn register_child(&self, child: &Arc<BlockMetadata>, parent: &Parent) {
        if self.root_block_provider.is_root_block(&parent.id) {
            return;
        }
        let (parent_block, created) = self.storage.get_or_create(parent.id.slot(), parent.id, || {
            Arc::new(BlockMetadata::new_missing(parent.id))
        });
        if created {
            let _ = self.channels.block_missing.send(parent.id);
        }
        parent_block.append_child(parent.kind, child.clone());
    }

    /// Resolves a block, going through the root-block provider first
    fn resolve(&self, id: &BlockId) -> Option<Arc<BlockMetadata>> {
        if let Some(root) = self.root_block_provider.root_block(id) {
            let mut roots = self.roots.write();
            return Some(
                roots
                    .entry(*id)
                    .or_insert_with(|| Arc::new(BlockMetadata::new_root(root)))
                    .clone(),
            );
        }
        self.storage.get(id.slot(), id)
    }

    /// Parks the block if its declared commitment slot has not been sealed
    /// locally yet. Returns whether the block was parked.
    fn park_if_future(&self, block: &Arc<BlockMetadata>) -> bool {
        let _future = self.future_blocks_lock.read();
        let commitment_id = block
            .slot_commitment_id()
            .expect("solidifying block must carry its data");
        if self
            .commitment_provider
            .commitment(commitment_id.slot())
            .is_some()
        {
            return false;
        }
        block.set_future();
        let (bucket, _) = self
            .future_blocks
            .get_or_create(commitment_id.slot(), commitment_id, FutureBucket::default);
        bucket.write().push(block.clone());
        true
    }

    /// Parent checks run on first solidification: issuing times and declared
    /// commitment indices must be monotone along every edge.
    fn check_parents(&self, block: &Arc<BlockMetadata>) -> ConsensusResult<()> {
        let issuing_time = block
            .issuing_time()
            .expect("solidifying block must carry its data");
        let commitment_slot = block
            .slot_commitment_id()
            .expect("solidifying block must carry its data")
            .slot();
        for parent in block.parents() {
            let parent_block = self.block(&parent.id).unwrap_or_else(|| {
                panic!(
                    "parent {} of block {} should exist once the block is ordered",
                    parent.id,
                    block.id()
                )
            });
            if let Some(parent_time) = parent_block.issuing_time() {
                if parent_time > issuing_time {
                    return Err(ConsensusError::InvalidReference(format!(
                        "timestamp monotonicity check failed for parent {} with timestamp {}, block timestamp {}",
                        parent.id, parent_time, issuing_time
                    )));
                }
            }
            if let Some(parent_commitment) = parent_block.slot_commitment_id() {
                if parent_commitment.slot() > commitment_slot {
                    return Err(ConsensusError::InvalidReference(format!(
                        "commitment monotonicity check failed for parent {} with commitment slot {}, block commitment slot {}",
                        parent.id,
                        parent_commitment.slot(),
                        commitment_slot
                    )));
                }
            }
        }
        Ok(())
    }
}

impl SolidifierHost for BlockDag {
    fn lookup(&self, id: &BlockId) -> Option<Arc<BlockMetadata>> {
        self.block(id)
    }

    /// Future blocks have already passed the parent checks on their first
    /// visit, and parking flagged them as future. On the second visit (after
    /// promotion) the checks are skipped and the block solidifies directly,
    /// so this runs at most twice per block.
    fn mark_solid(&self, block: &Arc<BlockMetadata>) -> ConsensusResult<()> {
        if !block.is_future() {
            self.check_parents(block)?;
            if self.park_if_future(block) {
                return Ok(());
            }
        }
        if block.set_solid() {
            let _ = self.channels.block_solid.send(block.id());
        }
        Ok(())
    }

    fn mark_invalid(&self, block: &Arc<BlockMetadata>, reason: String) {
        self.set_invalid(block, reason);
    }

    fn check_reference(
        &self,
        child: &Arc<BlockMetadata>,
        parent: &Arc<BlockMetadata>,
    ) -> ConsensusResult<()> {
        if parent.is_invalid() {
            return Err(ConsensusError::InvalidReference(format!(
                "parent {} of child {} is marked as invalid",
                parent.id(),
                child.id()
            )));
        }
        Ok(())
    }
}
