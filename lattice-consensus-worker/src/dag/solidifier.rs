// Copyright (c) 2023 MASSA LABS <info@massa.net>

use crate::dag::block::BlockMetadata;
use lattice_consensus_exports::error::ConsensusResult;
use lattice_models::block_id::BlockId;
use lattice_models::prehash::PreHashMap;
use lattice_models::slot::Slot;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Hooks through which the solidifier talks back to its host. The host
/// decides what "solid" means and what happens on rejection; the solidifier
/// only settles the causal order.
pub(crate) trait SolidifierHost {
    /// Resolve a block by id
    fn lookup(&self, id: &BlockId) -> Option<Arc<BlockMetadata>>;
    /// Called once all parents of `block` are solid. May leave the block
    /// unsolidified (future parking); the solidifier then keeps its waiting
    /// children registered until the block is queued again.
    fn mark_solid(&self, block: &Arc<BlockMetadata>) -> ConsensusResult<()>;
    /// Called when a block is rejected; must be idempotent
    fn mark_invalid(&self, block: &Arc<BlockMetadata>, reason: String);
    /// Validates a single child/parent edge before it is settled
    fn check_reference(
        &self,
        child: &Arc<BlockMetadata>,
        parent: &Arc<BlockMetadata>,
    ) -> ConsensusResult<()>;
}

#[derive(Default)]
struct SolidifierState {
    /// per block, how many of its parents are not solid yet
    unsolid_parents: BTreeMap<Slot, PreHashMap<BlockId, usize>>,
    /// per parent, the blocks waiting for it to become solid
    waiting_children: BTreeMap<Slot, PreHashMap<BlockId, Vec<Arc<BlockMetadata>>>>,
    last_evicted: Option<Slot>,
}

impl SolidifierState {
    fn register_waiting(&mut self, parent: BlockId, child: Arc<BlockMetadata>) {
        self.waiting_children
            .entry(parent.slot())
            .or_default()
            .entry(parent)
            .or_default()
            .push(child);
    }

    fn take_waiting(&mut self, parent: &BlockId) -> Vec<Arc<BlockMetadata>> {
        self.waiting_children
            .get_mut(&parent.slot())
            .and_then(|slot_map| slot_map.remove(parent))
            .unwrap_or_default()
    }

    fn set_pending(&mut self, block: BlockId, pending: usize) {
        self.unsolid_parents
            .entry(block.slot())
            .or_default()
            .insert(block, pending);
    }

    /// Decrements the pending-parent counter of `block`; returns true when it
    /// reached zero (and removes it).
    fn resolve_one_parent(&mut self, block: &BlockId) -> bool {
        let Some(slot_map) = self.unsolid_parents.get_mut(&block.slot()) else {
            return false;
        };
        let Some(counter) = slot_map.get_mut(block) else {
            return false;
        };
        *counter -= 1;
        if *counter == 0 {
            slot_map.remove(block);
            return true;
        }
        false
    }

    fn forget(&mut self, block: &BlockId) {
        if let Some(slot_map) = self.unsolid_parents.get_mut(&block.slot()) {
            slot_map.remove(block);
        }
    }
}

/// Settles the causal order of the DAG: a block is handed to the host's
/// `mark_solid` exactly when all of its parents are solid and every edge
/// passed reference validation. Blocks whose parents arrive out of order are
/// parked in waiting lists keyed by the missing parent.
pub(crate) struct Solidifier {
    state: Mutex<SolidifierState>,
}

impl Solidifier {
    pub(crate) fn new() -> Self {
        Solidifier {
            state: Mutex::new(SolidifierState::default()),
        }
    }

    /// Queues a block for solidification. Invoked on attach and again when a
    /// parked future block is promoted.
    pub(crate) fn queue<H: SolidifierHost>(&self, block: Arc<BlockMetadata>, host: &H) {
        let mut state = self.state.lock();
        if block.is_solid() || block.is_invalid() {
            return;
        }
        if let Some(last) = state.last_evicted {
            if block.slot() <= last {
                debug!("dropping block {} queued in evicted slot", block.id());
                return;
            }
        }
        let mut pending = 0;
        for parent in block.parents() {
            let Some(parent_block) = host.lookup(&parent.id) else {
                debug!(
                    "parent {} of queued block {} crossed the eviction horizon",
                    parent.id,
                    block.id()
                );
                return;
            };
            if let Err(err) = host.check_reference(&block, &parent_block) {
                host.mark_invalid(&block, err.to_string());
                self.propagate_invalidity(&mut state, &block, host);
                return;
            }
            if !parent_block.is_solid() {
                pending += 1;
                state.register_waiting(parent.id, block.clone());
            }
        }
        if pending == 0 {
            self.settle(&mut state, block, host);
        } else {
            state.set_pending(block.id(), pending);
        }
    }

    /// Drops all bookkeeping for blocks at or below `slot`
    pub(crate) fn evict_until(&self, slot: Slot) {
        let mut state = self.state.lock();
        let keep = state.unsolid_parents.split_off(&slot.next());
        state.unsolid_parents = keep;
        let keep = state.waiting_children.split_off(&slot.next());
        state.waiting_children = keep;
        match state.last_evicted {
            Some(last) if slot <= last => {}
            _ => state.last_evicted = Some(slot),
        }
    }

    /// Marks `block` solid and walks the settled part of its future cone.
    fn settle<H: SolidifierHost>(
        &self,
        state: &mut SolidifierState,
        block: Arc<BlockMetadata>,
        host: &H,
    ) {
        let mut worklist = vec![block];
        while let Some(current) = worklist.pop() {
            if let Err(err) = host.mark_solid(&current) {
                host.mark_invalid(&current, err.to_string());
                self.propagate_invalidity(state, &current, host);
                continue;
            }
            if !current.is_solid() {
                // parked as a future block: its waiting children stay
                // registered until the block is queued again
                continue;
            }
            for child in state.take_waiting(&current.id()) {
                if child.is_invalid() {
                    state.forget(&child.id());
                    continue;
                }
                if state.resolve_one_parent(&child.id()) {
                    worklist.push(child);
                }
            }
        }
    }

    /// Invalidity propagation: every block waiting (transitively) on a
    /// rejected block is rejected as well.
    fn propagate_invalidity<H: SolidifierHost>(
        &self,
        state: &mut SolidifierState,
        block: &Arc<BlockMetadata>,
        host: &H,
    ) {
        let mut worklist = vec![block.clone()];
        while let Some(current) = worklist.pop() {
            for child in state.take_waiting(&current.id()) {
                state.forget(&child.id());
                host.mark_invalid(
                    &child,
                    format!("parent {} is marked as invalid", current.id()),
                );
                worklist.push(child);
            }
        }
    }
}
