// Copyright (c) 2023 MASSA LABS <info@massa.net>

use lattice_consensus_exports::providers::RootBlock;
use lattice_models::block::{Block, Parent, ParentKind};
use lattice_models::block_id::BlockId;
use lattice_models::commitment_id::CommitmentId;
use lattice_models::prehash::PreHashSet;
use lattice_models::slot::Slot;
use lattice_time::LatticeTime;
use parking_lot::RwLock;
use std::sync::Arc;

/// What the DAG knows about the block body.
enum BlockBody {
    /// referenced as a parent but never received
    Missing(BlockId),
    /// full block data
    Present(Arc<Block>),
    /// synthetic anchor from an already-committed slot
    Root(RootBlock),
}

struct Inner {
    body: BlockBody,
    solid: bool,
    invalid: bool,
    orphaned: bool,
    future: bool,
    strong_children: Vec<Arc<BlockMetadata>>,
    weak_children: Vec<Arc<BlockMetadata>>,
    shallow_like_children: Vec<Arc<BlockMetadata>>,
}

/// A block annotated with the mutable DAG metadata: solidity flags and the
/// child lists mirroring the three parent edge kinds.
pub struct BlockMetadata {
    inner: RwLock<Inner>,
}

impl BlockMetadata {
    fn with_body(body: BlockBody, solid: bool) -> Self {
        BlockMetadata {
            inner: RwLock::new(Inner {
                body,
                solid,
                invalid: false,
                orphaned: false,
                future: false,
                strong_children: Vec::new(),
                weak_children: Vec::new(),
                shallow_like_children: Vec::new(),
            }),
        }
    }

    /// Creates the metadata for a received block
    pub fn new(data: Arc<Block>) -> Self {
        Self::with_body(BlockBody::Present(data), false)
    }

    /// Creates a placeholder for a block that was referenced as a parent but
    /// not received yet
    pub fn new_missing(id: BlockId) -> Self {
        Self::with_body(BlockBody::Missing(id), false)
    }

    /// Creates the metadata of a root block; root blocks are implicitly solid
    pub fn new_root(root: RootBlock) -> Self {
        Self::with_body(BlockBody::Root(root), true)
    }

    /// Id of the block
    pub fn id(&self) -> BlockId {
        match &self.inner.read().body {
            BlockBody::Missing(id) => *id,
            BlockBody::Present(block) => block.id(),
            BlockBody::Root(root) => root.id,
        }
    }

    /// Slot the block belongs to
    pub fn slot(&self) -> Slot {
        self.id().slot()
    }

    /// Issuing time, unknown while the block is missing
    pub fn issuing_time(&self) -> Option<LatticeTime> {
        match &self.inner.read().body {
            BlockBody::Missing(_) => None,
            BlockBody::Present(block) => Some(block.issuing_time()),
            BlockBody::Root(root) => Some(root.issuing_time),
        }
    }

    /// Declared slot commitment, unknown while the block is missing
    pub fn slot_commitment_id(&self) -> Option<CommitmentId> {
        match &self.inner.read().body {
            BlockBody::Missing(_) => None,
            BlockBody::Present(block) => Some(block.slot_commitment_id()),
            BlockBody::Root(root) => Some(root.slot_commitment_id),
        }
    }

    /// Typed parent references; empty for missing placeholders and roots
    pub fn parents(&self) -> Vec<Parent> {
        match &self.inner.read().body {
            BlockBody::Present(block) => block.parents().to_vec(),
            _ => Vec::new(),
        }
    }

    /// The block data, if received
    pub fn block(&self) -> Option<Arc<Block>> {
        match &self.inner.read().body {
            BlockBody::Present(block) => Some(block.clone()),
            _ => None,
        }
    }

    /// Returns whether the block data hasn't been received yet
    pub fn is_missing(&self) -> bool {
        matches!(self.inner.read().body, BlockBody::Missing(_))
    }

    /// Returns whether this is a root anchor
    pub fn is_root(&self) -> bool {
        matches!(self.inner.read().body, BlockBody::Root(_))
    }

    /// Returns whether the entire causal history of the block is known
    pub fn is_solid(&self) -> bool {
        self.inner.read().solid
    }

    /// Returns whether the block was rejected
    pub fn is_invalid(&self) -> bool {
        self.inner.read().invalid
    }

    /// Returns whether the block was orphaned
    pub fn is_orphaned(&self) -> bool {
        self.inner.read().orphaned
    }

    /// Returns whether the block is parked until its declared commitment slot
    /// is committed locally
    pub fn is_future(&self) -> bool {
        self.inner.read().future
    }

    /// Marks the block solid, returning whether the flag changed
    pub fn set_solid(&self) -> bool {
        let mut inner = self.inner.write();
        if inner.solid {
            return false;
        }
        inner.solid = true;
        true
    }

    /// Marks the block invalid, returning whether the flag changed
    pub fn set_invalid(&self) -> bool {
        let mut inner = self.inner.write();
        if inner.invalid {
            return false;
        }
        inner.invalid = true;
        true
    }

    /// Sets the orphaned flag, returning whether it changed
    pub fn set_orphaned(&self, orphaned: bool) -> bool {
        let mut inner = self.inner.write();
        if inner.orphaned == orphaned {
            return false;
        }
        inner.orphaned = orphaned;
        true
    }

    /// Flags the block as a future block, returning whether the flag changed
    pub fn set_future(&self) -> bool {
        let mut inner = self.inner.write();
        if inner.future {
            return false;
        }
        inner.future = true;
        true
    }

    /// Publishes the block data into a missing placeholder. Returns false if
    /// the block was not missing.
    pub fn update(&self, data: Arc<Block>) -> bool {
        let mut inner = self.inner.write();
        if !matches!(inner.body, BlockBody::Missing(_)) {
            return false;
        }
        inner.body = BlockBody::Present(data);
        true
    }

    /// Registers a child on the list matching the edge kind
    pub fn append_child(&self, kind: ParentKind, child: Arc<BlockMetadata>) {
        let mut inner = self.inner.write();
        match kind {
            ParentKind::Strong => inner.strong_children.push(child),
            ParentKind::Weak => inner.weak_children.push(child),
            ParentKind::ShallowLike => inner.shallow_like_children.push(child),
        }
    }

    /// Children reachable over strong edges
    pub fn strong_children(&self) -> Vec<Arc<BlockMetadata>> {
        self.inner.read().strong_children.clone()
    }

    /// Children reachable over weak edges
    pub fn weak_children(&self) -> Vec<Arc<BlockMetadata>> {
        self.inner.read().weak_children.clone()
    }

    /// Children reachable over shallow-like edges
    pub fn shallow_like_children(&self) -> Vec<Arc<BlockMetadata>> {
        self.inner.read().shallow_like_children.clone()
    }

    /// Union of the children over all edge kinds, deduplicated by id
    pub fn children(&self) -> Vec<Arc<BlockMetadata>> {
        let inner = self.inner.read();
        let mut seen: PreHashSet<BlockId> = PreHashSet::default();
        let mut children = Vec::new();
        for list in [
            &inner.strong_children,
            &inner.weak_children,
            &inner.shallow_like_children,
        ] {
            for child in list {
                if seen.insert(child.id()) {
                    children.push(child.clone());
                }
            }
        }
        children
    }
}

impl std::fmt::Debug for BlockMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let inner = self.inner.read();
        let id = match &inner.body {
            BlockBody::Missing(id) => *id,
            BlockBody::Present(block) => block.id(),
            BlockBody::Root(root) => root.id,
        };
        f.debug_struct("BlockMetadata")
            .field("id", &id)
            .field("missing", &matches!(inner.body, BlockBody::Missing(_)))
            .field("solid", &inner.solid)
            .field("invalid", &inner.invalid)
            .field("orphaned", &inner.orphaned)
            .field("future", &inner.future)
            .finish()
    }
}
