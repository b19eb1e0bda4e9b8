// Copyright (c) 2023 MASSA LABS <info@massa.net>

use crate::chain::chain::ChainId;
use lattice_consensus_exports::error::{ConsensusError, ConsensusResult};
use lattice_models::commitment::Commitment;
use lattice_models::commitment_id::CommitmentId;
use lattice_models::slot::Slot;
use parking_lot::RwLock;

/// How a freshly registered child relates to the chain of its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildRegistration {
    /// the child id was already registered on this parent
    AlreadyRegistered,
    /// the child extends the parent's chain (which may not be known yet)
    Inherited(Option<ChainId>),
    /// the parent already had a main child: the new child forks off
    Forked,
}

struct Inner {
    commitment: Option<Commitment>,
    solid: bool,
    children: Vec<CommitmentId>,
    main_child: Option<CommitmentId>,
    chain: Option<ChainId>,
}

/// A commitment as tracked by the chain manager: the payload once published,
/// the solid flag, the registered children with the designated main child,
/// and a back-reference to the chain it currently belongs to.
pub struct ChainCommitment {
    id: CommitmentId,
    inner: RwLock<Inner>,
}

impl ChainCommitment {
    /// Creates an unpublished commitment entry for the given id
    pub fn new(id: CommitmentId) -> Self {
        ChainCommitment {
            id,
            inner: RwLock::new(Inner {
                commitment: None,
                solid: false,
                children: Vec::new(),
                main_child: None,
                chain: None,
            }),
        }
    }

    /// Id of the commitment
    pub fn id(&self) -> CommitmentId {
        self.id
    }

    /// Slot the commitment seals
    pub fn slot(&self) -> Slot {
        self.id.slot()
    }

    /// The payload, once received
    pub fn commitment(&self) -> Option<Commitment> {
        self.inner.read().commitment
    }

    /// Publishes the payload. Returns true on the first call only.
    pub fn publish_commitment(&self, commitment: Commitment) -> bool {
        debug_assert_eq!(commitment.id(), self.id);
        let mut inner = self.inner.write();
        if inner.commitment.is_some() {
            return false;
        }
        inner.commitment = Some(commitment);
        true
    }

    /// Returns whether this commitment connects back to the root
    pub fn is_solid(&self) -> bool {
        self.inner.read().solid
    }

    /// Sets the solid flag, returning whether it changed
    pub fn set_solid(&self, solid: bool) -> bool {
        let mut inner = self.inner.write();
        if inner.solid == solid {
            return false;
        }
        inner.solid = solid;
        true
    }

    /// The chain this commitment currently belongs to
    pub fn chain(&self) -> Option<ChainId> {
        self.inner.read().chain
    }

    /// Sets the chain if none is set yet; returns whether it was set
    pub fn publish_chain(&self, chain: ChainId) -> bool {
        let mut inner = self.inner.write();
        if inner.chain.is_some() {
            return false;
        }
        inner.chain = Some(chain);
        true
    }

    /// Unconditionally swaps the chain, returning the previous one
    pub fn replace_chain(&self, chain: ChainId) -> Option<ChainId> {
        let mut inner = self.inner.write();
        inner.chain.replace(chain)
    }

    /// Registered children, in registration order
    pub fn children(&self) -> Vec<CommitmentId> {
        self.inner.read().children.clone()
    }

    /// The designated extension of this commitment, if any
    pub fn main_child(&self) -> Option<CommitmentId> {
        self.inner.read().main_child
    }

    /// Redesignates the main child during a reorg. The child must already be
    /// registered.
    pub fn set_main_child(&self, child: CommitmentId) -> ConsensusResult<()> {
        let mut inner = self.inner.write();
        if !inner.children.contains(&child) {
            return Err(ConsensusError::ContainerInconsistency(format!(
                "{} is not a child of {}",
                child, self.id
            )));
        }
        inner.main_child = Some(child);
        Ok(())
    }

    /// Detaches a child (used when the old main chain is orphaned)
    pub fn delete_child(&self, child: &CommitmentId) {
        let mut inner = self.inner.write();
        inner.children.retain(|id| id != child);
        if inner.main_child == Some(*child) {
            inner.main_child = None;
        }
    }

    /// Registers a child, idempotent by child id. Returns the parent's solid
    /// flag and how the child relates to the parent's chain: the first child
    /// inherits it, later children fork off into a chain of their own.
    pub fn register_child(&self, child: CommitmentId) -> (bool, ChildRegistration) {
        let mut inner = self.inner.write();
        if inner.children.contains(&child) {
            return (inner.solid, ChildRegistration::AlreadyRegistered);
        }
        inner.children.push(child);
        if inner.main_child.is_none() {
            inner.main_child = Some(child);
            (inner.solid, ChildRegistration::Inherited(inner.chain))
        } else {
            (inner.solid, ChildRegistration::Forked)
        }
    }
}

impl std::fmt::Debug for ChainCommitment {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("ChainCommitment")
            .field("id", &self.id)
            .field("published", &inner.commitment.is_some())
            .field("solid", &inner.solid)
            .field("children", &inner.children.len())
            .field("main_child", &inner.main_child)
            .field("chain", &inner.chain)
            .finish()
    }
}
