// Copyright (c) 2023 MASSA LABS <info@massa.net>
use displaydoc::Display;
use lattice_models::commitment_id::CommitmentId;
use lattice_models::slot::Slot;
use lattice_models::ModelsError;
use thiserror::Error;

/// Consensus result
pub type ConsensusResult<T, E = ConsensusError> = core::result::Result<T, E>;

#[non_exhaustive]
#[derive(Display, Error, Debug, Clone)]
pub enum ConsensusError {
    /// unknown commitment: {0}
    CommitmentUnknown(CommitmentId),
    /// commitment not solid: {0}
    CommitmentNotSolid(CommitmentId),
    /// slot {0} is below the eviction horizon
    BelowEvictionHorizon(Slot),
    /// invalid reference: {0}
    InvalidReference(String),
    /// models error: {0}
    ModelsError(#[from] ModelsError),
    /// time error: {0}
    TimeError(#[from] lattice_time::TimeError),
    /// there was an inconsistency between containers: {0}
    ContainerInconsistency(String),
    /// channel error: {0}
    ChannelError(String),
}
