// Copyright (c) 2023 MASSA LABS <info@massa.net>

use displaydoc::Display;
use thiserror::Error;

/// models error
#[non_exhaustive]
#[derive(Display, Error, Debug, Clone)]
pub enum ModelsError {
    /// Serialization error: {0}
    SerializeError(String),
    /// Deserialization error: {0}
    DeserializeError(String),
    /// block id parsing error
    BlockIdParseError,
    /// commitment id parsing error
    CommitmentIdParseError,
    /// peer id parsing error
    PeerIdParseError,
    /// validator id parsing error
    ValidatorIdParseError,
    /// time error: {0}
    TimeError(#[from] lattice_time::TimeError),
    /// hash error: {0}
    HashError(#[from] lattice_hash::LatticeHashError),
}

impl From<lattice_serialization::SerializeError> for ModelsError {
    fn from(err: lattice_serialization::SerializeError) -> Self {
        ModelsError::SerializeError(err.to_string())
    }
}
