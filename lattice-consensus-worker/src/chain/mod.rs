// Copyright (c) 2023 MASSA LABS <info@massa.net>
//! Chain manager: organises slot commitments into a forest of chains rooted
//! at the last known-good commitment, detects forks announced by peers and
//! performs main-chain reorganisations.

#[allow(clippy::module_inception)]
mod chain;
mod commitment;
mod manager;
mod requester;

pub use chain::{Chain, ChainId};
pub use commitment::{ChainCommitment, ChildRegistration};
pub use manager::ChainManager;
