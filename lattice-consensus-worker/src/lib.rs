// Copyright (c) 2023 MASSA LABS <info@massa.net>
//! Consensus core worker: the block DAG with its causal-order solidifier and
//! the chain manager tracking slot-commitment chains, forks and main-chain
//! reorganisations.
//!
//! The worker runs on a dedicated thread and processes commands received
//! through the controller; reads go through the shared state directly.

/// chain manager: commitment chains, forks, reorgs
pub mod chain;
/// block DAG: attach, solidify, park, evict
pub mod dag;
/// per-id lock table
pub mod sync;

mod commands;
mod controller;
mod manager;
mod worker;

#[cfg(test)]
mod tests;

pub use commands::ConsensusCommand;
pub use worker::start_consensus_worker;
