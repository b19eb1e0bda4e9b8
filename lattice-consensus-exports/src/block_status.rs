// Copyright (c) 2023 MASSA LABS <info@massa.net>

use serde::{Deserialize, Serialize};

/// Status of a block as seen by queries on the DAG. When several flags apply,
/// the most decisive one wins: invalid and orphaned take precedence over
/// solid, solid over future, future over attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockStatus {
    /// the block is unknown to the DAG
    NotFound,
    /// the block was referenced as a parent but its data was never received
    Missing,
    /// the block data is known but its past cone is not complete yet
    Attached,
    /// the block is parked until its declared commitment slot is committed
    Future,
    /// the whole causal past of the block is known
    Solid,
    /// the block was rejected
    Invalid,
    /// the block was orphaned
    Orphaned,
}
