// Copyright (c) 2023 MASSA LABS <info@massa.net>

use lattice_time::LatticeTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConsensusConfig {
    /// A fork is only recorded when the forked chain extends at least this
    /// many slots past its forking point.
    pub minimum_fork_depth: u64,
    /// Period between two re-requests of a still-missing commitment.
    pub commitment_request_period: LatticeTime,
    /// Capacity of the worker command channel.
    pub channel_size: usize,
    /// Capacity of each broadcast event stream.
    pub event_channel_capacity: usize,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        ConsensusConfig {
            minimum_fork_depth: 3,
            commitment_request_period: LatticeTime::from_millis(500),
            channel_size: 1024,
            event_channel_capacity: 256,
        }
    }
}
