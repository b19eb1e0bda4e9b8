// Copyright (c) 2023 MASSA LABS <info@massa.net>

use lattice_models::prehash::PreHashMap;
use lattice_models::validator::ValidatorId;

/// The validator committee of the current epoch, mapping each validator to
/// its stake weight. Shared read-only between all `Weight` instances.
#[derive(Debug, Clone, Default)]
pub struct ValidatorCommittee {
    weights: PreHashMap<ValidatorId, u64>,
    total_weight: u64,
}

impl ValidatorCommittee {
    /// Builds a committee from validator weights
    pub fn new(weights: PreHashMap<ValidatorId, u64>) -> Self {
        let total_weight = weights.values().sum();
        ValidatorCommittee {
            weights,
            total_weight,
        }
    }

    /// Stake weight of the given validator, if it is part of the committee
    pub fn weight_of(&self, id: &ValidatorId) -> Option<u64> {
        self.weights.get(id).copied()
    }

    /// Returns whether the validator is part of the committee
    pub fn contains(&self, id: &ValidatorId) -> bool {
        self.weights.contains_key(id)
    }

    /// Sum of all committee weights
    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    /// Number of validators in the committee
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Returns whether the committee is empty
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}
