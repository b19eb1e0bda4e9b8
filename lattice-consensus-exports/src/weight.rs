// Copyright (c) 2023 MASSA LABS <info@massa.net>

use crate::acceptance::AcceptanceState;
use crate::committee::ValidatorCommittee;
use lattice_models::prehash::PreHashSet;
use lattice_models::validator::ValidatorId;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::sync::Arc;

/// Immutable snapshot of a weight. Comparison is lexicographic: acceptance
/// state first, then validators weight, then cumulative weight (the derived
/// order relies on the field order below).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct WeightValue {
    acceptance_state: AcceptanceState,
    validators_weight: i64,
    cumulative_weight: i64,
}

impl WeightValue {
    /// Cumulative weight tier
    pub const fn cumulative_weight(&self) -> i64 {
        self.cumulative_weight
    }

    /// Validators weight tier
    pub const fn validators_weight(&self) -> i64 {
        self.validators_weight
    }

    /// Acceptance state tier
    pub const fn acceptance_state(&self) -> AcceptanceState {
        self.acceptance_state
    }

    /// Returns a copy with the cumulative weight replaced
    pub const fn with_cumulative_weight(mut self, weight: i64) -> Self {
        self.cumulative_weight = weight;
        self
    }

    /// Returns a copy with the given delta added to the cumulative weight
    pub const fn add_cumulative_weight(mut self, delta: i64) -> Self {
        self.cumulative_weight += delta;
        self
    }

    /// Returns a copy with the validators weight replaced
    pub const fn with_validators_weight(mut self, weight: i64) -> Self {
        self.validators_weight = weight;
        self
    }

    /// Returns a copy with the acceptance state replaced
    pub const fn with_acceptance_state(mut self, state: AcceptanceState) -> Self {
        self.acceptance_state = state;
        self
    }
}

impl std::fmt::Display for WeightValue {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "(state: {}, validators: {}, cumulative: {})",
            self.acceptance_state, self.validators_weight, self.cumulative_weight
        )
    }
}

struct WeightInner {
    value: WeightValue,
    voters: PreHashSet<ValidatorId>,
}

type OnUpdateFn = Box<dyn Fn(WeightValue) + Send + Sync>;

/// Mutable multi-tiered weight annotating a DAG vertex or a conflict.
///
/// All mutations and snapshots are serialised by the per-instance
/// reader-writer lock; `on_update` subscribers run with the lock released so
/// they may take value snapshots, but must not mutate this same weight
/// synchronously.
pub struct Weight {
    committee: Arc<ValidatorCommittee>,
    inner: RwLock<WeightInner>,
    subscribers: RwLock<Vec<OnUpdateFn>>,
}

impl Weight {
    /// Creates a zero weight attached to the given committee
    pub fn new(committee: Arc<ValidatorCommittee>) -> Self {
        Weight {
            committee,
            inner: RwLock::new(WeightInner {
                value: WeightValue::default(),
                voters: PreHashSet::default(),
            }),
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Registers a callback fired after every value change
    pub fn on_update<F: Fn(WeightValue) + Send + Sync + 'static>(&self, callback: F) {
        self.subscribers.write().push(Box::new(callback));
    }

    fn fire(&self, value: WeightValue) {
        for subscriber in self.subscribers.read().iter() {
            subscriber(value);
        }
    }

    /// Snapshot of the current value
    pub fn value(&self) -> WeightValue {
        self.inner.read().value
    }

    /// Current cumulative weight
    pub fn cumulative_weight(&self) -> i64 {
        self.inner.read().value.cumulative_weight()
    }

    /// Current acceptance state
    pub fn acceptance_state(&self) -> AcceptanceState {
        self.inner.read().value.acceptance_state()
    }

    /// Snapshot of the current voter set
    pub fn voters(&self) -> PreHashSet<ValidatorId> {
        self.inner.read().voters.clone()
    }

    /// Sets the cumulative weight, firing `on_update` if the value changed
    pub fn set_cumulative_weight(&self, weight: i64) {
        let updated = {
            let mut inner = self.inner.write();
            if inner.value.cumulative_weight() == weight {
                None
            } else {
                inner.value = inner.value.with_cumulative_weight(weight);
                Some(inner.value)
            }
        };
        if let Some(value) = updated {
            self.fire(value);
        }
    }

    /// Adds the given delta to the cumulative weight. No-op for a zero delta.
    pub fn add_cumulative_weight(&self, delta: i64) {
        if delta == 0 {
            return;
        }
        let value = {
            let mut inner = self.inner.write();
            inner.value = inner.value.add_cumulative_weight(delta);
            inner.value
        };
        self.fire(value);
    }

    /// Removes the given delta from the cumulative weight. No-op for a zero
    /// delta.
    pub fn remove_cumulative_weight(&self, delta: i64) {
        self.add_cumulative_weight(-delta);
    }

    /// Adds a voter, recomputing the validators weight from the committee.
    /// Returns whether the voter was newly added.
    pub fn add_voter(&self, id: ValidatorId) -> bool {
        let (added, updated) = {
            let mut inner = self.inner.write();
            if !inner.voters.insert(id) {
                (false, None)
            } else {
                let delta = self.committee.weight_of(&id).unwrap_or(0) as i64;
                if delta == 0 {
                    (true, None)
                } else {
                    let new_weight = inner.value.validators_weight() + delta;
                    inner.value = inner.value.with_validators_weight(new_weight);
                    (true, Some(inner.value))
                }
            }
        };
        if let Some(value) = updated {
            self.fire(value);
        }
        added
    }

    /// Removes a voter, recomputing the validators weight from the committee.
    /// Returns whether the voter was present.
    pub fn delete_voter(&self, id: &ValidatorId) -> bool {
        let (removed, updated) = {
            let mut inner = self.inner.write();
            if !inner.voters.remove(id) {
                (false, None)
            } else {
                let delta = self.committee.weight_of(id).unwrap_or(0) as i64;
                if delta == 0 {
                    (true, None)
                } else {
                    let new_weight = inner.value.validators_weight() - delta;
                    inner.value = inner.value.with_validators_weight(new_weight);
                    (true, Some(inner.value))
                }
            }
        };
        if let Some(value) = updated {
            self.fire(value);
        }
        removed
    }

    /// Sets the acceptance state and returns the previous one, firing
    /// `on_update` iff the state changed
    pub fn set_acceptance_state(&self, state: AcceptanceState) -> AcceptanceState {
        let (previous, updated) = {
            let mut inner = self.inner.write();
            let previous = inner.value.acceptance_state();
            if previous == state {
                (previous, None)
            } else {
                inner.value = inner.value.with_acceptance_state(state);
                (previous, Some(inner.value))
            }
        };
        if let Some(value) = updated {
            self.fire(value);
        }
        previous
    }

    /// Sets the acceptance state without firing `on_update`, for use during
    /// construction
    pub fn with_acceptance_state(self, state: AcceptanceState) -> Self {
        {
            let mut inner = self.inner.write();
            inner.value = inner.value.with_acceptance_state(state);
        }
        self
    }

    /// Three-way comparison between two optional weights. An absent weight
    /// compares as heavier than any present one, so sentinel roots win
    /// against every real vertex.
    pub fn compare(lhs: Option<&Weight>, rhs: Option<&Weight>) -> Ordering {
        match (lhs, rhs) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => a.value().cmp(&b.value()),
        }
    }
}

impl std::fmt::Debug for Weight {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("Weight")
            .field("value", &inner.value)
            .field("voters", &inner.voters.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_hash::Hash;
    use lattice_models::prehash::PreHashMap;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    fn validator(seed: &str) -> ValidatorId {
        ValidatorId(Hash::compute_from(seed.as_bytes()))
    }

    fn committee(entries: &[(&str, u64)]) -> Arc<ValidatorCommittee> {
        let mut weights = PreHashMap::default();
        for (seed, weight) in entries {
            weights.insert(validator(seed), *weight);
        }
        Arc::new(ValidatorCommittee::new(weights))
    }

    #[test]
    fn test_value_comparison_is_lexicographic() {
        let heavy_pending = WeightValue::default().with_cumulative_weight(1_000);
        let light_accepted = WeightValue::default()
            .with_acceptance_state(AcceptanceState::Accepted)
            .with_cumulative_weight(1);
        assert!(light_accepted > heavy_pending);

        let more_validators = WeightValue::default().with_validators_weight(10);
        let more_cumulative = WeightValue::default()
            .with_validators_weight(5)
            .with_cumulative_weight(1_000);
        assert!(more_validators > more_cumulative);

        assert!(
            WeightValue::default().with_acceptance_state(AcceptanceState::Rejected)
                < WeightValue::default()
        );
    }

    #[test]
    fn test_on_update_fires_only_on_change() {
        let weight = Weight::new(committee(&[("v1", 10)]));
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        weight.on_update(move |_| {
            fired_clone.fetch_add(1, AtomicOrdering::SeqCst);
        });

        weight.add_cumulative_weight(0);
        assert_eq!(fired.load(AtomicOrdering::SeqCst), 0);

        weight.add_cumulative_weight(5);
        assert_eq!(fired.load(AtomicOrdering::SeqCst), 1);

        weight.set_cumulative_weight(5);
        assert_eq!(fired.load(AtomicOrdering::SeqCst), 1);

        let previous = weight.set_acceptance_state(AcceptanceState::Accepted);
        assert_eq!(previous, AcceptanceState::Pending);
        assert_eq!(fired.load(AtomicOrdering::SeqCst), 2);

        let previous = weight.set_acceptance_state(AcceptanceState::Accepted);
        assert_eq!(previous, AcceptanceState::Accepted);
        assert_eq!(fired.load(AtomicOrdering::SeqCst), 2);
    }

    #[test]
    fn test_voters_drive_validators_weight() {
        let weight = Weight::new(committee(&[("v1", 10), ("v2", 7)]));
        assert!(weight.add_voter(validator("v1")));
        assert_eq!(weight.value().validators_weight(), 10);

        // adding twice is a no-op
        assert!(!weight.add_voter(validator("v1")));
        assert_eq!(weight.value().validators_weight(), 10);

        assert!(weight.add_voter(validator("v2")));
        assert_eq!(weight.value().validators_weight(), 17);

        // a voter outside the committee contributes nothing
        assert!(weight.add_voter(validator("stranger")));
        assert_eq!(weight.value().validators_weight(), 17);

        assert!(weight.delete_voter(&validator("v1")));
        assert_eq!(weight.value().validators_weight(), 7);
    }

    #[test]
    fn test_compare_with_sentinel_roots() {
        let a = Weight::new(committee(&[]));
        a.add_cumulative_weight(100);
        assert_eq!(Weight::compare(None, Some(&a)), Ordering::Greater);
        assert_eq!(Weight::compare(Some(&a), None), Ordering::Less);
        assert_eq!(Weight::compare(None, None), Ordering::Equal);
        let b = Weight::new(committee(&[]));
        b.add_cumulative_weight(50);
        assert_eq!(Weight::compare(Some(&a), Some(&b)), Ordering::Greater);
    }
}
