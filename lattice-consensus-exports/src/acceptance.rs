// Copyright (c) 2023 MASSA LABS <info@massa.net>

use serde::{Deserialize, Serialize};

/// Acceptance state of a vertex or conflict. The derived order is the one
/// used by weight comparisons: `Rejected < Pending < Accepted < Confirmed`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum AcceptanceState {
    /// actively rejected, will never be accepted
    Rejected,
    /// no decision yet
    #[default]
    Pending,
    /// accepted by the online committee
    Accepted,
    /// confirmed by the total committee, irreversible
    Confirmed,
}

impl AcceptanceState {
    /// Returns whether the state is at least `Accepted`
    pub fn is_accepted(&self) -> bool {
        *self >= AcceptanceState::Accepted
    }

    /// Returns whether the state is `Confirmed`
    pub fn is_confirmed(&self) -> bool {
        *self == AcceptanceState::Confirmed
    }

    /// Returns whether the state is `Rejected`
    pub fn is_rejected(&self) -> bool {
        *self == AcceptanceState::Rejected
    }
}

impl std::fmt::Display for AcceptanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            AcceptanceState::Rejected => write!(f, "rejected"),
            AcceptanceState::Pending => write!(f, "pending"),
            AcceptanceState::Accepted => write!(f, "accepted"),
            AcceptanceState::Confirmed => write!(f, "confirmed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_ordering() {
        assert!(AcceptanceState::Rejected < AcceptanceState::Pending);
        assert!(AcceptanceState::Pending < AcceptanceState::Accepted);
        assert!(AcceptanceState::Accepted < AcceptanceState::Confirmed);
        assert!(AcceptanceState::Confirmed.is_accepted());
        assert!(!AcceptanceState::Pending.is_accepted());
    }
}
