use crate::governance::state::{StableGovernanceState, GOVERNANCE_STATE};
use crate::governance::types::GovernanceConfig;
use candid::{CandidType, Principal};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeSet;

/// State structure for the Governance Core canister
///
/// Holds access control, the member registry (the eligible-voter count
/// source snapshotted when voting opens) and the governance
/// configuration. Proposals and votes live in the governance module's
/// own state.
#[derive(Default)]
pub struct State {
    // Access control: controllers act as moderators
    pub controllers: Vec<Principal>,

    // Member registry
    pub members: BTreeSet<Principal>,

    // Governance parameters
    pub config: GovernanceConfig,
}

impl State {
    pub fn new() -> Self {
        Self {
            controllers: Vec::new(),
            members: BTreeSet::new(),
            config: GovernanceConfig::default(),
        }
    }

    /// Check if a principal is a controller
    pub fn is_controller(&self, principal: &Principal) -> bool {
        self.controllers.contains(principal)
    }

    /// Get list of controllers
    pub fn get_controllers(&self) -> Vec<Principal> {
        self.controllers.clone()
    }

    /// Check if a principal is a registered member
    pub fn is_member(&self, principal: &Principal) -> bool {
        self.members.contains(principal)
    }

    /// Register a member; returns false if already registered
    pub fn register_member(&mut self, principal: Principal) -> bool {
        self.members.insert(principal)
    }

    /// Remove a member; returns false if not registered
    pub fn remove_member(&mut self, principal: &Principal) -> bool {
        self.members.remove(principal)
    }

    /// Count of members currently eligible to vote
    pub fn member_count(&self) -> u64 {
        self.members.len() as u64
    }
}

thread_local! {
    pub static STATE: RefCell<State> = RefCell::new(State::new());
}

// =============================================================================
// Stable Storage Types
// =============================================================================

/// Serializable state for canister upgrades, including the governance
/// module's state so a single `stable_save` covers the whole canister.
#[derive(CandidType, Deserialize, Serialize, Clone, Default)]
pub struct StableState {
    pub controllers: Vec<Principal>,
    pub members: Vec<Principal>,
    pub config: GovernanceConfig,
    pub governance: StableGovernanceState,
}

impl From<&State> for StableState {
    fn from(state: &State) -> Self {
        let governance =
            GOVERNANCE_STATE.with(|gov| StableGovernanceState::from(&*gov.borrow()));
        StableState {
            controllers: state.controllers.clone(),
            members: state.members.iter().cloned().collect(),
            config: state.config,
            governance,
        }
    }
}

impl StableState {
    /// Restore both the root state and the governance module state
    pub fn restore(self) -> State {
        GOVERNANCE_STATE.with(|gov| {
            *gov.borrow_mut() = self.governance.into();
        });
        State {
            controllers: self.controllers,
            members: self.members.into_iter().collect(),
            config: self.config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(n: u8) -> Principal {
        Principal::from_slice(&[n, 7])
    }

    #[test]
    fn member_registry_counts_unique_members() {
        let mut state = State::new();
        assert!(state.register_member(principal(1)));
        assert!(state.register_member(principal(2)));
        assert!(!state.register_member(principal(1)));
        assert_eq!(state.member_count(), 2);

        assert!(state.remove_member(&principal(1)));
        assert!(!state.remove_member(&principal(1)));
        assert_eq!(state.member_count(), 1);
        assert!(state.is_member(&principal(2)));
        assert!(!state.is_member(&principal(1)));
    }

    #[test]
    fn stable_state_round_trips() {
        let mut state = State::new();
        state.controllers.push(principal(9));
        state.register_member(principal(1));
        state.config.quorum_percent = 66;

        let stable = StableState::from(&state);
        let restored = stable.restore();

        assert!(restored.is_controller(&principal(9)));
        assert!(restored.is_member(&principal(1)));
        assert_eq!(restored.config.quorum_percent, 66);
    }
}
