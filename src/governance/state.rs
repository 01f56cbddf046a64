//! State management for the Governance module
//!
//! `ProposalRepository` is the seam between the governance logic and
//! storage; `GovernanceState` is the canister's in-memory implementation,
//! held in a `thread_local!` and mirrored to stable storage across
//! upgrades.

use candid::{CandidType, Principal};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;

use super::tally::{decide_outcome, tally_votes};
use super::types::*;
use super::validation::validate_status_transition;

/// Storage contract required by the governance module.
///
/// Any storage technology can be substituted at this seam without
/// touching validation or tallying. Implementations must apply each
/// vote as an atomic upsert keyed by `(ProposalId, Principal)` — a
/// member re-voting overwrites only their own entry, and votes from
/// different members can never clobber one another. Implementations
/// backed by remote storage must bound their wait and surface
/// [`GovernanceError::Unavailable`] rather than hang; the in-canister
/// store never raises it.
pub trait ProposalRepository {
    /// Persist a new proposal in `Draft`, assigning its id.
    /// Fails with `Validation` if record invariants are violated.
    fn create(&mut self, proposal: Proposal) -> Result<ProposalId, GovernanceError>;

    /// Fetch a proposal, `NotFound` if the id does not exist.
    fn get(&self, id: ProposalId) -> Result<Proposal, GovernanceError>;

    /// List proposals in a category, optionally narrowed by status.
    fn list_by_category(
        &self,
        category: ProposalCategory,
        status: Option<ProposalStatus>,
    ) -> Vec<Proposal>;

    /// Upsert a member's vote and return the recomputed tally.
    /// Fails with `InvalidState` if the proposal is not in `Voting` or
    /// the deadline has passed. An overwrite of the member's earlier
    /// choice is permitted and reported via `VoteReceipt.previous_vote`.
    fn record_vote(
        &mut self,
        id: ProposalId,
        member: Principal,
        choice: VoteChoice,
        now: Timestamp,
    ) -> Result<VoteReceipt, GovernanceError>;

    /// Apply a status transition, enforcing the lifecycle rules.
    ///
    /// `eligible_members` is the registry count snapshotted when voting
    /// opens; it is ignored for other transitions. A transition to the
    /// status the proposal already terminally holds is a no-op, so
    /// repeated resolution sweeps cannot fail.
    fn transition(
        &mut self,
        id: ProposalId,
        target: ProposalStatus,
        now: Timestamp,
        eligible_members: u64,
        config: &GovernanceConfig,
    ) -> Result<Proposal, GovernanceError>;
}

/// In-memory governance state
#[derive(Default)]
pub struct GovernanceState {
    /// All proposals by ID
    pub proposals: BTreeMap<ProposalId, Proposal>,
    /// (Proposal ID, member) -> current vote; the per-member upsert key
    pub votes: BTreeMap<(ProposalId, Principal), VoteChoice>,
    /// Proposer -> proposal IDs they submitted
    pub proposer_index: BTreeMap<Principal, Vec<ProposalId>>,
    /// Next proposal ID counter
    pub next_proposal_id: ProposalId,
}

impl GovernanceState {
    pub fn new() -> Self {
        Self {
            proposals: BTreeMap::new(),
            votes: BTreeMap::new(),
            proposer_index: BTreeMap::new(),
            next_proposal_id: 1,
        }
    }

    fn next_proposal_id(&mut self) -> ProposalId {
        let id = self.next_proposal_id;
        self.next_proposal_id += 1;
        id
    }

    pub fn get_proposal(&self, id: ProposalId) -> Option<&Proposal> {
        self.proposals.get(&id)
    }

    /// Snapshot the current vote set for one proposal
    pub fn votes_for_proposal(&self, id: ProposalId) -> BTreeMap<Principal, VoteChoice> {
        self.votes
            .iter()
            .filter(|((pid, _), _)| *pid == id)
            .map(|((_, member), choice)| (*member, *choice))
            .collect()
    }

    /// List proposals with optional filter and pagination
    pub fn list_proposals(
        &self,
        filter: Option<ProposalFilter>,
        pagination: Option<ProposalPaginationParams>,
    ) -> PaginatedProposalResponse {
        // A proposer filter narrows through the index; ids are assigned
        // sequentially, so index order matches full-scan order
        let mut proposals: Vec<Proposal> = match filter.as_ref().and_then(|f| f.proposer) {
            Some(proposer) => self
                .proposer_index
                .get(&proposer)
                .map(|ids| {
                    ids.iter()
                        .filter_map(|id| self.proposals.get(id))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default(),
            None => self.proposals.values().cloned().collect(),
        };

        if let Some(ref f) = filter {
            if let Some(category) = f.category {
                proposals.retain(|p| p.category == category);
            }
            if let Some(status) = f.status {
                proposals.retain(|p| p.status == status);
            }
        }

        let total = proposals.len() as u64;
        let pagination = pagination.unwrap_or_default();
        let offset = pagination.offset.unwrap_or(0);
        let limit = pagination.limit.unwrap_or(DEFAULT_PAGE_LIMIT);

        let items = proposals
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();

        PaginatedProposalResponse {
            items,
            total,
            offset,
            limit,
        }
    }

    /// Proposal IDs currently in `Voting` whose deadline has passed
    pub fn due_proposal_ids(&self, now: Timestamp) -> Vec<ProposalId> {
        self.proposals
            .values()
            .filter(|p| {
                p.status == ProposalStatus::Voting
                    && p.voting_deadline.map_or(false, |d| now >= d)
            })
            .map(|p| p.id)
            .collect()
    }
}

impl ProposalRepository for GovernanceState {
    fn create(&mut self, mut proposal: Proposal) -> Result<ProposalId, GovernanceError> {
        let mut errors = Vec::new();
        if proposal.title.chars().count() < MIN_TITLE_LEN {
            errors.push(FieldError::new(
                "title",
                format!("Title must be at least {} characters", MIN_TITLE_LEN),
            ));
        }
        if proposal.description.chars().count() < MIN_DESCRIPTION_LEN {
            errors.push(FieldError::new(
                "description",
                format!(
                    "Description must be at least {} characters",
                    MIN_DESCRIPTION_LEN
                ),
            ));
        }
        if !errors.is_empty() {
            return Err(GovernanceError::Validation(errors));
        }

        let id = self.next_proposal_id();
        proposal.id = id;
        proposal.status = ProposalStatus::Draft;
        proposal.impact = proposal.category.rules().impact;

        self.proposer_index
            .entry(proposal.proposer)
            .or_default()
            .push(id);
        self.proposals.insert(id, proposal);

        Ok(id)
    }

    fn get(&self, id: ProposalId) -> Result<Proposal, GovernanceError> {
        self.proposals
            .get(&id)
            .cloned()
            .ok_or(GovernanceError::NotFound)
    }

    fn list_by_category(
        &self,
        category: ProposalCategory,
        status: Option<ProposalStatus>,
    ) -> Vec<Proposal> {
        self.proposals
            .values()
            .filter(|p| p.category == category)
            .filter(|p| status.map_or(true, |s| p.status == s))
            .cloned()
            .collect()
    }

    fn record_vote(
        &mut self,
        id: ProposalId,
        member: Principal,
        choice: VoteChoice,
        now: Timestamp,
    ) -> Result<VoteReceipt, GovernanceError> {
        let proposal = self.proposals.get(&id).ok_or(GovernanceError::NotFound)?;

        if proposal.status != ProposalStatus::Voting {
            return Err(GovernanceError::InvalidState(format!(
                "Cannot vote on a proposal in {:?} status",
                proposal.status
            )));
        }
        if let Some(deadline) = proposal.voting_deadline {
            if now >= deadline {
                return Err(GovernanceError::InvalidState(
                    "Voting deadline has passed".to_string(),
                ));
            }
        }

        let total_eligible = proposal.total_eligible;
        let previous_vote = self.votes.insert((id, member), choice);

        // Vote count can never exceed the eligibility snapshot
        let votes = self.votes_for_proposal(id);
        if previous_vote.is_none() && votes.len() as u64 > total_eligible {
            self.votes.remove(&(id, member));
            return Err(GovernanceError::InvalidState(
                "Vote count would exceed eligible members".to_string(),
            ));
        }

        let tally = tally_votes(&votes, total_eligible);
        Ok(VoteReceipt {
            tally,
            previous_vote,
        })
    }

    fn transition(
        &mut self,
        id: ProposalId,
        target: ProposalStatus,
        now: Timestamp,
        eligible_members: u64,
        config: &GovernanceConfig,
    ) -> Result<Proposal, GovernanceError> {
        let proposal = self.proposals.get(&id).ok_or(GovernanceError::NotFound)?;
        let current = proposal.status;

        // Re-applying a resolution to an already-terminal proposal is a
        // no-op, so sweeps stay idempotent
        if current.is_terminal() && current == target {
            return Ok(proposal.clone());
        }

        validate_status_transition(current, target)?;

        match (current, target) {
            (ProposalStatus::Discussion, ProposalStatus::Voting) => {
                let min_days = proposal.category.rules().min_discussion_days;
                let elapsed = now.saturating_sub(proposal.created_at);
                if elapsed < min_days * NS_PER_DAY {
                    return Err(GovernanceError::InvalidState(format!(
                        "Minimum discussion period of {} days has not elapsed",
                        min_days
                    )));
                }
            }
            (ProposalStatus::Voting, _) => {
                // Terminal resolutions must match the deterministic outcome
                let votes = self.votes_for_proposal(id);
                let tally = tally_votes(&votes, proposal.total_eligible);
                match decide_outcome(proposal, &tally, config, now) {
                    Some(outcome) if outcome == target => {}
                    Some(outcome) => {
                        return Err(GovernanceError::InvalidState(format!(
                            "Outcome at this instant is {:?}, not {:?}",
                            outcome, target
                        )));
                    }
                    None => {
                        return Err(GovernanceError::InvalidState(
                            "Voting deadline has not passed".to_string(),
                        ));
                    }
                }
            }
            _ => {}
        }

        let proposal = self
            .proposals
            .get_mut(&id)
            .ok_or(GovernanceError::NotFound)?;

        proposal.status = target;
        match target {
            ProposalStatus::Discussion => {
                proposal.discussion_opened_at = Some(now);
            }
            ProposalStatus::Draft => {
                proposal.discussion_opened_at = None;
            }
            ProposalStatus::Voting => {
                proposal.voting_deadline = Some(now + config.voting_period_days * NS_PER_DAY);
                proposal.total_eligible = eligible_members;
            }
            _ => {}
        }

        Ok(proposal.clone())
    }
}

thread_local! {
    pub static GOVERNANCE_STATE: RefCell<GovernanceState> = RefCell::new(GovernanceState::new());
}

/// Helper function to access governance state
pub fn with_governance_state<F, R>(f: F) -> R
where
    F: FnOnce(&GovernanceState) -> R,
{
    GOVERNANCE_STATE.with(|state| f(&state.borrow()))
}

/// Helper function to mutably access governance state
pub fn with_governance_state_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut GovernanceState) -> R,
{
    GOVERNANCE_STATE.with(|state| f(&mut state.borrow_mut()))
}

// =============================================================================
// Stable Storage Types
// =============================================================================

/// Serializable state for canister upgrades
#[derive(CandidType, Deserialize, Serialize, Clone, Default)]
pub struct StableGovernanceState {
    pub proposals: Vec<(ProposalId, Proposal)>,
    pub votes: Vec<((ProposalId, Principal), VoteChoice)>,
    pub proposer_index: Vec<(Principal, Vec<ProposalId>)>,
    pub next_proposal_id: ProposalId,
}

impl From<&GovernanceState> for StableGovernanceState {
    fn from(state: &GovernanceState) -> Self {
        StableGovernanceState {
            proposals: state.proposals.iter().map(|(k, v)| (*k, v.clone())).collect(),
            votes: state.votes.iter().map(|(k, v)| (*k, *v)).collect(),
            proposer_index: state
                .proposer_index
                .iter()
                .map(|(k, v)| (*k, v.clone()))
                .collect(),
            next_proposal_id: state.next_proposal_id,
        }
    }
}

impl From<StableGovernanceState> for GovernanceState {
    fn from(stable: StableGovernanceState) -> Self {
        GovernanceState {
            proposals: stable.proposals.into_iter().collect(),
            votes: stable.votes.into_iter().collect(),
            proposer_index: stable.proposer_index.into_iter().collect(),
            next_proposal_id: stable.next_proposal_id,
        }
    }
}
