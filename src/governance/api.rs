//! API functions for the Governance module
//!
//! Core business logic for proposal operations, called by the canister's
//! endpoint handlers in lib.rs. Every function takes the caller and the
//! current time explicitly, so behavior is a deterministic function of
//! its inputs.

use candid::Principal;

use super::hash::generate_proposal_hash;
use super::state::{with_governance_state, with_governance_state_mut, ProposalRepository};
use super::tally::{decide_outcome, tally_votes};
use super::types::*;
use super::validation::validate_submission;

// =============================================================================
// Proposal Operations
// =============================================================================

/// Submit a new proposal
///
/// The complete form is validated (all steps) before anything is
/// persisted; the proposal is created in `Draft` awaiting moderation.
pub fn submit_proposal(
    caller: Principal,
    form: SubmissionForm,
    now: u64,
) -> Result<ProposalId, GovernanceError> {
    validate_submission(&form).map_err(GovernanceError::Validation)?;

    // validate_submission guarantees a category is present
    let category = form.category.ok_or_else(|| {
        GovernanceError::Validation(vec![FieldError::new("category", "Please select a category")])
    })?;

    let proposal = Proposal {
        id: 0, // assigned by the repository
        title: form.title,
        description: form.description,
        category,
        impact: category.rules().impact,
        status: ProposalStatus::Draft,
        proposer: caller,
        proposer_name: form.proposer_name,
        justification: form.justification,
        expected_impact: form.expected_impact,
        implementation_plan: form.implementation_plan,
        created_at: now,
        discussion_opened_at: None,
        voting_deadline: None,
        total_eligible: 0,
    };

    with_governance_state_mut(|state| state.create(proposal))
}

/// Get a proposal by ID
pub fn get_proposal(id: ProposalId) -> Option<Proposal> {
    with_governance_state(|state| state.get_proposal(id).cloned())
}

/// List proposals with optional filter and pagination
pub fn list_proposals(
    filter: Option<ProposalFilter>,
    pagination: Option<ProposalPaginationParams>,
) -> PaginatedProposalResponse {
    with_governance_state(|state| state.list_proposals(filter, pagination))
}

/// List proposals in a category, optionally narrowed by status
pub fn list_by_category(
    category: ProposalCategory,
    status: Option<ProposalStatus>,
) -> Vec<Proposal> {
    with_governance_state(|state| state.list_by_category(category, status))
}

// =============================================================================
// Moderation Operations
// =============================================================================

/// Approve a draft proposal for community discussion
pub fn approve_for_discussion(
    id: ProposalId,
    now: u64,
    config: &GovernanceConfig,
) -> Result<Proposal, GovernanceError> {
    with_governance_state_mut(|state| {
        state.transition(id, ProposalStatus::Discussion, now, 0, config)
    })
}

/// Moderation rejection: return a proposal in discussion to draft
pub fn return_to_draft(
    id: ProposalId,
    now: u64,
    config: &GovernanceConfig,
) -> Result<Proposal, GovernanceError> {
    with_governance_state_mut(|state| state.transition(id, ProposalStatus::Draft, now, 0, config))
}

// =============================================================================
// Voting Operations
// =============================================================================

/// Open the voting window on a proposal in discussion.
///
/// Rejected while the category's minimum discussion period has not
/// elapsed. Sets the voting deadline from the configured window and
/// snapshots `eligible_members` (supplied by the endpoint layer from the
/// member registry) as the participation denominator.
pub fn open_voting(
    id: ProposalId,
    now: u64,
    eligible_members: u64,
    config: &GovernanceConfig,
) -> Result<Proposal, GovernanceError> {
    with_governance_state_mut(|state| {
        state.transition(id, ProposalStatus::Voting, now, eligible_members, config)
    })
}

/// Record the caller's vote on a proposal in `Voting`.
///
/// `is_member` is the caller's registry standing, supplied by the
/// endpoint layer the same way `open_voting` receives the eligible
/// count; non-members are rejected before any state is touched.
/// Re-voting overwrites the caller's earlier choice (reported in the
/// receipt) and never double-counts.
pub fn cast_vote(
    caller: Principal,
    id: ProposalId,
    choice: VoteChoice,
    now: u64,
    is_member: bool,
) -> Result<VoteReceipt, GovernanceError> {
    if !is_member {
        return Err(GovernanceError::NotAMember);
    }
    with_governance_state_mut(|state| state.record_vote(id, caller, choice, now))
}

/// Current tally for a proposal, recomputed from the vote set
pub fn get_tally(id: ProposalId) -> Result<VoteTally, GovernanceError> {
    with_governance_state(|state| {
        let proposal = state.get_proposal(id).ok_or(GovernanceError::NotFound)?;
        let votes = state.votes_for_proposal(id);
        Ok(tally_votes(&votes, proposal.total_eligible))
    })
}

// =============================================================================
// Resolution Operations
// =============================================================================

/// Lazily resolve a single proposal if its voting deadline has passed.
///
/// Idempotent: a proposal that is already terminal, or whose deadline has
/// not passed, is returned unchanged. The same `decide_outcome` drives
/// the sweep, so both paths agree at any instant.
pub fn resolve_proposal(
    id: ProposalId,
    now: u64,
    config: &GovernanceConfig,
) -> Result<Proposal, GovernanceError> {
    with_governance_state_mut(|state| {
        let proposal = state.get(id)?;
        let votes = state.votes_for_proposal(id);
        let tally = tally_votes(&votes, proposal.total_eligible);

        match decide_outcome(&proposal, &tally, config, now) {
            Some(outcome) => state.transition(id, outcome, now, 0, config),
            None => Ok(proposal),
        }
    })
}

/// Sweep every due proposal to its terminal outcome.
///
/// Returns the IDs of proposals resolved by this pass. Safe to call from
/// a timer or on demand; re-running it is a no-op.
pub fn resolve_due_proposals(now: u64, config: &GovernanceConfig) -> Vec<ProposalId> {
    with_governance_state_mut(|state| {
        let due = state.due_proposal_ids(now);
        let mut resolved = Vec::new();
        for id in due {
            let proposal = match state.get(id) {
                Ok(p) => p,
                Err(_) => continue,
            };
            let votes = state.votes_for_proposal(id);
            let tally = tally_votes(&votes, proposal.total_eligible);
            if let Some(outcome) = decide_outcome(&proposal, &tally, config, now) {
                if state.transition(id, outcome, now, 0, config).is_ok() {
                    resolved.push(id);
                }
            }
        }
        resolved
    })
}

// =============================================================================
// Query Operations
// =============================================================================

/// Audit hash over a proposal and its current vote set
pub fn get_proposal_hash(id: ProposalId) -> Option<String> {
    with_governance_state(|state| {
        let proposal = state.get_proposal(id)?;
        let votes = state.votes_for_proposal(id);
        Some(generate_proposal_hash(proposal, &votes))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::governance::types::NS_PER_DAY;

    fn member(n: u8) -> Principal {
        Principal::from_slice(&[n, 9])
    }

    fn form() -> SubmissionForm {
        SubmissionForm {
            title: "Community healing circles".to_string(),
            category: Some(ProposalCategory::Community),
            proposer_name: "Maya".to_string(),
            description: "d".repeat(120),
            justification: "Fits our restorative values".to_string(),
            expected_impact: "Stronger conflict resolution".to_string(),
            implementation_plan: "Monthly facilitated sessions".to_string(),
        }
    }

    /// Walk a fresh proposal to open voting: submit, approve, wait out the
    /// discussion period, open with the given electorate.
    fn proposal_in_voting(eligible: u64, config: &GovernanceConfig) -> (ProposalId, u64) {
        let id = submit_proposal(member(100), form(), 0).unwrap();
        approve_for_discussion(id, 0, config).unwrap();
        let open_at = ProposalCategory::Community.rules().min_discussion_days * NS_PER_DAY;
        open_voting(id, open_at, eligible, config).unwrap();
        let deadline = open_at + config.voting_period_days * NS_PER_DAY;
        (id, deadline)
    }

    /// Vote as a registered member
    fn vote(
        by: Principal,
        id: ProposalId,
        choice: VoteChoice,
        now: u64,
    ) -> Result<VoteReceipt, GovernanceError> {
        cast_vote(by, id, choice, now, true)
    }

    #[test]
    fn submit_rejects_invalid_form() {
        let err = submit_proposal(member(1), SubmissionForm::default(), 0).unwrap_err();
        assert!(matches!(err, GovernanceError::Validation(_)));
    }

    #[test]
    fn submitted_proposal_starts_in_draft_with_derived_impact() {
        let id = submit_proposal(member(1), form(), 42).unwrap();
        let proposal = get_proposal(id).unwrap();
        assert_eq!(proposal.status, ProposalStatus::Draft);
        assert_eq!(proposal.impact, CommunityImpact::Medium);
        assert_eq!(proposal.created_at, 42);
        assert_eq!(proposal.proposer, member(1));
    }

    #[test]
    fn voting_on_draft_fails_invalid_state() {
        let id = submit_proposal(member(1), form(), 0).unwrap();
        let err = vote(member(2), id, VoteChoice::For, 1).unwrap_err();
        assert!(matches!(err, GovernanceError::InvalidState(_)));
    }

    #[test]
    fn non_member_vote_rejected() {
        let config = GovernanceConfig::default();
        let (id, deadline) = proposal_in_voting(10, &config);

        let err = cast_vote(member(1), id, VoteChoice::For, deadline - 1, false).unwrap_err();
        assert_eq!(err, GovernanceError::NotAMember);

        // Nothing was recorded for the rejected caller
        assert_eq!(get_tally(id).unwrap().total_votes, 0);
    }

    #[test]
    fn open_voting_gated_by_discussion_period() {
        let config = GovernanceConfig::default();
        let id = submit_proposal(member(1), form(), 0).unwrap();
        approve_for_discussion(id, 0, &config).unwrap();

        // Community proposals need 5 days of discussion
        let too_early = 4 * NS_PER_DAY;
        assert!(matches!(
            open_voting(id, too_early, 10, &config),
            Err(GovernanceError::InvalidState(_))
        ));

        let on_time = 5 * NS_PER_DAY;
        let proposal = open_voting(id, on_time, 10, &config).unwrap();
        assert_eq!(proposal.status, ProposalStatus::Voting);
        assert_eq!(proposal.total_eligible, 10);
        assert_eq!(
            proposal.voting_deadline,
            Some(on_time + config.voting_period_days * NS_PER_DAY)
        );
    }

    #[test]
    fn moderation_can_return_to_draft() {
        let config = GovernanceConfig::default();
        let id = submit_proposal(member(1), form(), 0).unwrap();
        approve_for_discussion(id, 0, &config).unwrap();
        let proposal = return_to_draft(id, 1, &config).unwrap();
        assert_eq!(proposal.status, ProposalStatus::Draft);
        assert_eq!(proposal.discussion_opened_at, None);
    }

    #[test]
    fn revote_overwrites_and_reports_previous() {
        let config = GovernanceConfig::default();
        let (id, deadline) = proposal_in_voting(10, &config);

        let receipt = vote(member(1), id, VoteChoice::For, deadline - 2).unwrap();
        assert_eq!(receipt.previous_vote, None);
        assert_eq!(receipt.tally.votes_for, 1);

        let receipt = vote(member(1), id, VoteChoice::Against, deadline - 1).unwrap();
        assert_eq!(receipt.previous_vote, Some(VoteChoice::For));
        assert_eq!(receipt.tally.total_votes, 1);
        assert_eq!(receipt.tally.votes_for, 0);
        assert_eq!(receipt.tally.votes_against, 1);
    }

    #[test]
    fn votes_after_deadline_rejected() {
        let config = GovernanceConfig::default();
        let (id, deadline) = proposal_in_voting(10, &config);
        assert!(matches!(
            vote(member(1), id, VoteChoice::For, deadline),
            Err(GovernanceError::InvalidState(_))
        ));
    }

    #[test]
    fn quorum_met_majority_resolves_approved() {
        let config = GovernanceConfig::default();
        let (id, deadline) = proposal_in_voting(10, &config);

        for n in 0..4 {
            vote(member(n), id, VoteChoice::For, deadline - 1).unwrap();
        }
        vote(member(4), id, VoteChoice::Against, deadline - 1).unwrap();
        vote(member(5), id, VoteChoice::Abstain, deadline - 1).unwrap();

        let proposal = resolve_proposal(id, deadline, &config).unwrap();
        assert_eq!(proposal.status, ProposalStatus::Approved);
    }

    #[test]
    fn quorum_unmet_resolves_expired() {
        let config = GovernanceConfig::default();
        let (id, deadline) = proposal_in_voting(10, &config);

        vote(member(0), id, VoteChoice::For, deadline - 1).unwrap();
        vote(member(1), id, VoteChoice::For, deadline - 1).unwrap();

        let proposal = resolve_proposal(id, deadline, &config).unwrap();
        assert_eq!(proposal.status, ProposalStatus::Expired);
    }

    #[test]
    fn tie_resolves_rejected() {
        let config = GovernanceConfig::default();
        let (id, deadline) = proposal_in_voting(10, &config);

        for n in 0..3 {
            vote(member(n), id, VoteChoice::For, deadline - 1).unwrap();
        }
        for n in 3..6 {
            vote(member(n), id, VoteChoice::Against, deadline - 1).unwrap();
        }

        let proposal = resolve_proposal(id, deadline, &config).unwrap();
        assert_eq!(proposal.status, ProposalStatus::Rejected);
    }

    #[test]
    fn resolution_is_idempotent() {
        let config = GovernanceConfig::default();
        let (id, deadline) = proposal_in_voting(10, &config);

        vote(member(0), id, VoteChoice::For, deadline - 1).unwrap();

        let first = resolve_proposal(id, deadline, &config).unwrap();
        assert_eq!(first.status, ProposalStatus::Expired);

        // Re-applying the check to a terminal proposal is a no-op
        let second = resolve_proposal(id, deadline + NS_PER_DAY, &config).unwrap();
        assert_eq!(second.status, ProposalStatus::Expired);

        // And resolving something not yet due leaves it untouched
        let early = resolve_proposal(id, deadline, &config).unwrap();
        assert_eq!(early.status, first.status);
    }

    #[test]
    fn sweep_resolves_all_due_proposals() {
        let config = GovernanceConfig::default();
        let (first, deadline) = proposal_in_voting(10, &config);
        let (second, _) = proposal_in_voting(10, &config);

        for n in 0..6 {
            vote(member(n), first, VoteChoice::For, deadline - 1).unwrap();
        }

        let mut resolved = resolve_due_proposals(deadline, &config);
        resolved.sort_unstable();
        assert_eq!(resolved, vec![first, second]);
        assert_eq!(
            get_proposal(first).unwrap().status,
            ProposalStatus::Approved
        );
        assert_eq!(get_proposal(second).unwrap().status, ProposalStatus::Expired);

        // Second pass finds nothing left to do
        assert!(resolve_due_proposals(deadline + 1, &config).is_empty());
    }

    #[test]
    fn tally_recomputed_not_cached() {
        let config = GovernanceConfig::default();
        let (id, deadline) = proposal_in_voting(4, &config);

        assert_eq!(get_tally(id).unwrap().total_votes, 0);
        vote(member(0), id, VoteChoice::For, deadline - 1).unwrap();
        let tally = get_tally(id).unwrap();
        assert_eq!(tally.total_votes, 1);
        assert_eq!(tally.participation_rate_pct, 25.0);
    }

    #[test]
    fn vote_count_cannot_exceed_eligibility_snapshot() {
        let config = GovernanceConfig::default();
        let (id, deadline) = proposal_in_voting(2, &config);

        vote(member(0), id, VoteChoice::For, deadline - 1).unwrap();
        vote(member(1), id, VoteChoice::For, deadline - 1).unwrap();
        assert!(matches!(
            vote(member(2), id, VoteChoice::For, deadline - 1),
            Err(GovernanceError::InvalidState(_))
        ));
        // Existing voters can still change their choice
        assert!(vote(member(0), id, VoteChoice::Abstain, deadline - 1).is_ok());
    }

    #[test]
    fn list_by_category_and_filter() {
        let id = submit_proposal(member(1), form(), 0).unwrap();
        let mut budget_form = form();
        budget_form.category = Some(ProposalCategory::Budget);
        let budget_id = submit_proposal(member(2), budget_form, 0).unwrap();

        let community = list_by_category(ProposalCategory::Community, None);
        assert_eq!(community.len(), 1);
        assert_eq!(community[0].id, id);

        let drafts = list_by_category(ProposalCategory::Budget, Some(ProposalStatus::Draft));
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].id, budget_id);

        let all = list_proposals(None, None);
        assert_eq!(all.total, 2);

        let filtered = list_proposals(
            Some(ProposalFilter {
                proposer: Some(member(2)),
                ..Default::default()
            }),
            None,
        );
        assert_eq!(filtered.total, 1);
    }

    #[test]
    fn get_proposal_hash_tracks_votes() {
        let config = GovernanceConfig::default();
        let (id, deadline) = proposal_in_voting(10, &config);

        let before = get_proposal_hash(id).unwrap();
        vote(member(0), id, VoteChoice::For, deadline - 1).unwrap();
        let after = get_proposal_hash(id).unwrap();
        assert_ne!(before, after);
        assert!(get_proposal_hash(9999).is_none());
    }
}
