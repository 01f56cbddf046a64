//! Vote tally computation and outcome determination
//!
//! Tallies are always recomputed from the vote set, never cached, so the
//! displayed figures cannot drift from the recorded votes. Everything in
//! this module is a pure function over the snapshot passed in.

use candid::Principal;
use std::collections::BTreeMap;

use super::types::*;

/// Compute aggregate vote figures from a vote snapshot.
///
/// The storage key guarantees one entry per member, so counts cannot
/// double-count a re-vote. Guards: participation is `0.0` when nobody is
/// eligible, and the per-choice percentages are `0.0` when no votes were
/// cast (never NaN, never a division by zero).
pub fn tally_votes(votes: &BTreeMap<Principal, VoteChoice>, total_eligible: u64) -> VoteTally {
    let mut votes_for = 0u64;
    let mut votes_against = 0u64;
    let mut votes_abstain = 0u64;

    for choice in votes.values() {
        match choice {
            VoteChoice::For => votes_for += 1,
            VoteChoice::Against => votes_against += 1,
            VoteChoice::Abstain => votes_abstain += 1,
        }
    }

    let total_votes = votes_for + votes_against + votes_abstain;

    let participation_rate_pct = if total_eligible == 0 {
        0.0
    } else {
        total_votes as f64 / total_eligible as f64 * 100.0
    };

    let (for_pct, against_pct, abstain_pct) = if total_votes == 0 {
        (0.0, 0.0, 0.0)
    } else {
        let total = total_votes as f64;
        (
            votes_for as f64 / total * 100.0,
            votes_against as f64 / total * 100.0,
            votes_abstain as f64 / total * 100.0,
        )
    };

    VoteTally {
        votes_for,
        votes_against,
        votes_abstain,
        total_votes,
        participation_rate_pct,
        for_pct,
        against_pct,
        abstain_pct,
    }
}

/// Decide the terminal outcome for a proposal in `Voting`.
///
/// Returns `None` while the deadline has not passed (or the proposal is
/// not in `Voting`), so both the lazy check and the sweep can call this
/// and agree. Quorum and majority compare raw counts against unrounded
/// ratios; display rounding never influences classification.
pub fn decide_outcome(
    proposal: &Proposal,
    tally: &VoteTally,
    config: &GovernanceConfig,
    now: Timestamp,
) -> Option<ProposalStatus> {
    if proposal.status != ProposalStatus::Voting {
        return None;
    }
    let deadline = proposal.voting_deadline?;
    if now < deadline {
        return None;
    }

    let quorum_met = if proposal.total_eligible == 0 {
        false
    } else {
        let participation = tally.total_votes as f64 / proposal.total_eligible as f64;
        participation >= config.quorum_percent as f64 / 100.0
    };

    if !quorum_met {
        Some(ProposalStatus::Expired)
    } else if tally.votes_for > tally.votes_against {
        Some(ProposalStatus::Approved)
    } else {
        // Ties do not pass
        Some(ProposalStatus::Rejected)
    }
}

/// Format a percentage to one decimal place for display
pub fn display_pct(pct: f64) -> String {
    format!("{:.1}", pct)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(n: u8) -> Principal {
        Principal::from_slice(&[n, 1, 2])
    }

    fn votes_with(counts: (u8, u8, u8)) -> BTreeMap<Principal, VoteChoice> {
        let (for_n, against_n, abstain_n) = counts;
        let mut votes = BTreeMap::new();
        let mut id = 0u8;
        for _ in 0..for_n {
            votes.insert(member(id), VoteChoice::For);
            id += 1;
        }
        for _ in 0..against_n {
            votes.insert(member(id), VoteChoice::Against);
            id += 1;
        }
        for _ in 0..abstain_n {
            votes.insert(member(id), VoteChoice::Abstain);
            id += 1;
        }
        votes
    }

    fn voting_proposal(total_eligible: u64, deadline: Timestamp) -> Proposal {
        Proposal {
            id: 1,
            title: "Mutual aid fund expansion".to_string(),
            description: "d".repeat(120),
            category: ProposalCategory::Budget,
            impact: ProposalCategory::Budget.rules().impact,
            status: ProposalStatus::Voting,
            proposer: member(200),
            proposer_name: "Jordan".to_string(),
            justification: "j".to_string(),
            expected_impact: "e".to_string(),
            implementation_plan: "p".to_string(),
            created_at: 0,
            discussion_opened_at: Some(0),
            voting_deadline: Some(deadline),
            total_eligible,
        }
    }

    #[test]
    fn zero_eligible_yields_zero_participation() {
        let tally = tally_votes(&BTreeMap::new(), 0);
        assert_eq!(tally.participation_rate_pct, 0.0);
        assert_eq!(tally.total_votes, 0);
    }

    #[test]
    fn zero_votes_yield_zero_percentages() {
        let tally = tally_votes(&BTreeMap::new(), 100);
        assert_eq!(tally.for_pct, 0.0);
        assert_eq!(tally.against_pct, 0.0);
        assert_eq!(tally.abstain_pct, 0.0);
        assert!(!tally.for_pct.is_nan());
    }

    #[test]
    fn percentages_sum_to_hundred() {
        let votes = votes_with((7, 5, 3));
        let tally = tally_votes(&votes, 40);
        let sum = tally.for_pct + tally.against_pct + tally.abstain_pct;
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn participation_is_exact() {
        let votes = votes_with((40, 15, 5));
        let tally = tally_votes(&votes, 100);
        assert_eq!(tally.total_votes, 60);
        assert_eq!(tally.participation_rate_pct, 60.0);
        assert_eq!(display_pct(tally.for_pct), "66.7");
    }

    #[test]
    fn revote_counts_once_with_last_choice() {
        let mut votes = BTreeMap::new();
        votes.insert(member(1), VoteChoice::For);
        votes.insert(member(1), VoteChoice::Against);
        let tally = tally_votes(&votes, 10);
        assert_eq!(tally.total_votes, 1);
        assert_eq!(tally.votes_for, 0);
        assert_eq!(tally.votes_against, 1);
    }

    #[test]
    fn quorum_met_majority_for_approves() {
        let proposal = voting_proposal(100, 1_000);
        let tally = tally_votes(&votes_with((40, 15, 5)), 100);
        let outcome = decide_outcome(&proposal, &tally, &GovernanceConfig::default(), 1_000);
        assert_eq!(outcome, Some(ProposalStatus::Approved));
    }

    #[test]
    fn quorum_unmet_expires_regardless_of_split() {
        let proposal = voting_proposal(100, 1_000);
        let tally = tally_votes(&votes_with((28, 1, 1)), 100);
        assert_eq!(tally.total_votes, 30);
        let outcome = decide_outcome(&proposal, &tally, &GovernanceConfig::default(), 1_000);
        assert_eq!(outcome, Some(ProposalStatus::Expired));
    }

    #[test]
    fn tie_rejects() {
        let proposal = voting_proposal(100, 1_000);
        let tally = tally_votes(&votes_with((30, 30, 0)), 100);
        let outcome = decide_outcome(&proposal, &tally, &GovernanceConfig::default(), 1_000);
        assert_eq!(outcome, Some(ProposalStatus::Rejected));
    }

    #[test]
    fn quorum_boundary_is_unrounded() {
        // 50 of 100 is exactly the 50% quorum: binding
        let proposal = voting_proposal(100, 1_000);
        let tally = tally_votes(&votes_with((26, 24, 0)), 100);
        assert_eq!(
            decide_outcome(&proposal, &tally, &GovernanceConfig::default(), 1_000),
            Some(ProposalStatus::Approved)
        );

        // 49 of 100 falls just short
        let tally = tally_votes(&votes_with((25, 24, 0)), 100);
        assert_eq!(
            decide_outcome(&proposal, &tally, &GovernanceConfig::default(), 1_000),
            Some(ProposalStatus::Expired)
        );
    }

    #[test]
    fn no_outcome_before_deadline() {
        let proposal = voting_proposal(100, 1_000);
        let tally = tally_votes(&votes_with((40, 15, 5)), 100);
        assert_eq!(
            decide_outcome(&proposal, &tally, &GovernanceConfig::default(), 999),
            None
        );
    }

    #[test]
    fn no_outcome_for_non_voting_status() {
        let mut proposal = voting_proposal(100, 1_000);
        proposal.status = ProposalStatus::Discussion;
        let tally = tally_votes(&BTreeMap::new(), 100);
        assert_eq!(
            decide_outcome(&proposal, &tally, &GovernanceConfig::default(), 2_000),
            None
        );
    }
}
