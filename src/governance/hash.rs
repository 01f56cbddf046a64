//! Audit hash generation for proposal verification
//!
//! Lets an off-chain record verify that a displayed tally corresponds to
//! the proposal and vote set that produced it.

use candid::Principal;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use super::types::*;

/// Generate a deterministic hash over a proposal and its vote set.
///
/// The hash covers the proposal's immutable identity fields, its current
/// status, and every vote in member order (BTreeMap iteration keeps this
/// stable across calls).
///
/// # Returns
/// Hex-encoded SHA-256 hash string
pub fn generate_proposal_hash(
    proposal: &Proposal,
    votes: &BTreeMap<Principal, VoteChoice>,
) -> String {
    let mut hasher = Sha256::new();

    hasher.update(proposal.id.to_le_bytes());
    hasher.update(proposal.title.as_bytes());
    hasher.update(proposal.description.as_bytes());
    hasher.update(format!("{:?}", proposal.category).as_bytes());
    hasher.update(format!("{:?}", proposal.status).as_bytes());
    hasher.update(proposal.proposer.as_slice());
    hasher.update(proposal.created_at.to_le_bytes());
    hasher.update(proposal.voting_deadline.unwrap_or(0).to_le_bytes());
    hasher.update(proposal.total_eligible.to_le_bytes());

    for (member, choice) in votes {
        hasher.update(member.as_slice());
        hasher.update(match choice {
            VoteChoice::For => [1u8],
            VoteChoice::Against => [2u8],
            VoteChoice::Abstain => [3u8],
        });
    }

    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal() -> Proposal {
        Proposal {
            id: 1,
            title: "Accessibility improvements".to_string(),
            description: "d".repeat(120),
            category: ProposalCategory::Platform,
            impact: CommunityImpact::Medium,
            status: ProposalStatus::Voting,
            proposer: Principal::anonymous(),
            proposer_name: "Alex".to_string(),
            justification: "j".to_string(),
            expected_impact: "e".to_string(),
            implementation_plan: "p".to_string(),
            created_at: 1_000_000,
            discussion_opened_at: Some(1_000_000),
            voting_deadline: Some(2_000_000),
            total_eligible: 10,
        }
    }

    #[test]
    fn test_hash_is_deterministic() {
        let p = proposal();
        let votes = BTreeMap::new();

        let hash1 = generate_proposal_hash(&p, &votes);
        let hash2 = generate_proposal_hash(&p, &votes);

        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_changes_with_vote() {
        let p = proposal();

        let hash_without_vote = generate_proposal_hash(&p, &BTreeMap::new());

        let mut votes = BTreeMap::new();
        votes.insert(Principal::anonymous(), VoteChoice::For);
        let hash_with_vote = generate_proposal_hash(&p, &votes);

        assert_ne!(hash_without_vote, hash_with_vote);
    }

    #[test]
    fn test_hash_distinguishes_choices() {
        let p = proposal();

        let mut votes = BTreeMap::new();
        votes.insert(Principal::anonymous(), VoteChoice::For);
        let hash_for = generate_proposal_hash(&p, &votes);

        votes.insert(Principal::anonymous(), VoteChoice::Against);
        let hash_against = generate_proposal_hash(&p, &votes);

        assert_ne!(hash_for, hash_against);
    }
}
