//! Type definitions for the Governance module

use candid::{CandidType, Principal};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Type Aliases
// =============================================================================

pub type ProposalId = u64;
pub type Timestamp = u64;

// =============================================================================
// Categories & Impact
// =============================================================================

/// Proposal categories for community governance decisions
#[derive(CandidType, Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProposalCategory {
    /// Community guidelines, moderation policies, behavioral standards
    Policy,
    /// Financial decisions, resource allocation, funding
    Budget,
    /// Technical changes, new features, platform improvements
    Platform,
    /// New initiatives, events, programs
    Community,
    /// Mission, core values, governance structure
    Values,
}

/// Community impact level, derived from category
#[derive(CandidType, Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommunityImpact {
    Low,
    Medium,
    High,
    Critical,
}

/// Per-category governance rules
#[derive(CandidType, Deserialize, Serialize, Clone, Copy, Debug)]
pub struct CategoryRules {
    /// Minimum impact classification for proposals in this category
    pub impact: CommunityImpact,
    /// Minimum discussion period before voting can open
    pub min_discussion_days: u64,
}

impl ProposalCategory {
    /// Fixed lookup: category -> impact classification and discussion period
    pub fn rules(&self) -> CategoryRules {
        match self {
            ProposalCategory::Policy => CategoryRules {
                impact: CommunityImpact::High,
                min_discussion_days: 7,
            },
            ProposalCategory::Budget => CategoryRules {
                impact: CommunityImpact::Critical,
                min_discussion_days: 10,
            },
            ProposalCategory::Platform => CategoryRules {
                impact: CommunityImpact::Medium,
                min_discussion_days: 5,
            },
            ProposalCategory::Community => CategoryRules {
                impact: CommunityImpact::Medium,
                min_discussion_days: 5,
            },
            ProposalCategory::Values => CategoryRules {
                impact: CommunityImpact::Critical,
                min_discussion_days: 14,
            },
        }
    }
}

// =============================================================================
// Proposal Types
// =============================================================================

/// Proposal lifecycle status
///
/// `Draft` is initial; `Approved`, `Rejected` and `Expired` are terminal.
/// Transitions are one-directional except the moderation revert
/// `Discussion -> Draft`.
#[derive(CandidType, Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ProposalStatus {
    /// Submitted, awaiting moderation approval
    #[default]
    Draft,
    /// Open for community discussion
    Discussion,
    /// Voting window open
    Voting,
    /// Passed: quorum met, majority for
    Approved,
    /// Failed: quorum met, no majority (ties reject)
    Rejected,
    /// Lapsed: voting deadline passed without quorum
    Expired,
}

impl ProposalStatus {
    /// Terminal statuses admit no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProposalStatus::Approved | ProposalStatus::Rejected | ProposalStatus::Expired
        )
    }
}

/// A member's vote on a proposal
#[derive(CandidType, Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteChoice {
    For,
    Against,
    Abstain,
}

/// Community governance proposal
#[derive(CandidType, Deserialize, Serialize, Clone, Debug)]
pub struct Proposal {
    /// Unique proposal identifier
    pub id: ProposalId,
    /// Proposal title (10-200 characters)
    pub title: String,
    /// Full proposal description (100+ characters)
    pub description: String,
    /// Governance category
    pub category: ProposalCategory,
    /// Impact classification derived from category at creation
    pub impact: CommunityImpact,
    /// Current lifecycle status
    pub status: ProposalStatus,
    /// Submitting member
    pub proposer: Principal,
    /// Display name supplied at submission
    pub proposer_name: String,
    /// Why the community should adopt this proposal
    pub justification: String,
    /// Expected impact description
    pub expected_impact: String,
    /// How the proposal would be implemented
    pub implementation_plan: String,
    /// Timestamp when proposal was created (nanoseconds)
    pub created_at: Timestamp,
    /// Timestamp when discussion opened, if it has
    pub discussion_opened_at: Option<Timestamp>,
    /// Voting deadline, set once when voting opens
    pub voting_deadline: Option<Timestamp>,
    /// Eligible voter count, snapshotted when voting opens
    pub total_eligible: u64,
}

// =============================================================================
// Submission Types
// =============================================================================

/// Steps of the proposal submission form
#[derive(CandidType, Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmissionStep {
    /// Category, title and proposer identity
    CategoryAndBasics,
    /// Description and justification
    Description,
    /// Expected impact and implementation plan
    Impact,
}

/// Complete submission form gathered across all steps
///
/// `category` is optional so that a missing selection surfaces as a
/// field error rather than a decode failure.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, Default)]
pub struct SubmissionForm {
    pub title: String,
    pub category: Option<ProposalCategory>,
    pub proposer_name: String,
    pub description: String,
    pub justification: String,
    pub expected_impact: String,
    pub implementation_plan: String,
}

// =============================================================================
// Error Types
// =============================================================================

/// A single field-level validation failure
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Failure taxonomy for governance operations
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub enum GovernanceError {
    /// Input failed validation; ordered field/message list for the submitter
    Validation(Vec<FieldError>),
    /// Operation attempted against a proposal in the wrong status
    InvalidState(String),
    /// Requested proposal does not exist
    NotFound,
    /// Caller is not a registered member
    NotAMember,
    /// Caller lacks moderation rights
    Unauthorized,
    /// Storage timeout or connectivity failure; retryable by the caller.
    /// Never raised by the in-canister store.
    Unavailable(String),
}

impl std::fmt::Display for GovernanceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GovernanceError::Validation(errors) => {
                let msgs: Vec<String> = errors
                    .iter()
                    .map(|e| format!("{}: {}", e.field, e.message))
                    .collect();
                write!(f, "Validation failed: {}", msgs.join("; "))
            }
            GovernanceError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            GovernanceError::NotFound => write!(f, "Proposal not found"),
            GovernanceError::NotAMember => write!(f, "Caller is not a registered member"),
            GovernanceError::Unauthorized => write!(f, "Caller is not a moderator"),
            GovernanceError::Unavailable(msg) => write!(f, "Storage unavailable: {}", msg),
        }
    }
}

// =============================================================================
// Tally Types
// =============================================================================

/// Aggregate vote figures, recomputed on demand from the vote set.
///
/// Percentage fields are unrounded doubles; quorum and majority decisions
/// never use them (they compare raw counts and ratios). Use
/// [`crate::governance::tally::display_pct`] when formatting for display.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct VoteTally {
    pub votes_for: u64,
    pub votes_against: u64,
    pub votes_abstain: u64,
    pub total_votes: u64,
    pub participation_rate_pct: f64,
    pub for_pct: f64,
    pub against_pct: f64,
    pub abstain_pct: f64,
}

/// Result of recording a vote
#[derive(CandidType, Deserialize, Serialize, Clone, Debug)]
pub struct VoteReceipt {
    /// Tally after the vote was applied
    pub tally: VoteTally,
    /// The caller's prior choice, if this vote overwrote one
    pub previous_vote: Option<VoteChoice>,
}

// =============================================================================
// Configuration
// =============================================================================

/// Tunable governance parameters, controller-settable
#[derive(CandidType, Deserialize, Serialize, Clone, Copy, Debug)]
pub struct GovernanceConfig {
    /// Minimum participation rate (percent) for a vote to be binding
    pub quorum_percent: u32,
    /// Length of the voting window once voting opens
    pub voting_period_days: u64,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            quorum_percent: 50,
            voting_period_days: 7,
        }
    }
}

// =============================================================================
// Query Types
// =============================================================================

/// Filter options for listing proposals
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, Default)]
pub struct ProposalFilter {
    pub category: Option<ProposalCategory>,
    pub status: Option<ProposalStatus>,
    pub proposer: Option<Principal>,
}

/// Pagination parameters for proposal queries
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, Default)]
pub struct ProposalPaginationParams {
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

/// Paginated response for proposals
#[derive(CandidType, Deserialize, Serialize, Clone, Debug)]
pub struct PaginatedProposalResponse {
    pub items: Vec<Proposal>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// =============================================================================
// Constants
// =============================================================================

/// Minimum proposal title length
pub const MIN_TITLE_LEN: usize = 10;

/// Maximum proposal title length
pub const MAX_TITLE_LEN: usize = 200;

/// Minimum proposal description length
pub const MIN_DESCRIPTION_LEN: usize = 100;

/// Maximum length for free-text fields (50KB)
pub const MAX_TEXT_LEN: usize = 50 * 1024;

/// Nanoseconds per day (for discussion period and deadline arithmetic)
pub const NS_PER_DAY: u64 = 24 * 60 * 60 * 1_000_000_000;

/// Default page size for proposal listings
pub const DEFAULT_PAGE_LIMIT: u64 = 50;
