//! Community Governance Module
//!
//! Proposal lifecycle for cooperative decision-making: members submit
//! proposals through a multi-step validated form, moderation opens them
//! for discussion, voting opens once the category's discussion period has
//! elapsed, and each proposal resolves to approved, rejected or expired
//! when its voting deadline passes.
//!
//! Key Features:
//! - Multi-step submission validation with field-level errors
//! - One-directional status lifecycle with a moderation revert
//! - Quorum-gated tallying recomputed on demand (never cached)
//! - Per-member vote upsert (re-voting overwrites, never double-counts)
//! - Audit hash over proposal and vote set

pub mod api;
pub mod hash;
pub mod state;
pub mod tally;
pub mod types;
pub mod validation;

// Re-export types for external use
pub use types::{
    GovernanceConfig, GovernanceError, PaginatedProposalResponse, Proposal, ProposalCategory,
    ProposalFilter, ProposalStatus, SubmissionForm, SubmissionStep, VoteChoice, VoteReceipt,
    VoteTally,
};
