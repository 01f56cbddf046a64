mod governance;
mod state;

use candid::Principal;
use ic_cdk_macros::{init, post_upgrade, pre_upgrade, query, update};

use governance::types::{
    FieldError, ProposalId, ProposalPaginationParams, SubmissionStep, VoteTally,
};
use governance::{
    GovernanceConfig, GovernanceError, PaginatedProposalResponse, Proposal, ProposalCategory,
    ProposalFilter, ProposalStatus, SubmissionForm, VoteChoice, VoteReceipt,
};
pub use state::{StableState, State, STATE};

// =============================================================================
// Canister Lifecycle
// =============================================================================

#[init]
fn init(controllers: Option<Vec<Principal>>) {
    let effective_controllers = controllers.unwrap_or_else(|| vec![ic_cdk::caller()]);
    STATE.with(|state| {
        let mut s = state.borrow_mut();
        s.controllers = effective_controllers;
    });

    ic_cdk::println!("===========================================");
    ic_cdk::println!("Governance Core Initialization Complete");
    ic_cdk::println!("===========================================");
}

#[pre_upgrade]
fn pre_upgrade() {
    STATE.with(|state| {
        let s = state.borrow();
        let stable: StableState = (&*s).into();
        ic_cdk::storage::stable_save((stable,)).expect("Failed to save state to stable storage");
    });
}

#[post_upgrade]
fn post_upgrade() {
    let restored_state = match ic_cdk::storage::stable_restore::<(StableState,)>() {
        Ok((saved_state,)) => {
            ic_cdk::println!("Restored state from stable storage");
            saved_state.restore()
        }
        Err(e) => {
            ic_cdk::println!("No previous state found ({}), using default state", e);
            State::new()
        }
    };

    STATE.with(|state| {
        *state.borrow_mut() = restored_state;
    });

    ic_cdk::println!("===========================================");
    ic_cdk::println!("Governance Core Upgrade Complete");
    ic_cdk::println!("===========================================");
}

// =============================================================================
// Access Control
// =============================================================================

async fn require_controller() -> Result<(), GovernanceError> {
    let caller = ic_cdk::caller();

    let is_authorized = STATE.with(|state| state.borrow().is_controller(&caller));

    if !is_authorized {
        use ic_cdk::api::management_canister::main::{canister_status, CanisterIdRecord};

        let status = canister_status(CanisterIdRecord {
            canister_id: ic_cdk::id(),
        })
        .await
        .map_err(|(code, msg)| {
            GovernanceError::Unavailable(format!(
                "Failed to query canister status: {:?}: {}",
                code, msg
            ))
        })?
        .0;

        if !status.settings.controllers.contains(&caller) {
            return Err(GovernanceError::Unauthorized);
        }

        STATE.with(|state| {
            state.borrow_mut().controllers = status.settings.controllers;
        });
    }

    Ok(())
}

fn require_authenticated() -> Result<Principal, GovernanceError> {
    let caller = ic_cdk::caller();
    if caller == Principal::anonymous() {
        return Err(GovernanceError::Unauthorized);
    }
    Ok(caller)
}

fn require_member() -> Result<Principal, GovernanceError> {
    let caller = require_authenticated()?;
    let is_member = STATE.with(|state| state.borrow().is_member(&caller));
    if !is_member {
        return Err(GovernanceError::NotAMember);
    }
    Ok(caller)
}

// =============================================================================
// Membership API (eligible-voter registry)
// =============================================================================

#[update]
async fn register_member(member: Principal) -> Result<(), GovernanceError> {
    require_controller().await?;

    let added = STATE.with(|state| state.borrow_mut().register_member(member));
    if added {
        ic_cdk::println!("Registered member {}", member);
    }
    Ok(())
}

#[update]
async fn remove_member(member: Principal) -> Result<(), GovernanceError> {
    require_controller().await?;

    let removed = STATE.with(|state| state.borrow_mut().remove_member(&member));
    if removed {
        ic_cdk::println!("Removed member {}", member);
    }
    Ok(())
}

#[query]
fn get_member_count() -> u64 {
    STATE.with(|state| state.borrow().member_count())
}

#[query]
fn get_controllers() -> Vec<Principal> {
    STATE.with(|state| state.borrow().get_controllers())
}

// =============================================================================
// Configuration
// =============================================================================

#[update]
async fn set_governance_config(config: GovernanceConfig) -> Result<(), GovernanceError> {
    require_controller().await?;

    STATE.with(|state| {
        state.borrow_mut().config = config;
    });

    ic_cdk::println!(
        "Governance config set: quorum {}%, voting period {} days",
        config.quorum_percent,
        config.voting_period_days
    );
    Ok(())
}

#[query]
fn get_governance_config() -> GovernanceConfig {
    STATE.with(|state| state.borrow().config)
}

// =============================================================================
// Proposal Submission API
// =============================================================================

/// Per-step validation for the submission form, so the UI can gate each
/// step before the final submit. Pure; no state is touched.
#[query]
fn validate_submission_step(step: SubmissionStep, form: SubmissionForm) -> Vec<FieldError> {
    governance::validation::validate_step(step, &form)
        .err()
        .unwrap_or_default()
}

#[update]
fn submit_proposal(form: SubmissionForm) -> Result<ProposalId, GovernanceError> {
    let caller = require_member()?;
    let now = ic_cdk::api::time();
    let id = governance::api::submit_proposal(caller, form, now)?;
    ic_cdk::println!("Created proposal {} by {}", id, caller);
    Ok(id)
}

#[query]
fn get_proposal(id: ProposalId) -> Option<Proposal> {
    governance::api::get_proposal(id)
}

#[query]
fn list_proposals(
    filter: Option<ProposalFilter>,
    pagination: Option<ProposalPaginationParams>,
) -> PaginatedProposalResponse {
    governance::api::list_proposals(filter, pagination)
}

#[query]
fn list_by_category(category: ProposalCategory, status: Option<ProposalStatus>) -> Vec<Proposal> {
    governance::api::list_by_category(category, status)
}

// =============================================================================
// Moderation API
// =============================================================================

#[update]
async fn approve_for_discussion(id: ProposalId) -> Result<Proposal, GovernanceError> {
    require_controller().await?;
    let now = ic_cdk::api::time();
    let config = STATE.with(|state| state.borrow().config);
    let proposal = governance::api::approve_for_discussion(id, now, &config)?;
    ic_cdk::println!("Proposal {} opened for discussion", id);
    Ok(proposal)
}

#[update]
async fn return_to_draft(id: ProposalId) -> Result<Proposal, GovernanceError> {
    require_controller().await?;
    let now = ic_cdk::api::time();
    let config = STATE.with(|state| state.borrow().config);
    let proposal = governance::api::return_to_draft(id, now, &config)?;
    ic_cdk::println!("Proposal {} returned to draft", id);
    Ok(proposal)
}

// =============================================================================
// Voting API
// =============================================================================

#[update]
async fn open_voting(id: ProposalId) -> Result<Proposal, GovernanceError> {
    require_controller().await?;
    let now = ic_cdk::api::time();
    let (eligible, config) =
        STATE.with(|state| (state.borrow().member_count(), state.borrow().config));
    let proposal = governance::api::open_voting(id, now, eligible, &config)?;
    ic_cdk::println!(
        "Proposal {} voting opened: {} eligible, deadline {:?}",
        id,
        eligible,
        proposal.voting_deadline
    );
    Ok(proposal)
}

#[update]
fn cast_vote(id: ProposalId, choice: VoteChoice) -> Result<VoteReceipt, GovernanceError> {
    let caller = require_authenticated()?;
    let is_member = STATE.with(|state| state.borrow().is_member(&caller));
    let now = ic_cdk::api::time();
    let receipt = governance::api::cast_vote(caller, id, choice, now, is_member)?;
    if receipt.previous_vote.is_some() {
        ic_cdk::println!("Member {} changed their vote on proposal {}", caller, id);
    }
    Ok(receipt)
}

#[query]
fn get_tally(id: ProposalId) -> Result<VoteTally, GovernanceError> {
    governance::api::get_tally(id)
}

// =============================================================================
// Resolution API
// =============================================================================

/// Lazy on-read resolution: applies the terminal outcome if the deadline
/// has passed, otherwise returns the proposal unchanged.
#[update]
fn resolve_proposal(id: ProposalId) -> Result<Proposal, GovernanceError> {
    let now = ic_cdk::api::time();
    let config = STATE.with(|state| state.borrow().config);
    governance::api::resolve_proposal(id, now, &config)
}

/// Sweep every due proposal to its terminal outcome. Idempotent; callable
/// from a timer or on demand.
#[update]
fn resolve_due_proposals() -> Vec<ProposalId> {
    let now = ic_cdk::api::time();
    let config = STATE.with(|state| state.borrow().config);
    let resolved = governance::api::resolve_due_proposals(now, &config);
    if !resolved.is_empty() {
        ic_cdk::println!("Resolved {} due proposal(s)", resolved.len());
    }
    resolved
}

#[query]
fn get_proposal_hash(id: ProposalId) -> Option<String> {
    governance::api::get_proposal_hash(id)
}

// =============================================================================
// Stats & Health
// =============================================================================

#[derive(candid::CandidType, serde::Serialize)]
pub struct Stats {
    pub total_proposals: u64,
    pub total_votes: u64,
    pub total_members: u64,
    pub proposals_in_voting: u64,
}

#[query]
fn get_stats() -> Stats {
    let total_members = STATE.with(|state| state.borrow().member_count());
    governance::state::with_governance_state(|gov| Stats {
        total_proposals: gov.proposals.len() as u64,
        total_votes: gov.votes.len() as u64,
        total_members,
        proposals_in_voting: gov
            .proposals
            .values()
            .filter(|p| p.status == ProposalStatus::Voting)
            .count() as u64,
    })
}

#[query]
fn health() -> String {
    "ok".to_string()
}

// Export candid interface
ic_cdk::export_candid!();
