//! Validation logic for the Governance module
//!
//! Field and step validators for proposal submission, plus the legal
//! status-transition edge set. All functions here are pure: same input,
//! same result, no state access.

use super::types::*;

/// Validate a single submission step
///
/// Returns the ordered list of field errors for the step, or `Ok` when
/// every rule holds.
pub fn validate_step(step: SubmissionStep, form: &SubmissionForm) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();

    match step {
        SubmissionStep::CategoryAndBasics => {
            if form.title.trim().is_empty() {
                errors.push(FieldError::new("title", "Title is required"));
            } else if form.title.chars().count() < MIN_TITLE_LEN {
                errors.push(FieldError::new(
                    "title",
                    format!("Title must be at least {} characters", MIN_TITLE_LEN),
                ));
            } else if form.title.chars().count() > MAX_TITLE_LEN {
                errors.push(FieldError::new(
                    "title",
                    format!("Title too long (max {} characters)", MAX_TITLE_LEN),
                ));
            }
            if form.category.is_none() {
                errors.push(FieldError::new("category", "Please select a category"));
            }
            if form.proposer_name.trim().is_empty() {
                errors.push(FieldError::new("proposerName", "Proposer name is required"));
            }
        }
        SubmissionStep::Description => {
            if form.description.trim().is_empty() {
                errors.push(FieldError::new("description", "Description is required"));
            } else if form.description.chars().count() < MIN_DESCRIPTION_LEN {
                errors.push(FieldError::new(
                    "description",
                    format!(
                        "Description must be at least {} characters",
                        MIN_DESCRIPTION_LEN
                    ),
                ));
            } else if form.description.len() > MAX_TEXT_LEN {
                errors.push(FieldError::new(
                    "description",
                    format!("Description too long (max {} bytes)", MAX_TEXT_LEN),
                ));
            }
            if form.justification.trim().is_empty() {
                errors.push(FieldError::new("justification", "Justification is required"));
            } else if form.justification.len() > MAX_TEXT_LEN {
                errors.push(FieldError::new(
                    "justification",
                    format!("Justification too long (max {} bytes)", MAX_TEXT_LEN),
                ));
            }
        }
        SubmissionStep::Impact => {
            if form.expected_impact.trim().is_empty() {
                errors.push(FieldError::new(
                    "expectedImpact",
                    "Expected impact is required",
                ));
            } else if form.expected_impact.len() > MAX_TEXT_LEN {
                errors.push(FieldError::new(
                    "expectedImpact",
                    format!("Expected impact too long (max {} bytes)", MAX_TEXT_LEN),
                ));
            }
            if form.implementation_plan.trim().is_empty() {
                errors.push(FieldError::new(
                    "implementationPlan",
                    "Implementation plan is required",
                ));
            } else if form.implementation_plan.len() > MAX_TEXT_LEN {
                errors.push(FieldError::new(
                    "implementationPlan",
                    format!("Implementation plan too long (max {} bytes)", MAX_TEXT_LEN),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate the complete submission form (all steps, in order)
pub fn validate_submission(form: &SubmissionForm) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();
    for step in [
        SubmissionStep::CategoryAndBasics,
        SubmissionStep::Description,
        SubmissionStep::Impact,
    ] {
        if let Err(mut step_errors) = validate_step(step, form) {
            errors.append(&mut step_errors);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate a status transition against the legal edge set
///
/// Transitions are one-directional except the moderation revert
/// `Discussion -> Draft`. Terminal statuses admit no transitions.
pub fn validate_status_transition(
    current: ProposalStatus,
    target: ProposalStatus,
) -> Result<(), GovernanceError> {
    use ProposalStatus::*;

    match (current, target) {
        (Draft, Discussion) => Ok(()),
        // Moderation rejection returns a proposal to Draft
        (Discussion, Draft) => Ok(()),
        (Discussion, Voting) => Ok(()),
        (Voting, Approved) | (Voting, Rejected) | (Voting, Expired) => Ok(()),
        (a, _) if a.is_terminal() => Err(GovernanceError::InvalidState(format!(
            "Cannot transition out of terminal status {:?}",
            a
        ))),
        (a, b) if a == b => Err(GovernanceError::InvalidState(format!(
            "Already in {:?} status",
            a
        ))),
        (a, b) => Err(GovernanceError::InvalidState(format!(
            "Invalid transition: {:?} -> {:?}",
            a, b
        ))),
    }
}
