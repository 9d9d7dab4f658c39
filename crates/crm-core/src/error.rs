//! Error types for the lead pipeline core
//!
//! Everything here is raised before any write is attempted:
//! - User input failing a precondition
//! - Lead state moves outside the allowed matrix

use crate::ids::{EnquiryId, LeadId, TaskId};
use crate::types::LeadState;

/// User-supplied input failed a precondition
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Action needs a reason and none was given
    #[error("a reason is required to {0}")]
    MissingReason(&'static str),

    /// No agent selected
    #[error("an agent must be selected")]
    MissingAgent,

    /// Agent selection could not be parsed
    #[error("invalid agent reference: '{0}'")]
    InvalidAgentRef(String),

    /// Reassignment to the agent already holding the enquiry
    #[error("enquiry is already assigned to agent {0}")]
    UnchangedAgent(String),

    /// No property selected
    #[error("a property must be selected")]
    MissingProperty,

    /// Property change to the property already held
    #[error("enquiry is already for property '{0}'")]
    UnchangedProperty(String),

    /// Lead name missing
    #[error("lead name is required")]
    MissingName,

    /// Phone number malformed
    #[error("invalid phone number: '{0}'")]
    InvalidPhone(String),

    /// Phone number already belongs to another lead
    #[error("phone number {phone} already belongs to {existing}")]
    DuplicatePhone { phone: String, existing: LeadId },

    /// Email malformed
    #[error("invalid email: '{0}'")]
    InvalidEmail(String),

    /// Action needs an enquiry and the lead has none
    #[error("lead {0} has no enquiry")]
    MissingEnquiry(LeadId),

    /// Action needs a task and none was given
    #[error("a task is required to {0}")]
    MissingTask(&'static str),

    /// Task already completed
    #[error("task {0} is not open")]
    TaskNotOpen(TaskId),

    /// Task belongs to another enquiry
    #[error("task {task} does not belong to enquiry {enquiry}")]
    TaskMismatch { task: TaskId, enquiry: EnquiryId },

    /// Enquiry belongs to another lead
    #[error("enquiry {enquiry} does not belong to lead {lead}")]
    EnquiryMismatch { enquiry: EnquiryId, lead: LeadId },

    /// Reschedule without a usable date or event
    #[error("invalid schedule: {0}")]
    InvalidSchedule(&'static str),

    /// EOI collected without any entry
    #[error("eoi collection requires at least one entry with a positive amount")]
    MissingEoiEntries,

    /// Follow-up task requested on an outcome that ends the enquiry
    #[error("cannot schedule a follow-up task when the enquiry ends")]
    FollowUpOnTerminal,
}

/// Lead state matrix violations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateMachineError {
    /// Move not in the allowed matrix
    #[error("illegal lead transition: {from} -> {to}")]
    IllegalTransition { from: LeadState, to: LeadState },

    /// Task-driven action on a lead that is not open
    #[error("lead is {0}; reopen it first")]
    LeadNotOpen(LeadState),

    /// Reopen on a lead that is not closed or dropped
    #[error("lead is {0} and cannot be reopened")]
    NotReopenable(LeadState),
}

/// Any reason a transition could not be planned
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// Input failed validation
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// State matrix rejected the move
    #[error("state machine: {0}")]
    StateMachine(#[from] StateMachineError),
}

impl TransitionError {
    /// Check if the user can fix this by changing their input
    #[inline]
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
