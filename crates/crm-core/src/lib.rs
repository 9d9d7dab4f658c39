//! CRM Core - Lead pipeline domain
//!
//! The pure heart of the lead workflow:
//! - Lead / Enquiry / Task records and their vocabularies
//! - Human-readable sequential identifiers
//! - The lead state matrix
//! - Transition handlers that turn a user action into a [`TransitionPlan`]
//! - The lead projection that keeps a Lead mirroring its active Enquiry
//! - The ALSC ("age since last contact") calculator
//!
//! Nothing in this crate performs I/O. Persisting a plan is the job of
//! `crm-workflow`.
//!
//! # Example
//!
//! ```rust,ignore
//! use crm_core::prelude::*;
//!
//! let ctx = TransitionContext::new(lead, Some(enquiry), Some(task), tasks);
//! let command = Command::new(actor, PipelineEvent::TaskSucceeded(TaskSuccess::default()));
//! let plan = crm_core::apply(&ctx, &command, now)?;
//! assert_eq!(plan.lead.stage, Some(Stage::InitialContacted));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod aslc;
pub mod clock;
pub mod error;
pub mod ids;
pub mod pipeline;
pub mod projection;
pub mod state_machine;
pub mod types;
pub mod validation;

pub use aslc::{aslc_report, compute_aslc, AgingSeverity, AgingThresholds, Aslc};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{StateMachineError, TransitionError, ValidationError};
pub use ids::{EnquiryId, IdKind, LeadId, TaskId, TransitionKey};
pub use pipeline::{
    apply, Action, Actor, AddEnquiry, AgentChange, CloseLead, CloseOutcome, Command, JunkLead,
    LogEntry, NextTask, PipelineEvent, PropertyChange, ReopenLead, RequirementCollected,
    Reschedule, ScheduledEvent, TaskCloseLead, TaskSuccess, TransitionContext, TransitionPlan,
};
pub use projection::{
    active_enquiry, earliest_open_task, mirrors, most_recently_modified, project_lead,
};
pub use types::{
    lead_status, ActivityHistoryItem, ActivityType, AdditionalNumber, AgentHistoryEntry, AgentRef,
    Enquiry, EnquiryDocument, EnquiryState, EoiEntry, Lead, LeadState, NoteItem, NumberLabel,
    Requirement, Stage, Tag, Task, TaskState, TaskStatus, TaskType,
};
pub use validation::NewLead;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the lead pipeline
    pub use crate::{
        apply, Action, Actor, Command, Enquiry, EnquiryState, Lead, LeadState, PipelineEvent,
        Stage, Tag, Task, TaskStatus, TaskType, TransitionContext, TransitionPlan,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
