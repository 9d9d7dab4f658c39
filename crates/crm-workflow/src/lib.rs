//! CRM Workflow - the lead pipeline service
//!
//! Ties the pure planner in `crm-core` to a document store:
//! - Loads the lead, enquiry and task a command targets
//! - Commits the resulting plan in a fixed, least-reversible-last order
//! - Registers leads and junks them in bulk
//! - Answers read queries (active enquiry, ALSC)
//!
//! # Example
//!
//! ```rust,ignore
//! use crm_workflow::prelude::*;
//!
//! let pipeline = Pipeline::new(store, PipelineConfig::default());
//! let lead = pipeline.create_lead(NewLead::new("Priya", "+91 98765 43210", "website")).await?;
//! let command = Command::new(actor, PipelineEvent::EnquiryAdded(add_enquiry));
//! let outcome = pipeline.execute(&ContextRef::lead(lead.lead_id), command).await?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod bulk;
mod commit;
pub mod config;
pub mod error;
pub mod outcome;
pub mod pipeline;

pub use bulk::BulkReport;
pub use config::PipelineConfig;
pub use error::{CommitStep, ConfigError, WorkflowError};
pub use outcome::TransitionOutcome;
pub use pipeline::{ContextRef, Pipeline};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving the pipeline
    pub use crate::{BulkReport, ContextRef, Pipeline, PipelineConfig, TransitionOutcome, WorkflowError};
    pub use crm_core::prelude::*;
    pub use crm_core::NewLead;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
