//! Error types for the pipeline service

use crm_core::{Action, EnquiryId, LeadId, TaskId, TransitionError, ValidationError};
use crm_store::StoreError;
use std::path::PathBuf;

/// One write performed while committing a plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitStep {
    CreateEnquiry,
    CreateTask,
    UpdateEnquiry(EnquiryId),
    AppendLog(EnquiryId),
    UpdateLead(LeadId),
    RetargetTask(TaskId),
    UpdateTask(TaskId),
}

impl std::fmt::Display for CommitStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommitStep::CreateEnquiry => f.write_str("create enquiry"),
            CommitStep::CreateTask => f.write_str("create task"),
            CommitStep::UpdateEnquiry(id) => write!(f, "update {id}"),
            CommitStep::AppendLog(id) => write!(f, "append log of {id}"),
            CommitStep::UpdateLead(id) => write!(f, "update {id}"),
            CommitStep::RetargetTask(id) => write!(f, "retarget {id}"),
            CommitStep::UpdateTask(id) => write!(f, "update {id}"),
        }
    }
}

fn list(steps: &[CommitStep]) -> String {
    steps
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Pipeline service error
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Rejected before any write
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// Store call failed before anything was written
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A record named in the request does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// Some commit steps were written and at least one was not
    #[error("{action} partially applied: applied [{}], failed [{}]: {source}", list(.applied), list(.failed))]
    PartialWriteFailure {
        action: Action,
        applied: Vec<CommitStep>,
        failed: Vec<CommitStep>,
        #[source]
        source: StoreError,
    },

    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<ValidationError> for WorkflowError {
    fn from(e: ValidationError) -> Self {
        Self::Transition(e.into())
    }
}

impl WorkflowError {
    /// Check if retrying the same call may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Check if a person has to act: fix their input or repair a partial write
    #[inline]
    #[must_use]
    pub fn requires_user_action(&self) -> bool {
        matches!(
            self,
            Self::Transition(_) | Self::PartialWriteFailure { .. } | Self::NotFound { .. }
        )
    }

    /// Check if any write reached the store
    #[inline]
    #[must_use]
    pub fn is_partial(&self) -> bool {
        matches!(self, Self::PartialWriteFailure { .. })
    }
}

/// Configuration loading error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let validation = WorkflowError::from(ValidationError::MissingAgent);
        assert!(validation.requires_user_action());
        assert!(!validation.is_retryable());

        let backend = WorkflowError::from(StoreError::Backend("timeout".into()));
        assert!(backend.is_retryable());
        assert!(!backend.requires_user_action());

        let partial = WorkflowError::PartialWriteFailure {
            action: Action::ChangeAgent,
            applied: vec![CommitStep::UpdateEnquiry(EnquiryId::new("enq001"))],
            failed: vec![CommitStep::RetargetTask(TaskId::new("task2"))],
            source: StoreError::Backend("timeout".into()),
        };
        assert!(partial.is_partial());
        assert!(partial.requires_user_action());
        assert!(!partial.is_retryable());
        assert_eq!(
            partial.to_string(),
            "change agent partially applied: applied [update enq001], failed [retarget task2]: \
             backend error: timeout"
        );
    }
}
