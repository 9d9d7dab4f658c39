//! Error types for the store adapter

use crate::document::Collection;

/// Store adapter error
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Document does not exist
    #[error("{collection}/{id} not found")]
    NotFound { collection: Collection, id: String },

    /// Create on an ID that is taken
    #[error("{collection}/{id} already exists")]
    AlreadyExists { collection: Collection, id: String },

    /// Counter transaction lost a race; safe to retry
    #[error("concurrent update on counter '{counter}'")]
    ConcurrencyConflict { counter: String },

    /// Counter transaction kept conflicting
    #[error("could not allocate an id from counter '{counter}' after {attempts} attempts")]
    IdAllocationFailed { counter: String, attempts: u32 },

    /// Document could not be (de)serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Record did not serialize to a JSON object
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Backend failure (network, quota, ...)
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Check if retrying the same call may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. } | Self::Backend(_))
    }

    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
