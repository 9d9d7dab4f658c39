//! Sequential ID allocation
//!
//! IDs come from one counter per entity kind. A counter transaction that
//! loses a race is retried with exponential backoff; a number is never
//! issued twice because only a committed increment yields one.

use crate::error::StoreError;
use crate::store::DocumentStore;
use crm_core::IdKind;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Retry behaviour for counter conflicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff_ms: 10,
        }
    }
}

impl RetryPolicy {
    fn delay(&self, retry: u32) -> Duration {
        Duration::from_millis(self.backoff_ms.saturating_mul(1u64 << retry.min(16)))
    }
}

/// Allocates `lead01` / `enq001` / `task1` style IDs
#[derive(Clone)]
pub struct IdGenerator {
    store: Arc<dyn DocumentStore>,
    policy: RetryPolicy,
}

impl std::fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdGenerator")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl IdGenerator {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            policy: RetryPolicy::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Next counter value for `kind`
    ///
    /// # Errors
    ///
    /// [`StoreError::IdAllocationFailed`] once retries are exhausted; other
    /// store errors are returned as-is.
    pub async fn next_number(&self, kind: IdKind) -> Result<u64, StoreError> {
        let counter = kind.counter_key();
        let mut retry = 0;
        loop {
            match self.store.increment_counter(counter).await {
                Ok(n) => return Ok(n),
                Err(StoreError::ConcurrencyConflict { .. }) if retry < self.policy.max_retries => {
                    let delay = self.policy.delay(retry);
                    retry += 1;
                    tracing::warn!(
                        counter,
                        retry,
                        delay_ms = delay.as_millis() as u64,
                        "counter conflict, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(StoreError::ConcurrencyConflict { .. }) => {
                    tracing::warn!(counter, attempts = retry + 1, "id allocation failed");
                    return Err(StoreError::IdAllocationFailed {
                        counter: counter.to_string(),
                        attempts: retry + 1,
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Next formatted ID for `kind`
    pub async fn next_id(&self, kind: IdKind) -> Result<String, StoreError> {
        let n = self.next_number(kind).await?;
        Ok(kind.format(n))
    }
}
