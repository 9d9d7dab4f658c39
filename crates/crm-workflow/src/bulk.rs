//! Bulk junking
//!
//! Leads are junked independently and concurrently; one lead failing never
//! stops the others.

use crate::error::WorkflowError;
use crate::pipeline::Pipeline;
use crm_core::{Actor, LeadId};
use futures::future::join_all;

/// Per-lead result of a bulk junk
#[derive(Debug, Default)]
pub struct BulkReport {
    pub junked: Vec<LeadId>,
    /// Already junk; nothing written
    pub skipped: Vec<LeadId>,
    pub failed: Vec<(LeadId, WorkflowError)>,
}

impl BulkReport {
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn total(&self) -> usize {
        self.junked.len() + self.skipped.len() + self.failed.len()
    }
}

impl Pipeline {
    /// Junk every lead in `lead_ids`, collecting failures per lead
    pub async fn junk_leads(
        &self,
        lead_ids: &[LeadId],
        actor: &Actor,
        reason: Option<&str>,
    ) -> BulkReport {
        let runs = lead_ids.iter().map(|lead_id| async move {
            let result = self
                .junk_lead(lead_id, actor.clone(), reason.map(str::to_string))
                .await;
            (lead_id.clone(), result)
        });

        let mut report = BulkReport::default();
        for (lead_id, result) in join_all(runs).await {
            match result {
                Ok(outcome) if outcome.noop => report.skipped.push(lead_id),
                Ok(_) => report.junked.push(lead_id),
                Err(e) => {
                    tracing::warn!(lead = %lead_id, error = %e, "junk failed");
                    report.failed.push((lead_id, e));
                }
            }
        }

        tracing::info!(
            junked = report.junked.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "bulk junk finished"
        );
        report
    }
}
