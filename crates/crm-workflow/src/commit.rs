//! Plan commit
//!
//! Writes go in a fixed order, least reversible last:
//!
//! 1. new enquiry, then new task
//! 2. enquiry field patch
//! 3. log appends (idempotent by key)
//! 4. lead projection
//! 5. agent fan-out over open tasks
//! 6. task patch (completion)
//!
//! A failure stops the commit. If nothing had been written the store error
//! is returned as-is, otherwise [`WorkflowError::PartialWriteFailure`] names
//! what landed and what did not.

use crate::error::{CommitStep, WorkflowError};
use crate::outcome::TransitionOutcome;
use crate::pipeline::Pipeline;
use crm_core::{Action, Task, TransitionContext, TransitionPlan};
use crm_store::{diff, to_document, Document, StoreError, LAST_MODIFIED};
use futures::future::join_all;
use std::future::Future;

/// Enquiry fields written only through the activity log
const LOG_FIELDS: &[&str] = &["activityHistory", "notes", LAST_MODIFIED];

struct Progress {
    action: Action,
    applied: Vec<CommitStep>,
}

impl Progress {
    fn new(action: Action) -> Self {
        Self {
            action,
            applied: Vec::new(),
        }
    }

    fn fail(&self, failed: Vec<CommitStep>, source: StoreError) -> WorkflowError {
        if self.applied.is_empty() {
            return WorkflowError::Store(source);
        }
        tracing::warn!(
            action = %self.action,
            applied = self.applied.len(),
            failed = ?failed,
            error = %source,
            "commit partially applied"
        );
        WorkflowError::PartialWriteFailure {
            action: self.action,
            applied: self.applied.clone(),
            failed,
            source,
        }
    }

    async fn step<T, F>(&mut self, step: CommitStep, write: F) -> Result<T, WorkflowError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match write.await {
            Ok(value) => {
                self.applied.push(step);
                Ok(value)
            }
            Err(e) => Err(self.fail(vec![step], e)),
        }
    }

    /// Compute a patch; a serialization failure counts against `step`
    fn patch<T: serde::Serialize>(
        &self,
        step: &CommitStep,
        before: &T,
        after: &T,
        exclude: &[&str],
    ) -> Result<Document, WorkflowError> {
        diff(before, after, exclude).map_err(|e| self.fail(vec![step.clone()], e))
    }
}

fn task_before<'a>(ctx: &'a TransitionContext, after: &Task) -> Option<&'a Task> {
    ctx.enquiry_tasks
        .iter()
        .chain(ctx.task.iter())
        .find(|t| t.task_id == after.task_id)
}

impl Pipeline {
    pub(crate) async fn commit(
        &self,
        ctx: &TransitionContext,
        plan: TransitionPlan,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let TransitionPlan {
            action,
            key,
            mut lead,
            enquiry,
            task,
            retargeted_tasks,
            new_enquiry,
            new_task,
            log,
        } = plan;
        let mut progress = Progress::new(action);

        // 1. creates
        let created_enquiry = match new_enquiry {
            Some(enquiry) => Some(
                progress
                    .step(CommitStep::CreateEnquiry, self.enquiries.create(enquiry))
                    .await?,
            ),
            None => None,
        };
        let created_task = match new_task {
            Some(mut new_task) => {
                if new_task.enquiry_id.is_unassigned() {
                    if let Some(created) = &created_enquiry {
                        new_task.enquiry_id = created.enquiry_id.clone();
                    }
                }
                Some(
                    progress
                        .step(CommitStep::CreateTask, self.tasks.create(new_task))
                        .await?,
                )
            }
            None => None,
        };

        // 2. enquiry patch
        if let (Some(before), Some(after)) = (&ctx.enquiry, &enquiry) {
            let step = CommitStep::UpdateEnquiry(after.enquiry_id.clone());
            let patch = progress.patch(&step, before, after, LOG_FIELDS)?;
            if !patch.is_empty() {
                progress
                    .step(step, self.enquiries.update(after.enquiry_id.as_str(), patch))
                    .await?;
            }
        }

        // 3. log
        let mut appended = 0;
        if !log.is_empty() {
            match enquiry.as_ref().or(ctx.enquiry.as_ref()) {
                Some(target) => {
                    appended = progress
                        .step(
                            CommitStep::AppendLog(target.enquiry_id.clone()),
                            self.log.append_all(&target.enquiry_id, log),
                        )
                        .await?;
                }
                None => {
                    tracing::warn!(%action, lead = %lead.lead_id, "log entries without an enquiry dropped");
                }
            }
        }

        // 4. lead projection; always stamped so ALSC sees the contact
        let step = CommitStep::UpdateLead(lead.lead_id.clone());
        let patch = progress.patch(&step, &ctx.lead, &lead, &[LAST_MODIFIED])?;
        let stamp = progress
            .step(step, self.leads.update(lead.lead_id.as_str(), patch))
            .await?;
        lead.last_modified = Some(stamp);

        // 5. agent fan-out: every task is attempted
        let writes = retargeted_tasks.iter().map(|after| async move {
            let result = match task_before(ctx, after) {
                Some(before) => diff(before, after, &[LAST_MODIFIED]),
                None => to_document(after),
            };
            let result = match result {
                Ok(patch) => self.tasks.update(after.task_id.as_str(), patch).await.map(drop),
                Err(e) => Err(e),
            };
            (after.task_id.clone(), result)
        });
        let mut retargeted = Vec::new();
        let mut failed = Vec::new();
        let mut first_error = None;
        for (task_id, result) in join_all(writes).await {
            match result {
                Ok(()) => {
                    progress.applied.push(CommitStep::RetargetTask(task_id.clone()));
                    retargeted.push(task_id);
                }
                Err(e) => {
                    tracing::warn!(task = %task_id, error = %e, "task retarget failed");
                    failed.push(CommitStep::RetargetTask(task_id));
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }
        if let Some(source) = first_error {
            return Err(progress.fail(failed, source));
        }

        // 6. task patch
        if let (Some(before), Some(after)) = (&ctx.task, &task) {
            let step = CommitStep::UpdateTask(after.task_id.clone());
            let patch = progress.patch(&step, before, after, &[LAST_MODIFIED])?;
            if !patch.is_empty() {
                progress
                    .step(step, self.tasks.update(after.task_id.as_str(), patch))
                    .await?;
            }
        }

        tracing::info!(
            %action,
            lead = %lead.lead_id,
            key = %key.0,
            steps = progress.applied.len(),
            appended,
            "transition committed"
        );

        Ok(TransitionOutcome {
            action,
            key,
            lead,
            enquiry,
            task,
            created_enquiry,
            created_task,
            retargeted,
            appended,
            noop: false,
        })
    }
}
