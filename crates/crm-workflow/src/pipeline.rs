//! Lead pipeline service
//!
//! Loads the records a transition reads, runs the pure planner and commits
//! the resulting plan. This is the only place that turns user actions into
//! store writes.

use crate::config::PipelineConfig;
use crate::error::WorkflowError;
use crate::outcome::TransitionOutcome;
use crm_core::{
    active_enquiry, apply, aslc_report, most_recently_modified, Action, Actor, Aslc, Clock,
    Command, Enquiry, EnquiryId, JunkLead, Lead, LeadId, NewLead, PipelineEvent, SystemClock,
    Task, TaskId, TransitionContext, ValidationError,
};
use crm_store::{ActivityLog, DocumentStore, IdGenerator, Query, Repository};
use std::sync::Arc;

/// Records a command targets
///
/// Without an enquiry the lead's active enquiry is used (for junk, its most
/// recently modified one).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextRef {
    pub lead_id: LeadId,
    pub enquiry_id: Option<EnquiryId>,
    pub task_id: Option<TaskId>,
}

impl ContextRef {
    #[inline]
    #[must_use]
    pub fn lead(lead_id: impl Into<LeadId>) -> Self {
        Self {
            lead_id: lead_id.into(),
            enquiry_id: None,
            task_id: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_enquiry(mut self, enquiry_id: impl Into<EnquiryId>) -> Self {
        self.enquiry_id = Some(enquiry_id.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_task(mut self, task_id: impl Into<TaskId>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }
}

#[derive(Debug, Clone, Copy)]
enum EnquiryPick {
    Active,
    LastModified,
}

/// The pipeline service
pub struct Pipeline {
    pub(crate) config: PipelineConfig,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) leads: Repository<Lead>,
    pub(crate) enquiries: Repository<Enquiry>,
    pub(crate) tasks: Repository<Task>,
    pub(crate) log: ActivityLog,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Create a service over `store` using wall-clock time
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, config: PipelineConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Create a service with an explicit time source
    #[must_use]
    pub fn with_clock(
        store: Arc<dyn DocumentStore>,
        config: PipelineConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let ids = IdGenerator::new(Arc::clone(&store)).with_policy(config.retry_policy());
        Self {
            leads: Repository::new(Arc::clone(&store), ids.clone(), Arc::clone(&clock)),
            enquiries: Repository::new(Arc::clone(&store), ids.clone(), Arc::clone(&clock)),
            tasks: Repository::new(Arc::clone(&store), ids, Arc::clone(&clock)),
            log: ActivityLog::new(store, Arc::clone(&clock)),
            config,
            clock,
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Notes and activity history of enquiries
    #[inline]
    #[must_use]
    pub fn activity_log(&self) -> &ActivityLog {
        &self.log
    }

    /// Register a new lead in `fresh` state
    ///
    /// # Errors
    ///
    /// Validation errors for malformed contact details and
    /// [`ValidationError::DuplicatePhone`] if another lead has the number.
    pub async fn create_lead(&self, new_lead: NewLead) -> Result<Lead, WorkflowError> {
        let lead = new_lead.into_lead(self.clock.now())?;

        let existing = self
            .leads
            .find(&Query::all().eq("phoneNumber", lead.phone_number.as_str()))
            .await?;
        if let Some(other) = existing.into_iter().next() {
            tracing::debug!(phone = %lead.phone_number, existing = %other.lead_id, "duplicate phone");
            return Err(ValidationError::DuplicatePhone {
                phone: lead.phone_number,
                existing: other.lead_id,
            }
            .into());
        }

        let lead = self.leads.create(lead).await?;
        tracing::info!(lead = %lead.lead_id, source = %lead.source, "lead created");
        Ok(lead)
    }

    /// Load the records `target` names, defaulting to the active enquiry
    pub async fn load_context(&self, target: &ContextRef) -> Result<TransitionContext, WorkflowError> {
        self.load(target, EnquiryPick::Active).await
    }

    async fn load(
        &self,
        target: &ContextRef,
        pick: EnquiryPick,
    ) -> Result<TransitionContext, WorkflowError> {
        let lead = self
            .leads
            .get_by_id(target.lead_id.as_str())
            .await?
            .ok_or_else(|| not_found("lead", target.lead_id.as_str()))?;
        let enquiries = self.enquiries_of(&lead.lead_id).await?;
        let active_id = active_enquiry(&enquiries).map(|e| e.enquiry_id.clone());

        let enquiry = match &target.enquiry_id {
            Some(id) => Some(
                self.enquiries
                    .get_by_id(id.as_str())
                    .await?
                    .ok_or_else(|| not_found("enquiry", id.as_str()))?,
            ),
            None => match pick {
                EnquiryPick::Active => active_enquiry(&enquiries).cloned(),
                EnquiryPick::LastModified => most_recently_modified(&enquiries).cloned(),
            },
        };

        let task = match &target.task_id {
            Some(id) => Some(
                self.tasks
                    .get_by_id(id.as_str())
                    .await?
                    .ok_or_else(|| not_found("task", id.as_str()))?,
            ),
            None => None,
        };

        let enquiry_tasks = match &enquiry {
            Some(e) => self.tasks_of(&e.enquiry_id).await?,
            None => Vec::new(),
        };

        let is_active = enquiry
            .as_ref()
            .map_or(true, |e| active_id.as_ref() == Some(&e.enquiry_id));
        let ctx = TransitionContext::new(lead, enquiry, task, enquiry_tasks);
        Ok(if is_active { ctx } else { ctx.inactive() })
    }

    /// Plan and commit one user action
    ///
    /// A command that would change nothing (closing a closed lead, junking a
    /// junk lead) returns a no-op outcome without writing.
    ///
    /// # Errors
    ///
    /// - [`WorkflowError::Transition`] if the action is rejected; nothing is written
    /// - [`WorkflowError::PartialWriteFailure`] if a write failed after others landed
    pub async fn execute(
        &self,
        target: &ContextRef,
        command: Command,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let pick = if command.action() == Action::Junk {
            EnquiryPick::LastModified
        } else {
            EnquiryPick::Active
        };
        let ctx = self.load(target, pick).await?;
        self.run(&ctx, &command).await
    }

    /// Plan and commit against an already loaded context
    pub async fn run(
        &self,
        ctx: &TransitionContext,
        command: &Command,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let plan = match apply(ctx, command, self.clock.now()) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::debug!(
                    action = %command.action(),
                    lead = %ctx.lead.lead_id,
                    error = %e,
                    "transition rejected"
                );
                return Err(e.into());
            }
        };
        tracing::debug!(
            action = %plan.action,
            lead = %ctx.lead.lead_id,
            log_entries = plan.log.len(),
            new_enquiry = plan.new_enquiry.is_some(),
            new_task = plan.new_task.is_some(),
            retargeted = plan.retargeted_tasks.len(),
            "plan computed"
        );

        if plan.is_noop(ctx) {
            tracing::info!(action = %plan.action, lead = %ctx.lead.lead_id, "nothing to commit");
            return Ok(TransitionOutcome::unchanged(plan));
        }
        self.commit(ctx, plan).await
    }

    /// Junk one lead through its most recently modified enquiry
    pub async fn junk_lead(
        &self,
        lead_id: &LeadId,
        actor: Actor,
        reason: Option<String>,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let command = Command::new(actor, PipelineEvent::Junked(JunkLead { reason }));
        self.execute(&ContextRef::lead(lead_id.clone()), command)
            .await
    }

    pub async fn lead(&self, lead_id: &LeadId) -> Result<Option<Lead>, WorkflowError> {
        Ok(self.leads.get_by_id(lead_id.as_str()).await?)
    }

    pub async fn enquiry(&self, enquiry_id: &EnquiryId) -> Result<Option<Enquiry>, WorkflowError> {
        Ok(self.enquiries.get_by_id(enquiry_id.as_str()).await?)
    }

    pub async fn task(&self, task_id: &TaskId) -> Result<Option<Task>, WorkflowError> {
        Ok(self.tasks.get_by_id(task_id.as_str()).await?)
    }

    /// Every enquiry of a lead, oldest ID first
    pub async fn enquiries_of(&self, lead_id: &LeadId) -> Result<Vec<Enquiry>, WorkflowError> {
        Ok(self
            .enquiries
            .find(&Query::all().eq("leadId", lead_id.as_str()))
            .await?)
    }

    /// Every task of an enquiry, open and complete
    pub async fn tasks_of(&self, enquiry_id: &EnquiryId) -> Result<Vec<Task>, WorkflowError> {
        Ok(self
            .tasks
            .find(&Query::all().eq("enquiryId", enquiry_id.as_str()))
            .await?)
    }

    /// The enquiry the lead mirrors
    pub async fn active_enquiry(&self, lead_id: &LeadId) -> Result<Option<Enquiry>, WorkflowError> {
        let enquiries = self.enquiries_of(lead_id).await?;
        Ok(active_enquiry(&enquiries).cloned())
    }

    /// Age since last contact, with its severity band
    ///
    /// `None` when the lead has neither a modification stamp, an enquiry nor
    /// a scheduled open task.
    pub async fn lead_aslc(&self, lead_id: &LeadId) -> Result<Option<Aslc>, WorkflowError> {
        let lead = self
            .leads
            .get_by_id(lead_id.as_str())
            .await?
            .ok_or_else(|| not_found("lead", lead_id.as_str()))?;
        let tasks = self
            .tasks
            .find(&Query::all().eq("leadId", lead_id.as_str()))
            .await?;
        let enquiries = self.enquiries_of(lead_id).await?;
        let latest_added = active_enquiry(&enquiries).map(|e| e.added);

        Ok(aslc_report(
            &lead,
            &tasks,
            latest_added,
            self.clock.now(),
            &self.config.aging_thresholds,
        ))
    }
}

fn not_found(entity: &'static str, id: &str) -> WorkflowError {
    WorkflowError::NotFound {
        entity,
        id: id.to_string(),
    }
}
