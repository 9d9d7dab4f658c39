//! What a committed transition produced

use crm_core::{Action, Enquiry, Lead, Task, TaskId, TransitionKey, TransitionPlan};

/// Records as they stand after a transition
///
/// Log entries are not folded into `enquiry`; read them through the
/// activity log.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionOutcome {
    pub action: Action,
    pub key: TransitionKey,
    pub lead: Lead,
    pub enquiry: Option<Enquiry>,
    pub task: Option<Task>,
    pub created_enquiry: Option<Enquiry>,
    pub created_task: Option<Task>,
    /// Tasks moved to a new agent
    pub retargeted: Vec<TaskId>,
    /// Log entries actually appended (duplicates by key are skipped)
    pub appended: usize,
    /// True when nothing was written
    pub noop: bool,
}

impl TransitionOutcome {
    /// Outcome of a plan that wrote nothing
    #[must_use]
    pub fn unchanged(plan: TransitionPlan) -> Self {
        Self {
            action: plan.action,
            key: plan.key,
            lead: plan.lead,
            enquiry: plan.enquiry,
            task: plan.task,
            created_enquiry: None,
            created_task: None,
            retargeted: Vec::new(),
            appended: 0,
            noop: true,
        }
    }

    /// The enquiry the lead now mirrors when this transition opened one
    #[must_use]
    pub fn current_enquiry(&self) -> Option<&Enquiry> {
        self.created_enquiry.as_ref().or(self.enquiry.as_ref())
    }
}
