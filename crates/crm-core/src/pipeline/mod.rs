//! Pipeline transitions
//!
//! Every user action on a lead is a [`Command`]. [`apply`] turns a command and
//! an explicit [`TransitionContext`] into a [`TransitionPlan`]: the after-state
//! of every record involved plus the log entries to append. Nothing is
//! written here.

mod handlers;
mod tables;

pub use tables::{
    close_reason_status, requirement_outcome, reschedule_stage, reschedule_status, success_target,
    SuccessTarget,
};

use crate::error::TransitionError;
use crate::ids::TransitionKey;
use crate::state_machine::validate_transition;
use crate::types::{
    lead_status, ActivityHistoryItem, AgentRef, Enquiry, EnquiryState, EoiEntry, Lead, LeadState,
    NoteItem, Requirement, Tag, Task, TaskState, TaskType,
};
use serde::{Deserialize, Serialize};

/// Agent performing an action
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub agent_id: String,
    pub agent_name: String,
}

impl Actor {
    #[inline]
    #[must_use]
    pub fn new(agent_id: impl Into<String>, agent_name: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            agent_name: agent_name.into(),
        }
    }
}

impl From<AgentRef> for Actor {
    fn from(agent: AgentRef) -> Self {
        Self::new(agent.id, agent.name)
    }
}

/// Follow-up task requested together with an outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextTask {
    pub task_type: TaskType,
    #[serde(default)]
    pub event_name: Option<String>,
    #[serde(default)]
    pub scheduled_date: Option<i64>,
}

impl NextTask {
    #[inline]
    #[must_use]
    pub fn new(task_type: TaskType) -> Self {
        Self {
            task_type,
            event_name: None,
            scheduled_date: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn at(mut self, scheduled_date: i64) -> Self {
        self.scheduled_date = Some(scheduled_date);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_event_name(mut self, name: impl Into<String>) -> Self {
        self.event_name = Some(name.into());
        self
    }
}

/// Event picked in the reschedule form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduledEvent {
    Call,
    SiteVisit,
    Meeting,
    FollowUp,
}

impl ScheduledEvent {
    /// Default `eventName` written on the task
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            ScheduledEvent::Call => "call scheduled",
            ScheduledEvent::SiteVisit => "visit scheduled",
            ScheduledEvent::Meeting => "meeting scheduled",
            ScheduledEvent::FollowUp => "follow up scheduled",
        }
    }
}

/// Outcome of an explicit close
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloseOutcome {
    Closed,
    Dropped,
}

impl CloseOutcome {
    #[must_use]
    pub const fn state(self) -> EnquiryState {
        match self {
            CloseOutcome::Closed => EnquiryState::Closed,
            CloseOutcome::Dropped => EnquiryState::Dropped,
        }
    }

    /// `leadStatus` written for this outcome
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            CloseOutcome::Closed => lead_status::CLOSED,
            CloseOutcome::Dropped => lead_status::DROPPED,
        }
    }
}

/// Task completed successfully
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSuccess {
    #[serde(default)]
    pub task_state: Option<TaskState>,
    #[serde(default)]
    pub tag: Option<Tag>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub eoi_entries: Vec<EoiEntry>,
    #[serde(default)]
    pub next_task: Option<NextTask>,
}

/// Task outcome that drops the lead
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCloseLead {
    #[serde(default)]
    pub task_state: Option<TaskState>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Lead moves to another property
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyChange {
    pub property_name: String,
    #[serde(default)]
    pub property_id: Option<String>,
    pub reason: String,
    #[serde(default)]
    pub tag: Option<Tag>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub next_task: Option<NextTask>,
}

/// Enquiry handed to another agent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentChange {
    /// Select value, `"<agentId>|<agentName>"`
    pub agent: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// Task moved to a new date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reschedule {
    #[serde(default)]
    pub task_state: Option<TaskState>,
    pub event: ScheduledEvent,
    /// Overrides the event's default label
    #[serde(default)]
    pub event_name: Option<String>,
    pub scheduled_date: i64,
    #[serde(default)]
    pub note: Option<String>,
}

/// Requirements captured during a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementCollected {
    #[serde(default)]
    pub task_state: Option<TaskState>,
    pub tag: Tag,
    #[serde(default)]
    pub requirement: Option<Requirement>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub next_task: Option<NextTask>,
}

/// Explicit close from the lead page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseLead {
    pub outcome: CloseOutcome,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReopenLead {
    pub reason: String,
}

/// Manually added enquiry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddEnquiry {
    pub property_name: String,
    #[serde(default)]
    pub property_id: Option<String>,
    /// Select value, `"<agentId>|<agentName>"`
    pub agent: String,
    /// Falls back to the lead's source
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub next_task: Option<NextTask>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JunkLead {
    #[serde(default)]
    pub reason: Option<String>,
}

/// Every user action the pipeline understands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    TaskSucceeded(TaskSuccess),
    TaskClosed(TaskCloseLead),
    PropertyChanged(PropertyChange),
    AgentChanged(AgentChange),
    Rescheduled(Reschedule),
    RequirementCollected(RequirementCollected),
    LeadClosed(CloseLead),
    LeadReopened(ReopenLead),
    EnquiryAdded(AddEnquiry),
    Junked(JunkLead),
}

impl PipelineEvent {
    #[must_use]
    pub fn action(&self) -> Action {
        match self {
            PipelineEvent::TaskSucceeded(_) => Action::TaskSuccess,
            PipelineEvent::TaskClosed(_) => Action::TaskCloseLead,
            PipelineEvent::PropertyChanged(_) => Action::ChangeProperty,
            PipelineEvent::AgentChanged(_) => Action::ChangeAgent,
            PipelineEvent::Rescheduled(_) => Action::Reschedule,
            PipelineEvent::RequirementCollected(_) => Action::RequirementCollected,
            PipelineEvent::LeadClosed(_) => Action::CloseLead,
            PipelineEvent::LeadReopened(_) => Action::ReopenLead,
            PipelineEvent::EnquiryAdded(_) => Action::AddEnquiry,
            PipelineEvent::Junked(_) => Action::Junk,
        }
    }
}

/// Name of a transition, for logs and error reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    TaskSuccess,
    TaskCloseLead,
    ChangeProperty,
    ChangeAgent,
    Reschedule,
    RequirementCollected,
    CloseLead,
    ReopenLead,
    AddEnquiry,
    Junk,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Action::TaskSuccess => "task success",
            Action::TaskCloseLead => "task close lead",
            Action::ChangeProperty => "change property",
            Action::ChangeAgent => "change agent",
            Action::Reschedule => "reschedule",
            Action::RequirementCollected => "requirement collected",
            Action::CloseLead => "close lead",
            Action::ReopenLead => "reopen lead",
            Action::AddEnquiry => "add enquiry",
            Action::Junk => "junk",
        };
        f.write_str(name)
    }
}

/// One user action, keyed for idempotency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub key: TransitionKey,
    pub actor: Actor,
    pub event: PipelineEvent,
}

impl Command {
    /// Create a command with a fresh key
    #[inline]
    #[must_use]
    pub fn new(actor: Actor, event: PipelineEvent) -> Self {
        Self {
            key: TransitionKey::new(),
            actor,
            event,
        }
    }

    /// Reuse the key of an earlier submission
    #[inline]
    #[must_use]
    pub fn with_key(mut self, key: TransitionKey) -> Self {
        self.key = key;
        self
    }

    #[inline]
    #[must_use]
    pub fn action(&self) -> Action {
        self.event.action()
    }
}

/// Records a transition reads
///
/// `enquiry_tasks` holds every task of `enquiry`, the current `task`
/// included. When `enquiry` is not the lead's active enquiry the lead's
/// mirror fields are left alone.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionContext {
    pub lead: Lead,
    pub enquiry: Option<Enquiry>,
    pub task: Option<Task>,
    pub enquiry_tasks: Vec<Task>,
    pub enquiry_is_active: bool,
}

impl TransitionContext {
    #[must_use]
    pub fn new(
        lead: Lead,
        enquiry: Option<Enquiry>,
        task: Option<Task>,
        enquiry_tasks: Vec<Task>,
    ) -> Self {
        Self {
            lead,
            enquiry,
            task,
            enquiry_tasks,
            enquiry_is_active: true,
        }
    }

    /// Mark the context enquiry as an older, non-active one
    #[inline]
    #[must_use]
    pub fn inactive(mut self) -> Self {
        self.enquiry_is_active = false;
        self
    }
}

/// Entry for an enquiry's notes or activity history
#[derive(Debug, Clone, PartialEq)]
pub enum LogEntry {
    Note(NoteItem),
    Activity(ActivityHistoryItem),
}

impl LogEntry {
    /// Idempotency key, once assigned
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            LogEntry::Note(note) => note.key.as_deref(),
            LogEntry::Activity(item) => item.key.as_deref(),
        }
    }

    pub(crate) fn set_key(&mut self, key: String) {
        match self {
            LogEntry::Note(note) => note.key = Some(key),
            LogEntry::Activity(item) => item.key = Some(key),
        }
    }

    /// Activity payload, if this is an activity
    #[must_use]
    pub fn as_activity(&self) -> Option<&ActivityHistoryItem> {
        match self {
            LogEntry::Activity(item) => Some(item),
            LogEntry::Note(_) => None,
        }
    }
}

/// Computed outcome of one command
///
/// `lead`, `enquiry` and `task` are after-states of the context records;
/// the service diffs them against the before-states. `log` is appended to
/// `enquiry` and is not part of `enquiry.activity_history`/`notes`. New
/// records carry unassigned IDs; `new_task` belongs to `new_enquiry` when
/// both are present.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionPlan {
    pub action: Action,
    pub key: TransitionKey,
    pub lead: Lead,
    pub enquiry: Option<Enquiry>,
    pub task: Option<Task>,
    pub retargeted_tasks: Vec<Task>,
    pub new_enquiry: Option<Enquiry>,
    pub new_task: Option<Task>,
    pub log: Vec<LogEntry>,
}

impl TransitionPlan {
    /// Plan that writes nothing
    #[must_use]
    pub fn unchanged(action: Action, key: TransitionKey, ctx: &TransitionContext) -> Self {
        Self {
            action,
            key,
            lead: ctx.lead.clone(),
            enquiry: ctx.enquiry.clone(),
            task: ctx.task.clone(),
            retargeted_tasks: Vec::new(),
            new_enquiry: None,
            new_task: None,
            log: Vec::new(),
        }
    }

    /// True when committing this plan against `ctx` would write nothing
    #[must_use]
    pub fn is_noop(&self, ctx: &TransitionContext) -> bool {
        self.log.is_empty()
            && self.new_enquiry.is_none()
            && self.new_task.is_none()
            && self.retargeted_tasks.is_empty()
            && self.lead == ctx.lead
            && self.enquiry == ctx.enquiry
            && self.task == ctx.task
    }

    /// Activities this plan appends, in order
    pub fn activities(&self) -> impl Iterator<Item = &ActivityHistoryItem> {
        self.log.iter().filter_map(LogEntry::as_activity)
    }

    fn assign_keys(&mut self) {
        let key = self.key;
        let mut index = 0;
        for entry in &mut self.log {
            entry.set_key(key.entry_key(index));
            index += 1;
        }
        if let Some(enquiry) = &mut self.new_enquiry {
            for item in &mut enquiry.activity_history {
                if item.key.is_none() {
                    item.key = Some(key.entry_key(index));
                    index += 1;
                }
            }
            for note in &mut enquiry.notes {
                if note.key.is_none() {
                    note.key = Some(key.entry_key(index));
                    index += 1;
                }
            }
        }
    }
}

/// Compute the plan for `command` against `ctx`.
///
/// # Errors
///
/// [`TransitionError::Validation`] when the input fails a precondition and
/// [`TransitionError::StateMachine`] when the resulting lead state is not
/// reachable from the current one. Either way nothing has been written.
pub fn apply(
    ctx: &TransitionContext,
    command: &Command,
    now: i64,
) -> Result<TransitionPlan, TransitionError> {
    let actor = &command.actor;
    let mut plan = match &command.event {
        PipelineEvent::TaskSucceeded(event) => handlers::task_success(ctx, actor, event, now)?,
        PipelineEvent::TaskClosed(event) => handlers::task_close_lead(ctx, actor, event, now)?,
        PipelineEvent::PropertyChanged(event) => {
            handlers::change_property(ctx, actor, event, now)?
        }
        PipelineEvent::AgentChanged(event) => handlers::change_agent(ctx, actor, event, now)?,
        PipelineEvent::Rescheduled(event) => handlers::reschedule(ctx, actor, event, now)?,
        PipelineEvent::RequirementCollected(event) => {
            handlers::requirement_collected(ctx, actor, event, now)?
        }
        PipelineEvent::LeadClosed(event) => handlers::close_lead(ctx, actor, event, now)?,
        PipelineEvent::LeadReopened(event) => handlers::reopen_lead(ctx, actor, event, now)?,
        PipelineEvent::EnquiryAdded(event) => handlers::add_enquiry(ctx, actor, event, now)?,
        PipelineEvent::Junked(event) => handlers::junk(ctx, actor, event, now)?,
    };
    plan.key = command.key;

    if plan.lead.state != ctx.lead.state {
        validate_transition(ctx.lead.state, plan.lead.state)?;
    } else if plan.lead.state == LeadState::Junk && !plan.is_noop(ctx) {
        validate_transition(LeadState::Junk, LeadState::Junk)?;
    }

    plan.assign_keys();
    Ok(plan)
}
