//! One handler per pipeline event
//!
//! Handlers validate their input, then edit clones of the context records.
//! [`super::apply`] checks the resulting lead state and assigns log keys.

use super::tables::{
    close_reason_status, requirement_outcome, reschedule_stage, reschedule_status, success_target,
};
use super::{
    Action, Actor, AddEnquiry, AgentChange, CloseLead, JunkLead, LogEntry, NextTask,
    PropertyChange, ReopenLead, RequirementCollected, Reschedule, TaskCloseLead, TaskSuccess,
    TransitionContext, TransitionPlan,
};
use crate::error::{StateMachineError, TransitionError, ValidationError};
use crate::ids::{EnquiryId, TaskId, TransitionKey};
use crate::projection::{earliest_open_task, project_lead};
use crate::state_machine::is_reopenable;
use crate::types::{
    lead_status, ActivityHistoryItem, ActivityType, AgentHistoryEntry, AgentRef, Enquiry,
    EnquiryState, LeadState, NoteItem, Tag, Task, TaskState, TaskStatus, TaskType,
};
use serde_json::{json, Map, Value};
use ulid::Ulid;

type HandlerResult = Result<TransitionPlan, TransitionError>;

fn draft(action: Action, ctx: &TransitionContext) -> TransitionPlan {
    TransitionPlan::unchanged(action, TransitionKey(Ulid::nil()), ctx)
}

// ---------------------------------------------------------------------------
// Preconditions
// ---------------------------------------------------------------------------

fn require_open_lead(ctx: &TransitionContext) -> Result<(), StateMachineError> {
    if ctx.lead.state == LeadState::Open {
        Ok(())
    } else {
        Err(StateMachineError::LeadNotOpen(ctx.lead.state))
    }
}

fn require_enquiry(ctx: &TransitionContext) -> Result<&Enquiry, ValidationError> {
    let enquiry = ctx
        .enquiry
        .as_ref()
        .ok_or_else(|| ValidationError::MissingEnquiry(ctx.lead.lead_id.clone()))?;
    if enquiry.lead_id != ctx.lead.lead_id {
        return Err(ValidationError::EnquiryMismatch {
            enquiry: enquiry.enquiry_id.clone(),
            lead: ctx.lead.lead_id.clone(),
        });
    }
    Ok(enquiry)
}

fn require_task<'a>(
    ctx: &'a TransitionContext,
    enquiry: &Enquiry,
    purpose: &'static str,
) -> Result<&'a Task, ValidationError> {
    let task = ctx
        .task
        .as_ref()
        .ok_or(ValidationError::MissingTask(purpose))?;
    if task.enquiry_id != enquiry.enquiry_id {
        return Err(ValidationError::TaskMismatch {
            task: task.task_id.clone(),
            enquiry: enquiry.enquiry_id.clone(),
        });
    }
    Ok(task)
}

fn require_open_task<'a>(
    ctx: &'a TransitionContext,
    enquiry: &Enquiry,
    purpose: &'static str,
) -> Result<&'a Task, ValidationError> {
    let task = require_task(ctx, enquiry, purpose)?;
    if task.is_open() {
        Ok(task)
    } else {
        Err(ValidationError::TaskNotOpen(task.task_id.clone()))
    }
}

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

// ---------------------------------------------------------------------------
// Log entries
// ---------------------------------------------------------------------------

fn activity(
    activity_type: ActivityType,
    actor: &Actor,
    now: i64,
    data: Value,
) -> ActivityHistoryItem {
    ActivityHistoryItem {
        activity_type,
        timestamp: now,
        agent_name: actor.agent_name.clone(),
        data,
        key: None,
    }
}

fn note_item(
    actor: &Actor,
    task_type: Option<TaskType>,
    note: Option<&str>,
    now: i64,
) -> Option<NoteItem> {
    non_empty(note).map(|text| NoteItem {
        timestamp: now,
        agent_id: actor.agent_id.clone(),
        agent_name: actor.agent_name.clone(),
        task_type,
        note: text.to_string(),
        key: None,
    })
}

fn tag_change(old: Option<Tag>, new: Option<Tag>) -> Option<Value> {
    (old != new).then(|| json!([old, new]))
}

/// Payload of a `task execution` activity
struct Execution<'a> {
    task_type: TaskType,
    task_state: Option<TaskState>,
    lead_status: Option<&'a str>,
    tag: Option<Value>,
    note: Option<&'a str>,
}

impl Execution<'_> {
    fn into_data(self) -> Value {
        let mut data = Map::new();
        data.insert("taskType".into(), json!(self.task_type));
        if let Some(state) = self.task_state {
            data.insert("taskState".into(), json!(state));
        }
        if let Some(status) = self.lead_status {
            data.insert("leadStatus".into(), json!(status));
        }
        if let Some(tag) = self.tag {
            data.insert("tag".into(), tag);
        }
        if let Some(note) = non_empty(self.note) {
            data.insert("note".into(), json!(note));
        }
        Value::Object(data)
    }
}

fn task_created(actor: &Actor, task: &Task, now: i64) -> ActivityHistoryItem {
    activity(
        ActivityType::TaskCreated,
        actor,
        now,
        json!({
            "taskType": task.task_type,
            "eventName": task.event_name,
            "scheduledDate": task.scheduled_date,
        }),
    )
}

// ---------------------------------------------------------------------------
// Record edits
// ---------------------------------------------------------------------------

fn track_rnr(enquiry: &mut Enquiry, task_state: Option<TaskState>) {
    match task_state {
        Some(TaskState::NotConnected) => {
            enquiry.rnr = true;
            enquiry.rnr_count = enquiry.rnr_count.saturating_add(1);
        }
        Some(TaskState::Connected) => enquiry.rnr = false,
        _ => {}
    }
}

/// Copy the enquiry outcome onto a task being written
fn stamp_task(task: &mut Task, enquiry: &Enquiry) {
    task.stage = enquiry.stage;
    task.lead_status.clone_from(&enquiry.lead_status);
    task.tag = enquiry.tag;
}

#[allow(clippy::too_many_arguments)]
fn new_enquiry(
    ctx: &TransitionContext,
    actor: &Actor,
    agent: &AgentRef,
    property_name: &str,
    property_id: Option<String>,
    source: String,
    tag: Option<Tag>,
    now: i64,
) -> Enquiry {
    let opened = activity(
        ActivityType::NewEnquiry,
        actor,
        now,
        json!({
            "propertyName": property_name,
            "agentName": agent.name,
            "source": source,
        }),
    );
    Enquiry {
        enquiry_id: EnquiryId::default(),
        lead_id: ctx.lead.lead_id.clone(),
        agent_id: agent.id.clone(),
        agent_name: agent.name.clone(),
        property_id,
        property_name: property_name.to_string(),
        source,
        lead_status: Some(lead_status::INTERESTED.to_string()),
        stage: None,
        tag,
        state: EnquiryState::Open,
        rnr: false,
        rnr_count: 0,
        agent_history: vec![AgentHistoryEntry {
            agent_id: agent.id.clone(),
            agent_name: agent.name.clone(),
            timestamp: now,
            last_stage: None,
        }],
        activity_history: vec![opened],
        notes: Vec::new(),
        documents: Vec::new(),
        requirements: Vec::new(),
        added: now,
        last_modified: Some(now),
    }
}

fn spawn_task(enquiry: &Enquiry, next: &NextTask, now: i64) -> Result<Task, ValidationError> {
    if next.scheduled_date.is_some_and(|date| date < now) {
        return Err(ValidationError::InvalidSchedule(
            "follow-up task is scheduled in the past",
        ));
    }
    Ok(Task {
        task_id: TaskId::default(),
        enquiry_id: enquiry.enquiry_id.clone(),
        lead_id: enquiry.lead_id.clone(),
        agent_id: enquiry.agent_id.clone(),
        agent_name: enquiry.agent_name.clone(),
        task_type: next.task_type,
        event_name: non_empty(next.event_name.as_deref()).map(str::to_string),
        status: TaskStatus::Open,
        stage: enquiry.stage,
        lead_status: enquiry.lead_status.clone(),
        tag: enquiry.tag,
        scheduled_date: next.scheduled_date,
        added: now,
        completion_date: None,
        last_modified: Some(now),
        eoi_entries: Vec::new(),
        email_sent: None,
    })
}

/// Follow-up task on the context enquiry; its `task created` goes to the log
fn spawn_on_context(
    plan: &mut TransitionPlan,
    actor: &Actor,
    next: Option<&NextTask>,
    now: i64,
) -> Result<(), ValidationError> {
    let (Some(next), Some(enquiry)) = (next, plan.enquiry.as_ref()) else {
        return Ok(());
    };
    let task = spawn_task(enquiry, next, now)?;
    plan.log
        .push(LogEntry::Activity(task_created(actor, &task, now)));
    plan.new_task = Some(task);
    Ok(())
}

/// Follow-up task on the new enquiry; its `task created` is seeded there
fn spawn_on_new(
    plan: &mut TransitionPlan,
    actor: &Actor,
    next: Option<&NextTask>,
    now: i64,
) -> Result<(), ValidationError> {
    let (Some(next), Some(enquiry)) = (next, plan.new_enquiry.as_mut()) else {
        return Ok(());
    };
    let task = spawn_task(enquiry, next, now)?;
    enquiry
        .activity_history
        .push(task_created(actor, &task, now));
    plan.new_task = Some(task);
    Ok(())
}

// ---------------------------------------------------------------------------
// Lead projection
// ---------------------------------------------------------------------------

/// Tasks of the context enquiry as they stand after the plan
fn tasks_after(ctx: &TransitionContext, plan: &TransitionPlan) -> Vec<Task> {
    let mut before: Vec<&Task> = ctx.enquiry_tasks.iter().collect();
    if let Some(task) = &ctx.task {
        if !before.iter().any(|t| t.task_id == task.task_id) {
            before.push(task);
        }
    }

    let mut tasks: Vec<Task> = before
        .into_iter()
        .map(|task| {
            plan.retargeted_tasks
                .iter()
                .chain(plan.task.iter())
                .find(|updated| updated.task_id == task.task_id)
                .unwrap_or(task)
                .clone()
        })
        .collect();

    if plan.new_enquiry.is_none() {
        tasks.extend(plan.new_task.iter().cloned());
    }
    tasks
}

fn project_from_context(ctx: &TransitionContext, plan: &mut TransitionPlan) {
    let Some(enquiry) = plan.enquiry.as_ref() else {
        return;
    };
    let tasks = tasks_after(ctx, plan);
    let lead = project_lead(&ctx.lead, enquiry, earliest_open_task(&tasks));
    plan.lead = lead;
}

/// Mirror the context enquiry when it is the lead's active one
fn mirror_context(ctx: &TransitionContext, plan: &mut TransitionPlan) {
    if ctx.enquiry_is_active {
        project_from_context(ctx, plan);
    }
}

fn mirror_new(ctx: &TransitionContext, plan: &mut TransitionPlan) {
    if let Some(enquiry) = plan.new_enquiry.as_ref() {
        let lead = project_lead(&ctx.lead, enquiry, earliest_open_task(plan.new_task.iter()));
        plan.lead = lead;
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub(super) fn task_success(
    ctx: &TransitionContext,
    actor: &Actor,
    event: &TaskSuccess,
    now: i64,
) -> HandlerResult {
    require_open_lead(ctx)?;
    let enquiry = require_enquiry(ctx)?;
    let task = require_open_task(ctx, enquiry, "record a task outcome")?;

    let target = success_target(task.task_type);
    let is_eoi = task.task_type == TaskType::EoiCollection;
    if is_eoi && !event.eoi_entries.iter().any(|entry| entry.amount > 0) {
        return Err(ValidationError::MissingEoiEntries.into());
    }
    if target.state != EnquiryState::Open && event.next_task.is_some() {
        return Err(ValidationError::FollowUpOnTerminal.into());
    }

    let mut plan = draft(Action::TaskSuccess, ctx);
    let mut enq = enquiry.clone();
    enq.stage = Some(target.stage);
    enq.lead_status = Some(target.lead_status.to_string());
    enq.state = target.state;
    if event.tag.is_some() {
        enq.tag = event.tag;
    }
    track_rnr(&mut enq, event.task_state);

    let mut done = task.clone();
    done.complete(now);
    stamp_task(&mut done, &enq);
    if is_eoi {
        done.eoi_entries.clone_from(&event.eoi_entries);
    }

    let data = Execution {
        task_type: task.task_type,
        task_state: event.task_state,
        lead_status: Some(target.lead_status),
        tag: tag_change(enquiry.tag, enq.tag),
        note: event.note.as_deref(),
    }
    .into_data();
    plan.log.push(LogEntry::Activity(activity(
        ActivityType::TaskExecution,
        actor,
        now,
        data,
    )));
    plan.log.extend(
        note_item(actor, Some(task.task_type), event.note.as_deref(), now).map(LogEntry::Note),
    );

    plan.task = Some(done);
    plan.enquiry = Some(enq);
    spawn_on_context(&mut plan, actor, event.next_task.as_ref(), now)?;
    mirror_context(ctx, &mut plan);
    Ok(plan)
}

pub(super) fn task_close_lead(
    ctx: &TransitionContext,
    actor: &Actor,
    event: &TaskCloseLead,
    now: i64,
) -> HandlerResult {
    require_open_lead(ctx)?;
    let enquiry = require_enquiry(ctx)?;
    let task = require_open_task(ctx, enquiry, "close a lead from a task")?;
    let status = close_reason_status(event.task_state);

    let mut plan = draft(Action::TaskCloseLead, ctx);
    let mut enq = enquiry.clone();
    enq.state = EnquiryState::Dropped;
    enq.lead_status = Some(status.to_string());
    track_rnr(&mut enq, event.task_state);

    let mut done = task.clone();
    done.complete(now);
    stamp_task(&mut done, &enq);

    let data = Execution {
        task_type: task.task_type,
        task_state: event.task_state,
        lead_status: Some(status),
        tag: None,
        note: event.note.as_deref(),
    }
    .into_data();
    plan.log.push(LogEntry::Activity(activity(
        ActivityType::TaskExecution,
        actor,
        now,
        data,
    )));
    plan.log.extend(
        note_item(actor, Some(task.task_type), event.note.as_deref(), now).map(LogEntry::Note),
    );

    plan.task = Some(done);
    plan.enquiry = Some(enq);
    mirror_context(ctx, &mut plan);
    Ok(plan)
}

pub(super) fn change_property(
    ctx: &TransitionContext,
    actor: &Actor,
    event: &PropertyChange,
    now: i64,
) -> HandlerResult {
    require_open_lead(ctx)?;
    let enquiry = require_enquiry(ctx)?;
    let task = match ctx.task {
        Some(_) => Some(require_open_task(ctx, enquiry, "change property")?),
        None => None,
    };

    let property_name = event.property_name.trim();
    if property_name.is_empty() {
        return Err(ValidationError::MissingProperty.into());
    }
    let reason = non_empty(Some(event.reason.as_str()))
        .ok_or(ValidationError::MissingReason("change property"))?;
    if property_name == enquiry.property_name.trim() {
        return Err(ValidationError::UnchangedProperty(property_name.to_string()).into());
    }

    let mut plan = draft(Action::ChangeProperty, ctx);
    let mut old = enquiry.clone();
    old.state = EnquiryState::Open;
    old.stage = None;
    old.lead_status = Some(lead_status::PROPERTY_CHANGED.to_string());

    plan.log.push(LogEntry::Activity(activity(
        ActivityType::PropertyChange,
        actor,
        now,
        json!({
            "old": enquiry.property_name,
            "new": property_name,
            "reason": reason,
        }),
    )));
    plan.log.extend(
        note_item(
            actor,
            task.map(|t| t.task_type),
            event.note.as_deref(),
            now,
        )
        .map(LogEntry::Note),
    );

    if let Some(task) = task {
        let mut done = task.clone();
        done.complete(now);
        stamp_task(&mut done, &old);
        plan.task = Some(done);
    }

    plan.new_enquiry = Some(new_enquiry(
        ctx,
        actor,
        &enquiry.agent(),
        property_name,
        event.property_id.clone(),
        enquiry.source.clone(),
        event.tag,
        now,
    ));
    plan.enquiry = Some(old);
    spawn_on_new(&mut plan, actor, event.next_task.as_ref(), now)?;
    mirror_new(ctx, &mut plan);
    Ok(plan)
}

pub(super) fn change_agent(
    ctx: &TransitionContext,
    actor: &Actor,
    event: &AgentChange,
    now: i64,
) -> HandlerResult {
    let enquiry = require_enquiry(ctx)?;
    let agent: AgentRef = event.agent.parse()?;
    if agent.id == enquiry.agent_id {
        return Err(ValidationError::UnchangedAgent(agent.id).into());
    }

    let mut plan = draft(Action::ChangeAgent, ctx);
    let mut enq = enquiry.clone();
    let previous = enq.agent();
    enq.agent_history.push(AgentHistoryEntry {
        agent_id: agent.id.clone(),
        agent_name: agent.name.clone(),
        timestamp: now,
        last_stage: enq.stage,
    });
    enq.agent_id.clone_from(&agent.id);
    enq.agent_name.clone_from(&agent.name);

    plan.log.push(LogEntry::Activity(activity(
        ActivityType::AgentChange,
        actor,
        now,
        json!({
            "from": previous.to_string(),
            "to": agent.to_string(),
            "stage": enq.stage,
        }),
    )));
    plan.log
        .extend(note_item(actor, None, event.note.as_deref(), now).map(LogEntry::Note));

    let mut open: Vec<&Task> = ctx.enquiry_tasks.iter().filter(|t| t.is_open()).collect();
    if let Some(task) = ctx.task.as_ref().filter(|t| t.is_open()) {
        if task.enquiry_id == enq.enquiry_id && !open.iter().any(|t| t.task_id == task.task_id) {
            open.push(task);
        }
    }
    plan.retargeted_tasks = open
        .into_iter()
        .map(|task| {
            let mut task = task.clone();
            task.agent_id.clone_from(&agent.id);
            task.agent_name.clone_from(&agent.name);
            task
        })
        .collect();

    plan.enquiry = Some(enq);
    mirror_context(ctx, &mut plan);
    Ok(plan)
}

pub(super) fn reschedule(
    ctx: &TransitionContext,
    actor: &Actor,
    event: &Reschedule,
    now: i64,
) -> HandlerResult {
    require_open_lead(ctx)?;
    let enquiry = require_enquiry(ctx)?;
    let task = require_task(ctx, enquiry, "reschedule")?;
    if event.scheduled_date < now {
        return Err(ValidationError::InvalidSchedule("scheduled date is in the past").into());
    }
    let event_name = non_empty(event.event_name.as_deref()).unwrap_or(event.event.label());
    let status = reschedule_status(event.event);

    let mut plan = draft(Action::Reschedule, ctx);
    let mut enq = enquiry.clone();
    enq.lead_status = Some(status.to_string());
    enq.stage = reschedule_stage(task.task_type, event.task_state, ctx.lead.stage, enq.stage);
    track_rnr(&mut enq, event.task_state);

    let mut moved = task.clone();
    moved.event_name = Some(event_name.to_string());
    moved.scheduled_date = Some(event.scheduled_date);
    moved.status = TaskStatus::Open;
    moved.completion_date = None;
    stamp_task(&mut moved, &enq);

    let mut data = Execution {
        task_type: task.task_type,
        task_state: event.task_state,
        lead_status: Some(status),
        tag: None,
        note: event.note.as_deref(),
    }
    .into_data();
    if let Value::Object(map) = &mut data {
        map.insert("eventName".into(), json!(event_name));
        map.insert("scheduledDate".into(), json!(event.scheduled_date));
    }
    plan.log.push(LogEntry::Activity(activity(
        ActivityType::TaskExecution,
        actor,
        now,
        data,
    )));
    plan.log.extend(
        note_item(actor, Some(task.task_type), event.note.as_deref(), now).map(LogEntry::Note),
    );

    plan.task = Some(moved);
    plan.enquiry = Some(enq);
    mirror_context(ctx, &mut plan);
    Ok(plan)
}

pub(super) fn requirement_collected(
    ctx: &TransitionContext,
    actor: &Actor,
    event: &RequirementCollected,
    now: i64,
) -> HandlerResult {
    require_open_lead(ctx)?;
    let enquiry = require_enquiry(ctx)?;
    let task = require_open_task(ctx, enquiry, "collect requirements")?;

    let (state, stage) = requirement_outcome(task.task_type, event.task_state, enquiry.stage);
    if state != EnquiryState::Open && event.next_task.is_some() {
        return Err(ValidationError::FollowUpOnTerminal.into());
    }

    let mut plan = draft(Action::RequirementCollected, ctx);
    let mut enq = enquiry.clone();
    enq.tag = Some(event.tag);
    enq.lead_status = Some(lead_status::REQUIREMENT_COLLECTED.to_string());
    enq.state = state;
    enq.stage = stage;
    enq.requirements.extend(event.requirement.iter().cloned());

    let mut done = task.clone();
    done.complete(now);
    stamp_task(&mut done, &enq);

    let data = Execution {
        task_type: task.task_type,
        task_state: event.task_state,
        lead_status: Some(lead_status::REQUIREMENT_COLLECTED),
        tag: tag_change(enquiry.tag, enq.tag),
        note: event.note.as_deref(),
    }
    .into_data();
    plan.log.push(LogEntry::Activity(activity(
        ActivityType::TaskExecution,
        actor,
        now,
        data,
    )));
    plan.log.extend(
        note_item(actor, Some(task.task_type), event.note.as_deref(), now).map(LogEntry::Note),
    );

    plan.task = Some(done);
    plan.enquiry = Some(enq);
    spawn_on_context(&mut plan, actor, event.next_task.as_ref(), now)?;
    mirror_context(ctx, &mut plan);
    Ok(plan)
}

pub(super) fn close_lead(
    ctx: &TransitionContext,
    actor: &Actor,
    event: &CloseLead,
    now: i64,
) -> HandlerResult {
    let target = event.outcome.state();
    let already = ctx.lead.state == LeadState::from(target)
        && ctx.enquiry.as_ref().map_or(true, |e| e.state == target);
    if already {
        return Ok(draft(Action::CloseLead, ctx));
    }

    let enquiry = require_enquiry(ctx)?;
    let task = match ctx.task {
        Some(_) => Some(require_task(ctx, enquiry, "close a lead")?),
        None => None,
    };

    let mut plan = draft(Action::CloseLead, ctx);
    let mut enq = enquiry.clone();
    enq.state = target;
    enq.lead_status = Some(event.outcome.label().to_string());

    if let Some(task) = task.filter(|t| t.is_open()) {
        let mut done = task.clone();
        done.complete(now);
        stamp_task(&mut done, &enq);
        plan.task = Some(done);
    }

    let mut data = json!({
        "state": target,
        "previousState": enquiry.state,
        "leadStatus": event.outcome.label(),
    });
    if let (Value::Object(map), Some(note)) = (&mut data, non_empty(event.note.as_deref())) {
        map.insert("note".into(), json!(note));
    }
    plan.log.push(LogEntry::Activity(activity(
        ActivityType::StatusUpdate,
        actor,
        now,
        data,
    )));
    plan.log.extend(
        note_item(actor, task.map(|t| t.task_type), event.note.as_deref(), now)
            .map(LogEntry::Note),
    );

    plan.enquiry = Some(enq);
    mirror_context(ctx, &mut plan);
    Ok(plan)
}

pub(super) fn reopen_lead(
    ctx: &TransitionContext,
    actor: &Actor,
    event: &ReopenLead,
    now: i64,
) -> HandlerResult {
    if !is_reopenable(ctx.lead.state) {
        return Err(StateMachineError::NotReopenable(ctx.lead.state).into());
    }
    let reason =
        non_empty(Some(event.reason.as_str())).ok_or(ValidationError::MissingReason("reopen a lead"))?;
    let enquiry = require_enquiry(ctx)?;

    let mut plan = draft(Action::ReopenLead, ctx);
    let mut enq = enquiry.clone();
    enq.state = EnquiryState::Open;

    let lead = &ctx.lead;
    plan.log.push(LogEntry::Activity(activity(
        ActivityType::LeadReopen,
        actor,
        now,
        json!({
            "reason": reason,
            "tag": lead.tag,
            "stage": lead.stage,
            "leadStatus": lead.lead_status,
            "property": lead.property_name,
        }),
    )));

    plan.enquiry = Some(enq);
    // a reopened lead mirrors the enquiry it was reopened through
    project_from_context(ctx, &mut plan);
    Ok(plan)
}

pub(super) fn add_enquiry(
    ctx: &TransitionContext,
    actor: &Actor,
    event: &AddEnquiry,
    now: i64,
) -> HandlerResult {
    let property_name = event.property_name.trim();
    if property_name.is_empty() {
        return Err(ValidationError::MissingProperty.into());
    }
    let agent: AgentRef = event.agent.parse()?;
    let source = non_empty(event.source.as_deref())
        .unwrap_or(&ctx.lead.source)
        .to_string();

    let mut plan = draft(Action::AddEnquiry, ctx);
    let mut enquiry = new_enquiry(
        ctx,
        actor,
        &agent,
        property_name,
        event.property_id.clone(),
        source,
        None,
        now,
    );
    enquiry
        .notes
        .extend(note_item(actor, None, event.note.as_deref(), now));
    plan.new_enquiry = Some(enquiry);

    spawn_on_new(&mut plan, actor, event.next_task.as_ref(), now)?;
    mirror_new(ctx, &mut plan);
    Ok(plan)
}

pub(super) fn junk(
    ctx: &TransitionContext,
    actor: &Actor,
    event: &JunkLead,
    now: i64,
) -> HandlerResult {
    let mut plan = draft(Action::Junk, ctx);
    if ctx.lead.state == LeadState::Junk {
        return Ok(plan);
    }

    if ctx.enquiry.is_none() {
        plan.lead.state = LeadState::Junk;
        plan.lead.lead_status = Some(lead_status::JUNK.to_string());
        return Ok(plan);
    }

    let enquiry = require_enquiry(ctx)?;
    let mut enq = enquiry.clone();
    enq.state = EnquiryState::Junk;
    enq.lead_status = Some(lead_status::JUNK.to_string());

    plan.log.push(LogEntry::Activity(activity(
        ActivityType::StatusUpdate,
        actor,
        now,
        json!({
            "state": EnquiryState::Junk,
            "previousState": enquiry.state,
            "leadStatus": lead_status::JUNK,
            "reason": non_empty(event.reason.as_deref()),
        }),
    )));

    plan.enquiry = Some(enq);
    // the junked enquiry is the last touched one, not necessarily the active one
    if ctx.enquiry_is_active {
        project_from_context(ctx, &mut plan);
    } else {
        plan.lead.state = LeadState::Junk;
        plan.lead.lead_status = Some(lead_status::JUNK.to_string());
    }
    Ok(plan)
}
