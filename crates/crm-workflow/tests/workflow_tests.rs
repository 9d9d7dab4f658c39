//! Pipeline service tests against the in-memory and fault-injecting stores

use crm_core::{
    mirrors, ActivityType, AddEnquiry, AgentChange, AgingSeverity, CloseLead, CloseOutcome,
    EnquiryId, LeadId, NextTask, PropertyChange, ReopenLead, Reschedule, ScheduledEvent,
    StateMachineError, TaskId, TaskState, TaskSuccess, TransitionError, ValidationError,
};
use crm_store::{Collection, DocumentStore, InMemoryStore, StoreError};
use crm_test_utils::{
    actor, advance_hours, clock, enquiry, lead, new_lead, task, FaultInjectingStore, Operation,
    Seed, HOUR, T0,
};
use crm_workflow::prelude::*;
use crm_workflow::CommitStep;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

async fn seeded(seed: Seed) -> (Pipeline, Arc<crm_core::ManualClock>) {
    let store = Arc::new(InMemoryStore::new());
    seed.write(store.as_ref()).await.unwrap();
    let clock = clock();
    let pipeline = Pipeline::with_clock(store, PipelineConfig::default(), clock.clone());
    (pipeline, clock)
}

async fn faulty(seed: Seed) -> (Pipeline, Arc<FaultInjectingStore>) {
    let store = Arc::new(FaultInjectingStore::new());
    seed.write(store.as_ref()).await.unwrap();
    let pipeline = Pipeline::with_clock(store.clone(), PipelineConfig::default(), clock());
    (pipeline, store)
}

fn lead01() -> LeadId {
    LeadId::new("lead01")
}

fn enq(id: &str) -> EnquiryId {
    EnquiryId::new(id)
}

fn close(outcome: CloseOutcome) -> Command {
    Command::new(
        actor(),
        PipelineEvent::LeadClosed(CloseLead {
            outcome,
            note: None,
        }),
    )
}

fn change_agent(agent: &str) -> Command {
    Command::new(
        actor(),
        PipelineEvent::AgentChanged(AgentChange {
            agent: agent.into(),
            note: None,
        }),
    )
}

fn with_fanout_tasks(seed: Seed) -> Seed {
    let mut done = task(4, TaskType::SiteVisit, Some(T0 - 5 * HOUR));
    done.status = TaskStatus::Complete;
    done.completion_date = Some(T0 - 4 * HOUR);
    seed.with_task(task(2, TaskType::SiteVisit, Some(T0 + 2 * HOUR)))
        .with_task(task(3, TaskType::EoiCollection, Some(T0 + 3 * HOUR)))
        .with_task(done)
}

// ============================================================================
// Lead registration
// ============================================================================

#[tokio::test]
async fn create_lead_starts_fresh() {
    let (pipeline, _) = seeded(Seed::default()).await;
    let lead = pipeline
        .create_lead(new_lead("Ravi Kumar", "98450 12345").with_email("ravi@example.com"))
        .await
        .unwrap();

    assert_eq!(lead.lead_id, lead01());
    assert_eq!(lead.state, LeadState::Fresh);
    assert_eq!(lead.phone_number, "9845012345");
    assert_eq!(lead.added, T0);
    assert_eq!(pipeline.lead(&lead01()).await.unwrap(), Some(lead));
    assert!(pipeline.active_enquiry(&lead01()).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_phone_rejected_after_normalizing() {
    let (pipeline, _) = seeded(Seed::default()).await;
    pipeline
        .create_lead(new_lead("Priya Sharma", "+91 98765 43210"))
        .await
        .unwrap();

    let err = pipeline
        .create_lead(new_lead("P. Sharma", "+91-98765-43210"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Transition(TransitionError::Validation(ValidationError::DuplicatePhone {
            ref existing,
            ..
        })) if *existing == lead01()
    ));
    assert!(err.requires_user_action());
}

#[tokio::test]
async fn malformed_contact_rejected() {
    let (pipeline, _) = seeded(Seed::default()).await;
    let err = pipeline
        .create_lead(new_lead("Ravi", "12-34"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Transition(TransitionError::Validation(ValidationError::InvalidPhone(_)))
    ));
}

// ============================================================================
// Transitions
// ============================================================================

#[tokio::test]
async fn add_enquiry_opens_fresh_lead() {
    let (pipeline, _) = seeded(Seed::default()).await;
    let lead = pipeline
        .create_lead(new_lead("Ravi Kumar", "9845012345"))
        .await
        .unwrap();

    let command = Command::new(
        actor(),
        PipelineEvent::EnquiryAdded(AddEnquiry {
            property_name: "Palm Grove".into(),
            agent: "agent002|Vikram Singh".into(),
            next_task: Some(NextTask::new(TaskType::InitialContact).at(T0 + HOUR)),
            ..AddEnquiry::default()
        }),
    );
    let outcome = pipeline
        .execute(&ContextRef::lead(lead.lead_id.clone()), command)
        .await
        .unwrap();

    let created = outcome.created_enquiry.clone().unwrap();
    let new_task = outcome.created_task.clone().unwrap();
    assert_eq!(created.enquiry_id, enq("enq001"));
    assert_eq!(new_task.task_id, TaskId::new("task1"));
    assert_eq!(new_task.enquiry_id, created.enquiry_id);

    let stored = pipeline.lead(&lead.lead_id).await.unwrap().unwrap();
    assert_eq!(stored.state, LeadState::Open);
    assert_eq!(stored.agent_id.as_deref(), Some("agent002"));
    assert_eq!(stored.property_name.as_deref(), Some("Palm Grove"));
    assert_eq!(stored.task_type, Some(TaskType::InitialContact));
    assert_eq!(stored.scheduled_date, Some(T0 + HOUR));
    assert_eq!(stored, outcome.lead);

    let tasks = pipeline.tasks_of(&created.enquiry_id).await.unwrap();
    assert_eq!(tasks, vec![new_task]);

    let history = pipeline.activity_log().history(&created.enquiry_id).await.unwrap();
    let types: Vec<_> = history.iter().map(|i| i.activity_type).collect();
    assert_eq!(types, [ActivityType::NewEnquiry, ActivityType::TaskCreated]);
    assert!(history.iter().all(|i| i.key.is_some()));
}

#[tokio::test]
async fn task_success_commits_every_record() {
    let (pipeline, _) = seeded(Seed::standard()).await;
    let command = Command::new(
        actor(),
        PipelineEvent::TaskSucceeded(TaskSuccess {
            task_state: Some(TaskState::Connected),
            tag: Some(Tag::Hot),
            note: Some("Wants a sea-facing unit".into()),
            next_task: Some(NextTask::new(TaskType::SiteVisit).at(T0 + 24 * HOUR)),
            ..TaskSuccess::default()
        }),
    );
    let outcome = pipeline
        .execute(&ContextRef::lead(lead01()).with_task("task1"), command)
        .await
        .unwrap();
    assert!(!outcome.noop);
    assert_eq!(outcome.appended, 3);

    let done = pipeline.task(&TaskId::new("task1")).await.unwrap().unwrap();
    assert_eq!(done.status, TaskStatus::Complete);
    assert_eq!(done.completion_date, Some(T0));
    assert_eq!(done.stage, Some(Stage::InitialContacted));

    let follow_up = pipeline.task(&TaskId::new("task2")).await.unwrap().unwrap();
    assert!(follow_up.is_open());
    assert_eq!(follow_up.enquiry_id, enq("enq001"));

    let enquiry = pipeline.enquiry(&enq("enq001")).await.unwrap().unwrap();
    assert_eq!(enquiry.stage, Some(Stage::InitialContacted));
    assert_eq!(enquiry.tag, Some(Tag::Hot));
    assert_eq!(enquiry.last_modified, Some(T0));

    let stored = pipeline.lead(&lead01()).await.unwrap().unwrap();
    assert!(mirrors(&stored, &enquiry));
    assert_eq!(stored.task_type, Some(TaskType::SiteVisit));
    assert_eq!(stored.scheduled_date, Some(T0 + 24 * HOUR));
    assert_eq!(stored.last_modified, Some(T0));
    assert_eq!(stored, outcome.lead);

    let log = pipeline.activity_log();
    assert_eq!(log.by_type(&enq("enq001"), ActivityType::TaskExecution).await.unwrap().len(), 1);
    assert_eq!(log.by_type(&enq("enq001"), ActivityType::TaskCreated).await.unwrap().len(), 1);
    assert_eq!(log.notes(&enq("enq001")).await.unwrap().len(), 1);
}

#[tokio::test]
async fn change_property_opens_second_enquiry() {
    let (pipeline, clock) = seeded(Seed::standard()).await;
    clock.advance(60);

    let command = Command::new(
        actor(),
        PipelineEvent::PropertyChanged(PropertyChange {
            property_name: "Ocean View Apartment".into(),
            reason: "other".into(),
            ..PropertyChange::default()
        }),
    );
    let outcome = pipeline
        .execute(&ContextRef::lead(lead01()).with_task("task1"), command)
        .await
        .unwrap();

    let old = pipeline.enquiry(&enq("enq001")).await.unwrap().unwrap();
    assert_eq!(old.state, EnquiryState::Open);
    assert_eq!(old.lead_status.as_deref(), Some("Property Changed"));
    assert_eq!(old.stage, None);

    let new = pipeline.enquiry(&enq("enq002")).await.unwrap().unwrap();
    assert_eq!(outcome.created_enquiry.as_ref(), Some(&new));
    assert_eq!(new.property_name, "Ocean View Apartment");
    assert_eq!(new.lead_status.as_deref(), Some("interested"));
    assert_eq!(new.state, EnquiryState::Open);
    assert_eq!(new.agent_id, "agent001");

    let stored = pipeline.lead(&lead01()).await.unwrap().unwrap();
    assert!(mirrors(&stored, &new));
    assert_eq!(stored.property_name.as_deref(), Some("Ocean View Apartment"));
    assert_eq!(stored.stage, None);

    assert_eq!(
        pipeline.active_enquiry(&lead01()).await.unwrap().map(|e| e.enquiry_id),
        Some(enq("enq002"))
    );
    let origin = pipeline.task(&TaskId::new("task1")).await.unwrap().unwrap();
    assert_eq!(origin.status, TaskStatus::Complete);
    assert_eq!(
        pipeline
            .activity_log()
            .by_type(&enq("enq001"), ActivityType::PropertyChange)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn agent_change_retargets_open_tasks_only() {
    let (pipeline, _) = seeded(with_fanout_tasks(Seed::standard())).await;
    let outcome = pipeline
        .execute(&ContextRef::lead(lead01()), change_agent("agent005|Rahul Mehta"))
        .await
        .unwrap();

    let mut retargeted: Vec<_> = outcome.retargeted.iter().map(TaskId::as_str).collect();
    retargeted.sort_unstable();
    assert_eq!(retargeted, ["task1", "task2", "task3"]);

    for task in pipeline.tasks_of(&enq("enq001")).await.unwrap() {
        let expected = if task.is_open() { "agent005" } else { "agent001" };
        assert_eq!(task.agent_id, expected, "{}", task.task_id);
    }

    let enquiry = pipeline.enquiry(&enq("enq001")).await.unwrap().unwrap();
    assert_eq!(enquiry.agent_history.len(), 2);
    assert_eq!(enquiry.agent_name, "Rahul Mehta");
    let stored = pipeline.lead(&lead01()).await.unwrap().unwrap();
    assert_eq!(stored.agent_id.as_deref(), Some("agent005"));
    assert_eq!(stored.agent_name.as_deref(), Some("Rahul Mehta"));
}

#[tokio::test]
async fn reschedule_moves_the_lead_schedule() {
    let (pipeline, _) = seeded(Seed::standard()).await;
    let command = Command::new(
        actor(),
        PipelineEvent::Rescheduled(Reschedule {
            task_state: Some(TaskState::NotConnected),
            event: ScheduledEvent::Call,
            event_name: None,
            scheduled_date: T0 + 2 * HOUR,
            note: None,
        }),
    );
    pipeline
        .execute(&ContextRef::lead(lead01()).with_task("task1"), command)
        .await
        .unwrap();

    let moved = pipeline.task(&TaskId::new("task1")).await.unwrap().unwrap();
    assert!(moved.is_open());
    assert_eq!(moved.scheduled_date, Some(T0 + 2 * HOUR));
    assert_eq!(moved.event_name.as_deref(), Some("call scheduled"));

    let stored = pipeline.lead(&lead01()).await.unwrap().unwrap();
    assert_eq!(stored.scheduled_date, Some(T0 + 2 * HOUR));
    assert_eq!(stored.lead_status.as_deref(), Some("follow up"));
    assert_eq!(stored.stage, Some(Stage::LeadRegistered));
    assert!(stored.rnr);
    assert_eq!(stored.rnr_count, 1);
}

#[tokio::test]
async fn closing_twice_is_a_noop() {
    let (pipeline, clock) = seeded(Seed::standard()).await;
    let target = ContextRef::lead(lead01());

    let first = pipeline.execute(&target, close(CloseOutcome::Closed)).await.unwrap();
    assert!(!first.noop);

    clock.advance(300);
    let second = pipeline.execute(&target, close(CloseOutcome::Closed)).await.unwrap();
    assert!(second.noop);

    let stored = pipeline.lead(&lead01()).await.unwrap().unwrap();
    assert_eq!(stored.state, LeadState::Closed);
    assert_eq!(stored.last_modified, Some(T0));
    assert_eq!(
        pipeline
            .activity_log()
            .by_type(&enq("enq001"), ActivityType::StatusUpdate)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn close_then_reopen_restores_enquiry_values() {
    let (pipeline, clock) = seeded(Seed::standard()).await;
    let target = ContextRef::lead(lead01());
    pipeline.execute(&target, close(CloseOutcome::Dropped)).await.unwrap();
    assert_eq!(
        pipeline.lead(&lead01()).await.unwrap().unwrap().state,
        LeadState::Dropped
    );

    advance_hours(&clock, 1);
    let reopen = Command::new(
        actor(),
        PipelineEvent::LeadReopened(ReopenLead {
            reason: "called back".into(),
        }),
    );
    pipeline.execute(&target, reopen).await.unwrap();

    let enquiry = pipeline.enquiry(&enq("enq001")).await.unwrap().unwrap();
    let stored = pipeline.lead(&lead01()).await.unwrap().unwrap();
    assert_eq!(enquiry.state, EnquiryState::Open);
    assert_eq!(stored.state, LeadState::Open);
    assert!(mirrors(&stored, &enquiry));
    assert_eq!(stored.task_type, Some(TaskType::InitialContact));
    assert_eq!(stored.scheduled_date, Some(T0 + HOUR));
}

#[tokio::test]
async fn rejected_transition_writes_nothing() {
    let (pipeline, _) = seeded(Seed::standard()).await;
    let reopen = Command::new(
        actor(),
        PipelineEvent::LeadReopened(ReopenLead {
            reason: "called back".into(),
        }),
    );
    let err = pipeline
        .execute(&ContextRef::lead(lead01()), reopen)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Transition(TransitionError::StateMachine(
            StateMachineError::NotReopenable(LeadState::Open)
        ))
    ));

    assert_eq!(pipeline.lead(&lead01()).await.unwrap().unwrap(), lead());
    assert_eq!(pipeline.enquiry(&enq("enq001")).await.unwrap().unwrap(), enquiry());
}

#[tokio::test]
async fn missing_context_is_not_found() {
    let (pipeline, _) = seeded(Seed::standard()).await;
    let err = pipeline
        .execute(&ContextRef::lead("lead09"), close(CloseOutcome::Closed))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::NotFound { entity: "lead", .. }));

    let err = pipeline
        .execute(
            &ContextRef::lead(lead01()).with_task("task99"),
            close(CloseOutcome::Closed),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::NotFound { entity: "task", .. }));
}

// ============================================================================
// Partial failures
// ============================================================================

#[tokio::test]
async fn failure_before_any_write_is_a_plain_store_error() {
    let (pipeline, store) = faulty(Seed::standard()).await;
    store.fail_next(Operation::Create, Collection::Enquiries);

    let command = Command::new(
        actor(),
        PipelineEvent::EnquiryAdded(AddEnquiry {
            property_name: "Palm Grove".into(),
            agent: "agent001|Asha Rao".into(),
            ..AddEnquiry::default()
        }),
    );
    let err = pipeline
        .execute(&ContextRef::lead(lead01()), command)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Store(StoreError::Backend(_))));
    assert!(err.is_retryable());
    assert_eq!(store.inner().len(Collection::Enquiries), 1);
}

#[tokio::test]
async fn failed_lead_write_reports_applied_steps_and_retry_is_idempotent() {
    let (pipeline, store) = faulty(Seed::standard()).await;
    store.fail_next(Operation::Update, Collection::Leads);

    let command = close(CloseOutcome::Closed);
    let key = command.key;
    let err = pipeline
        .execute(&ContextRef::lead(lead01()), command)
        .await
        .unwrap_err();
    match &err {
        WorkflowError::PartialWriteFailure {
            action,
            applied,
            failed,
            ..
        } => {
            assert_eq!(*action, Action::CloseLead);
            assert_eq!(
                applied,
                &vec![
                    CommitStep::UpdateEnquiry(enq("enq001")),
                    CommitStep::AppendLog(enq("enq001")),
                ]
            );
            assert_eq!(failed, &vec![CommitStep::UpdateLead(lead01())]);
        }
        other => panic!("expected partial failure, got {other}"),
    }

    let retry = close(CloseOutcome::Closed).with_key(key);
    let outcome = pipeline
        .execute(&ContextRef::lead(lead01()), retry)
        .await
        .unwrap();
    assert_eq!(outcome.appended, 0);
    assert_eq!(outcome.lead.state, LeadState::Closed);
    assert_eq!(
        pipeline
            .activity_log()
            .by_type(&enq("enq001"), ActivityType::StatusUpdate)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn fanout_attempts_every_task() {
    let (pipeline, store) = faulty(with_fanout_tasks(Seed::standard())).await;
    store.fail_on(Operation::Update, Collection::Tasks, "task2");

    let err = pipeline
        .execute(&ContextRef::lead(lead01()), change_agent("agent005|Rahul Mehta"))
        .await
        .unwrap_err();
    let WorkflowError::PartialWriteFailure { applied, failed, .. } = &err else {
        panic!("expected partial failure, got {err}");
    };
    assert_eq!(failed, &vec![CommitStep::RetargetTask(TaskId::new("task2"))]);
    assert!(applied.contains(&CommitStep::RetargetTask(TaskId::new("task1"))));
    assert!(applied.contains(&CommitStep::RetargetTask(TaskId::new("task3"))));

    store.clear();
    let agents: Vec<_> = pipeline
        .tasks_of(&enq("enq001"))
        .await
        .unwrap()
        .into_iter()
        .map(|t| (t.task_id.0, t.agent_id))
        .collect();
    assert_eq!(
        agents,
        [
            ("task1".to_string(), "agent005".to_string()),
            ("task2".to_string(), "agent001".to_string()),
            ("task3".to_string(), "agent005".to_string()),
            ("task4".to_string(), "agent001".to_string()),
        ]
    );
}

// ============================================================================
// Bulk junk
// ============================================================================

#[tokio::test]
async fn bulk_junk_collects_per_lead_results() {
    let mut touched = enquiry();
    touched.last_modified = Some(T0 - HOUR);
    let mut newer = enquiry();
    newer.enquiry_id = enq("enq002");
    newer.property_name = "Palm Grove".into();
    newer.added = T0 - 5 * HOUR;
    newer.last_modified = Some(T0 - 5 * HOUR);

    let mut junk = lead();
    junk.lead_id = LeadId::new("lead03");
    junk.phone_number = "+919800000003".into();
    junk.state = LeadState::Junk;

    let seed = Seed {
        leads: vec![lead(), junk],
        enquiries: vec![touched, newer],
        tasks: Vec::new(),
    };
    let (pipeline, _) = seeded(seed).await;
    let fresh = pipeline
        .create_lead(new_lead("Ravi Kumar", "9845012345"))
        .await
        .unwrap();
    assert_eq!(fresh.lead_id, LeadId::new("lead04"));

    let ids = [lead01(), fresh.lead_id.clone(), LeadId::new("lead03"), LeadId::new("lead09")];
    let report = pipeline.junk_leads(&ids, &actor(), Some("spam")).await;

    assert_eq!(report.junked, vec![lead01(), fresh.lead_id.clone()]);
    assert_eq!(report.skipped, vec![LeadId::new("lead03")]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, LeadId::new("lead09"));
    assert!(!report.is_complete());
    assert_eq!(report.total(), 4);

    // the most recently modified enquiry is junked, not the newest one
    let junked = pipeline.enquiry(&enq("enq001")).await.unwrap().unwrap();
    let untouched = pipeline.enquiry(&enq("enq002")).await.unwrap().unwrap();
    assert_eq!(junked.state, EnquiryState::Junk);
    assert_eq!(untouched.state, EnquiryState::Open);

    let l1 = pipeline.lead(&lead01()).await.unwrap().unwrap();
    assert_eq!(l1.state, LeadState::Junk);
    assert_eq!(l1.lead_status.as_deref(), Some("junk"));
    let l4 = pipeline.lead(&fresh.lead_id).await.unwrap().unwrap();
    assert_eq!(l4.state, LeadState::Junk);
}

#[tokio::test]
async fn junk_lead_blocks_further_actions() {
    let (pipeline, _) = seeded(Seed::standard()).await;
    pipeline.junk_lead(&lead01(), actor(), None).await.unwrap();

    let err = pipeline
        .execute(&ContextRef::lead(lead01()), change_agent("agent005|Rahul Mehta"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Transition(TransitionError::StateMachine(
            StateMachineError::IllegalTransition { .. }
        ))
    ));
}

// ============================================================================
// Reads
// ============================================================================

#[tokio::test]
async fn aslc_uses_later_of_schedule_and_last_contact() {
    let mut contacted = lead();
    contacted.last_modified = Some(T0);
    let seed = Seed {
        leads: vec![contacted],
        enquiries: vec![enquiry()],
        tasks: vec![task(1, TaskType::InitialContact, Some(T0 - HOUR))],
    };
    let (pipeline, clock) = seeded(seed).await;
    advance_hours(&clock, 2);

    let aslc = pipeline.lead_aslc(&lead01()).await.unwrap().unwrap();
    assert_eq!(aslc.label, "2 hrs");
    assert_eq!(aslc.severity, AgingSeverity::Fresh);
}

#[tokio::test]
async fn aslc_without_tasks_counts_days() {
    let mut contacted = lead();
    contacted.last_modified = Some(T0);
    let seed = Seed {
        leads: vec![contacted],
        enquiries: vec![enquiry()],
        tasks: Vec::new(),
    };
    let (pipeline, clock) = seeded(seed).await;
    clock.advance(90_000);

    let aslc = pipeline.lead_aslc(&lead01()).await.unwrap().unwrap();
    assert_eq!(aslc.label, "1 days : 1 hrs");
    assert_eq!(aslc.severity, AgingSeverity::Critical);
}

#[tokio::test]
async fn history_subscribers_see_committed_entries() {
    let (pipeline, _) = seeded(Seed::standard()).await;
    let seen = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&seen);
    let _subscription = pipeline
        .activity_log()
        .subscribe(&enq("enq001"), move |history| sink.store(history.len(), Ordering::SeqCst));

    pipeline
        .execute(
            &ContextRef::lead(lead01()).with_task("task1"),
            Command::new(
                actor(),
                PipelineEvent::TaskSucceeded(TaskSuccess {
                    task_state: Some(TaskState::Connected),
                    ..TaskSuccess::default()
                }),
            ),
        )
        .await
        .unwrap();

    let history = pipeline.activity_log().history(&enq("enq001")).await.unwrap();
    assert!(!history.is_empty());
    assert_eq!(seen.load(Ordering::SeqCst), history.len());
}

#[tokio::test]
async fn seeding_advances_counters() {
    let store = InMemoryStore::new();
    Seed::standard().write(&store).await.unwrap();
    assert_eq!(store.counter("leads"), 1);
    assert_eq!(store.counter("enquiries"), 1);
    assert_eq!(store.increment_counter("tasks").await.unwrap(), 2);
}
