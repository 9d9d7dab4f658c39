//! Lead pipeline simulator
//!
//! Drives seeded random user actions through [`Pipeline`] over an in-memory
//! store. Each outcome is compared with a model of the pipeline rules, and
//! the store invariants are checked after every step.

use crate::invariants::{InvariantViolation, PipelineInvariants, Snapshot};
use crm_core::state_machine::{is_reopenable, validate_transition};
use crm_core::validation::normalize_phone;
use crm_core::{
    Actor, AddEnquiry, AgentChange, AgentRef, CloseLead, CloseOutcome, Command, Enquiry, JunkLead,
    Lead, LeadId, LeadState, ManualClock, NewLead, NextTask, PipelineEvent, PropertyChange,
    ReopenLead, RequirementCollected, Reschedule, ScheduledEvent, Tag, Task, TaskCloseLead,
    TaskId, TaskState, TaskSuccess, TaskType,
};
use crm_store::{DocumentStore, IdGenerator, InMemoryStore, Repository};
use crm_workflow::{ContextRef, Pipeline, PipelineConfig, WorkflowError};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

const HOUR: i64 = 3_600;

/// Simulated time at the first operation
pub const SIM_EPOCH: i64 = 1_700_000_000;

const AGENTS: [(&str, &str); 4] = [
    ("agent001", "Asha Rao"),
    ("agent002", "Ravi Kumar"),
    ("agent003", "Meera Iyer"),
    ("agent005", "Rahul Mehta"),
];

const PROPERTIES: [&str; 5] = [
    "Sunset Villa",
    "Ocean View Apartment",
    "Palm Grove",
    "Lakeside Towers",
    "Green Meadows",
];

const NAMES: [&str; 6] = [
    "Priya Sharma",
    "Arjun Nair",
    "Kavya Reddy",
    "Vikram Singh",
    "Neha Gupta",
    "Rohan Das",
];

/// Simulator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Total operations to execute
    pub total_operations: u64,
    /// Distribution of operation types
    pub operation_distribution: OperationDistribution,
    /// Most the clock moves between two operations, in seconds
    pub max_step_secs: i64,
    /// Stop conditions
    pub stop_on_first_violation: bool,
    pub stop_on_error_count: Option<usize>,
    /// Service configuration under test
    pub pipeline: PipelineConfig,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            total_operations: 1_000,
            operation_distribution: OperationDistribution::default(),
            max_step_secs: 4 * HOUR,
            stop_on_first_violation: true,
            stop_on_error_count: None,
            pipeline: PipelineConfig::default(),
        }
    }
}

impl SimulatorConfig {
    /// Parse a TOML simulator configuration; missing fields take defaults
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}

/// Probability distribution for operation generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationDistribution {
    /// Actions that fit the target lead's state
    pub valid_ops: f64,
    /// No-ops, repeats and boundary dates
    pub edge_cases: f64,
    /// Actions that should be rejected
    pub invalid_ops: f64,
}

impl Default for OperationDistribution {
    fn default() -> Self {
        Self {
            valid_ops: 0.70,
            edge_cases: 0.20,
            invalid_ops: 0.10,
        }
    }
}

/// All operations the simulator can generate
#[derive(Debug, Clone, PartialEq)]
pub enum SimulatedOperation {
    // Registration
    CreateLead {
        name: String,
        phone: String,
    },
    AddEnquiry {
        lead: LeadId,
        property: String,
        agent: String,
        next_task: Option<NextTask>,
    },

    // Task outcomes
    TaskSuccess {
        lead: LeadId,
        task: TaskId,
        next_task: Option<NextTask>,
    },
    TaskCloseLead {
        lead: LeadId,
        task: TaskId,
        task_state: Option<TaskState>,
    },
    RequirementCollected {
        lead: LeadId,
        task: TaskId,
        task_state: Option<TaskState>,
        tag: Tag,
    },
    Reschedule {
        lead: LeadId,
        task: TaskId,
        event: ScheduledEvent,
        scheduled_date: i64,
    },

    // Enquiry edits
    ChangeProperty {
        lead: LeadId,
        property: String,
        next_task: Option<NextTask>,
    },
    ChangeAgent {
        lead: LeadId,
        agent: String,
    },

    // Lead status
    CloseLead {
        lead: LeadId,
        outcome: CloseOutcome,
    },
    ReopenLead {
        lead: LeadId,
        reason: String,
    },
    Junk {
        lead: LeadId,
    },

    // Reads
    QueryAslc(LeadId),
}

impl SimulatedOperation {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            SimulatedOperation::CreateLead { .. } => "CreateLead",
            SimulatedOperation::AddEnquiry { .. } => "AddEnquiry",
            SimulatedOperation::TaskSuccess { .. } => "TaskSuccess",
            SimulatedOperation::TaskCloseLead { .. } => "TaskCloseLead",
            SimulatedOperation::RequirementCollected { .. } => "RequirementCollected",
            SimulatedOperation::Reschedule { .. } => "Reschedule",
            SimulatedOperation::ChangeProperty { .. } => "ChangeProperty",
            SimulatedOperation::ChangeAgent { .. } => "ChangeAgent",
            SimulatedOperation::CloseLead { .. } => "CloseLead",
            SimulatedOperation::ReopenLead { .. } => "ReopenLead",
            SimulatedOperation::Junk { .. } => "Junk",
            SimulatedOperation::QueryAslc(_) => "QueryAslc",
        }
    }

    /// Lead the operation targets; `None` only for registration
    #[must_use]
    pub fn lead_id(&self) -> Option<&LeadId> {
        match self {
            SimulatedOperation::CreateLead { .. } => None,
            SimulatedOperation::AddEnquiry { lead, .. }
            | SimulatedOperation::TaskSuccess { lead, .. }
            | SimulatedOperation::TaskCloseLead { lead, .. }
            | SimulatedOperation::RequirementCollected { lead, .. }
            | SimulatedOperation::Reschedule { lead, .. }
            | SimulatedOperation::ChangeProperty { lead, .. }
            | SimulatedOperation::ChangeAgent { lead, .. }
            | SimulatedOperation::CloseLead { lead, .. }
            | SimulatedOperation::ReopenLead { lead, .. }
            | SimulatedOperation::Junk { lead }
            | SimulatedOperation::QueryAslc(lead) => Some(lead),
        }
    }
}

/// Expected result classification for an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedResult {
    ShouldSucceed,
    ShouldFail,
}

/// A violation detected during simulation
#[derive(Debug, Clone)]
pub enum Violation {
    /// Operation outcome didn't match expectation
    UnexpectedOutcome {
        operation_index: u64,
        operation: SimulatedOperation,
        expected: ExpectedResult,
        actual: Result<String, String>,
    },
    /// Invariant was violated
    Invariant(InvariantViolation),
    /// The store could not be read back
    StoreUnreadable { operation_index: u64, details: String },
}

/// Statistics collected during simulation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationStats {
    pub total_operations: u64,
    pub successful_operations: u64,
    pub failed_operations: u64,
    pub invariant_violations: u64,
    pub operations_by_type: HashMap<String, u64>,
}

impl OperationStats {
    pub fn record(&mut self, operation: &SimulatedOperation, result: &Result<String, String>) {
        self.total_operations += 1;
        *self
            .operations_by_type
            .entry(operation.name().to_string())
            .or_insert(0) += 1;

        match result {
            Ok(_) => self.successful_operations += 1,
            Err(_) => self.failed_operations += 1,
        }
    }
}

/// Final report from the simulator
#[derive(Debug, Clone)]
pub struct SimulatorReport {
    pub config: SimulatorConfig,
    pub stats: OperationStats,
    pub violations: Vec<Violation>,
    pub final_lead_count: usize,
    pub final_enquiry_count: usize,
    pub final_task_count: usize,
}

impl SimulatorReport {
    /// Check if simulation passed all criteria
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Generate a text report
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Lead Pipeline Simulator Report ===\n\n");
        report.push_str(&format!("Seed: {}\n", self.config.seed));
        report.push_str(&format!("Total Operations: {}\n", self.stats.total_operations));
        report.push_str(&format!("Successful: {}\n", self.stats.successful_operations));
        report.push_str(&format!("Rejected: {}\n", self.stats.failed_operations));
        report.push_str(&format!("Violations: {}\n", self.violations.len()));
        report.push_str(&format!("Final Leads: {}\n", self.final_lead_count));
        report.push_str(&format!("Final Enquiries: {}\n", self.final_enquiry_count));
        report.push_str(&format!("Final Tasks: {}\n", self.final_task_count));

        let mut by_type: Vec<_> = self.stats.operations_by_type.iter().collect();
        by_type.sort();
        report.push_str("\n=== Operations ===\n");
        for (name, count) in by_type {
            report.push_str(&format!("{name}: {count}\n"));
        }

        if !self.violations.is_empty() {
            report.push_str("\n=== Violations ===\n");
            for (i, v) in self.violations.iter().enumerate() {
                report.push_str(&format!("{}. {:?}\n", i + 1, v));
            }
        }

        report.push_str(&format!(
            "\n=== Result: {} ===\n",
            if self.passed() { "PASS" } else { "FAIL" }
        ));

        report
    }
}

fn should_stop(config: &SimulatorConfig, violations: &[Violation]) -> bool {
    if violations.is_empty() {
        return false;
    }
    config.stop_on_first_violation
        || config
            .stop_on_error_count
            .is_some_and(|max| violations.len() >= max)
}

/// Run the simulator
pub async fn run_simulator(config: SimulatorConfig) -> SimulatorReport {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(ManualClock::new(SIM_EPOCH));
    let shared: Arc<dyn DocumentStore> = store.clone();
    let pipeline = Pipeline::with_clock(Arc::clone(&shared), config.pipeline.clone(), clock.clone());

    let ids = IdGenerator::new(Arc::clone(&shared));
    let leads: Repository<Lead> = Repository::new(Arc::clone(&shared), ids.clone(), clock.clone());
    let enquiries: Repository<Enquiry> =
        Repository::new(Arc::clone(&shared), ids.clone(), clock.clone());
    let tasks: Repository<Task> = Repository::new(shared, ids, clock.clone());

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut stats = OperationStats::default();
    let mut violations = Vec::new();
    let mut world = Snapshot::default();

    tracing::info!(
        seed = config.seed,
        operations = config.total_operations,
        "simulation started"
    );

    for i in 0..config.total_operations {
        let now = clock.advance(rng.gen_range(60..=config.max_step_secs.max(60)));

        // Generate operation based on distribution
        let operation = generate_operation(&mut rng, &config.operation_distribution, &world, now);
        let expected = classify_expected_result(&operation, &world, now);

        let actual: Result<String, String> = execute_operation(&pipeline, &operation)
            .await
            .map_err(|e| e.to_string());
        stats.record(&operation, &actual);

        let outcome_matches = matches!(
            (expected, &actual),
            (ExpectedResult::ShouldSucceed, Ok(_)) | (ExpectedResult::ShouldFail, Err(_))
        );
        if !outcome_matches {
            tracing::warn!(
                index = i,
                operation = operation.name(),
                ?expected,
                ?actual,
                "unexpected outcome"
            );
            violations.push(Violation::UnexpectedOutcome {
                operation_index: i,
                operation,
                expected,
                actual,
            });
        }

        let after = match Snapshot::load(&leads, &enquiries, &tasks).await {
            Ok(after) => after,
            Err(e) => {
                violations.push(Violation::StoreUnreadable {
                    operation_index: i,
                    details: e.to_string(),
                });
                break;
            }
        };

        // Check all invariants after every operation
        if let Err(found) = PipelineInvariants::check_all(&world, &after, &store) {
            for v in &found {
                tracing::warn!(index = i, check = ?v.check, details = %v.details, "invariant violated");
            }
            stats.invariant_violations += found.len() as u64;
            violations.extend(found.into_iter().map(Violation::Invariant));
        }
        world = after;

        if should_stop(&config, &violations) {
            break;
        }
    }

    tracing::info!(
        total = stats.total_operations,
        rejected = stats.failed_operations,
        violations = violations.len(),
        "simulation finished"
    );

    SimulatorReport {
        config,
        stats,
        violations,
        final_lead_count: world.leads.len(),
        final_enquiry_count: world.enquiries.len(),
        final_task_count: world.tasks.len(),
    }
}

fn pick<'a, T>(rng: &mut StdRng, items: &'a [T]) -> &'a T {
    &items[rng.gen_range(0..items.len())]
}

fn agent_ref(rng: &mut StdRng) -> String {
    let (id, name) = *pick(rng, &AGENTS);
    format!("{id}|{name}")
}

/// An agent other than `current`
fn other_agent(rng: &mut StdRng, current: &str) -> String {
    let others: Vec<_> = AGENTS.iter().filter(|(id, _)| *id != current).collect();
    let (id, name) = **pick(rng, &others);
    format!("{id}|{name}")
}

fn other_property(rng: &mut StdRng, current: &str) -> String {
    let others: Vec<_> = PROPERTIES.iter().filter(|p| **p != current).collect();
    (**pick(rng, &others)).to_string()
}

fn follow_up(rng: &mut StdRng, now: i64) -> NextTask {
    let task_type = *pick(
        rng,
        &[TaskType::InitialContact, TaskType::SiteVisit, TaskType::Booking],
    );
    NextTask::new(task_type).at(now + rng.gen_range(1..=72) * HOUR)
}

fn create_lead(rng: &mut StdRng) -> SimulatedOperation {
    SimulatedOperation::CreateLead {
        name: (*pick(rng, &NAMES)).to_string(),
        phone: format!("+91 9{:09}", rng.gen_range(0..1_000_000_000u64)),
    }
}

fn add_enquiry(rng: &mut StdRng, lead: LeadId, now: i64) -> SimulatedOperation {
    SimulatedOperation::AddEnquiry {
        lead,
        property: (*pick(rng, &PROPERTIES)).to_string(),
        agent: agent_ref(rng),
        next_task: rng.gen_bool(0.8).then(|| follow_up(rng, now)),
    }
}

/// Generate a random operation based on the distribution
fn generate_operation(
    rng: &mut StdRng,
    distribution: &OperationDistribution,
    world: &Snapshot,
    now: i64,
) -> SimulatedOperation {
    let r: f64 = rng.gen();

    if r < distribution.valid_ops {
        generate_valid_operation(rng, world, now)
    } else if r < distribution.valid_ops + distribution.edge_cases {
        generate_edge_case_operation(rng, world, now)
    } else {
        generate_invalid_operation(rng, world, now)
    }
}

/// Generate an action that fits the target lead's current state
fn generate_valid_operation(rng: &mut StdRng, world: &Snapshot, now: i64) -> SimulatedOperation {
    if world.leads.is_empty() || rng.gen_bool(0.15) {
        return create_lead(rng);
    }
    let lead = pick(rng, &world.leads);
    let id = lead.lead_id.clone();

    let Some(enquiry) = world.active_enquiry(&id) else {
        return match lead.state {
            LeadState::Fresh if rng.gen_bool(0.9) => add_enquiry(rng, id, now),
            LeadState::Fresh => SimulatedOperation::Junk { lead: id },
            _ => SimulatedOperation::QueryAslc(id),
        };
    };
    let tasks = world.tasks_of(&enquiry.enquiry_id);
    let open: Vec<&Task> = tasks.iter().copied().filter(|t| t.is_open()).collect();

    match lead.state {
        LeadState::Open => match rng.gen_range(0..10) {
            0..=2 if !open.is_empty() => {
                let task = *pick(rng, &open);
                let next_task = if task.task_type == TaskType::Booking {
                    None
                } else {
                    Some(follow_up(rng, now))
                };
                SimulatedOperation::TaskSuccess {
                    lead: id,
                    task: task.task_id.clone(),
                    next_task,
                }
            }
            3 if !open.is_empty() => SimulatedOperation::RequirementCollected {
                lead: id,
                task: pick(rng, &open).task_id.clone(),
                task_state: *pick(rng, &[None, Some(TaskState::Connected), Some(TaskState::SiteNotVisited)]),
                tag: *pick(rng, &[Tag::Cold, Tag::Potential, Tag::Hot, Tag::SuperHot]),
            },
            4 if !tasks.is_empty() => SimulatedOperation::Reschedule {
                lead: id,
                task: pick(rng, &tasks).task_id.clone(),
                event: *pick(
                    rng,
                    &[
                        ScheduledEvent::Call,
                        ScheduledEvent::SiteVisit,
                        ScheduledEvent::Meeting,
                        ScheduledEvent::FollowUp,
                    ],
                ),
                scheduled_date: now + rng.gen_range(1..=96) * HOUR,
            },
            5 if !open.is_empty() && rng.gen_bool(0.5) => SimulatedOperation::TaskCloseLead {
                lead: id,
                task: pick(rng, &open).task_id.clone(),
                task_state: *pick(rng, &[None, Some(TaskState::Connected), Some(TaskState::NotConnected)]),
            },
            6 => SimulatedOperation::ChangeAgent {
                lead: id,
                agent: other_agent(rng, &enquiry.agent_id),
            },
            7 => SimulatedOperation::CloseLead {
                lead: id,
                outcome: *pick(rng, &[CloseOutcome::Closed, CloseOutcome::Dropped]),
            },
            8 if rng.gen_bool(0.3) => SimulatedOperation::Junk { lead: id },
            8 => add_enquiry(rng, id, now),
            _ => SimulatedOperation::ChangeProperty {
                lead: id,
                property: other_property(rng, &enquiry.property_name),
                next_task: Some(follow_up(rng, now)),
            },
        },
        LeadState::Closed | LeadState::Dropped => match rng.gen_range(0..10) {
            0..=5 => SimulatedOperation::ReopenLead {
                lead: id,
                reason: "customer called back".into(),
            },
            6 | 7 => SimulatedOperation::ChangeAgent {
                lead: id,
                agent: other_agent(rng, &enquiry.agent_id),
            },
            8 => add_enquiry(rng, id, now),
            _ => SimulatedOperation::QueryAslc(id),
        },
        LeadState::Fresh | LeadState::Junk => SimulatedOperation::QueryAslc(id),
    }
}

/// Generate a no-op, repeat or boundary operation
fn generate_edge_case_operation(
    rng: &mut StdRng,
    world: &Snapshot,
    now: i64,
) -> SimulatedOperation {
    if world.leads.is_empty() {
        return create_lead(rng);
    }
    let lead = pick(rng, &world.leads);
    let id = lead.lead_id.clone();
    let active = world.active_enquiry(&id);

    match rng.gen_range(0..7) {
        // duplicate phone
        0 => SimulatedOperation::CreateLead {
            name: (*pick(rng, &NAMES)).to_string(),
            phone: lead.phone_number.clone(),
        },
        // close into the state the lead is already in
        1 => SimulatedOperation::CloseLead {
            lead: id,
            outcome: if lead.state == LeadState::Dropped {
                CloseOutcome::Dropped
            } else {
                CloseOutcome::Closed
            },
        },
        2 => SimulatedOperation::Junk { lead: id },
        3 if active.is_some() => SimulatedOperation::ChangeAgent {
            lead: id,
            agent: active
                .map(|e| format!("{}|{}", e.agent_id, e.agent_name))
                .unwrap_or_default(),
        },
        4 => {
            let done = active.map(|e| {
                world
                    .tasks_of(&e.enquiry_id)
                    .into_iter()
                    .filter(|t| !t.is_open())
                    .collect::<Vec<_>>()
            });
            match done {
                // rescheduling reopens a completed task; now itself is not in the past
                Some(done) if !done.is_empty() => SimulatedOperation::Reschedule {
                    lead: id,
                    task: pick(rng, &done).task_id.clone(),
                    event: ScheduledEvent::Call,
                    scheduled_date: now,
                },
                _ => SimulatedOperation::QueryAslc(id),
            }
        }
        5 if active.is_some() => SimulatedOperation::ChangeProperty {
            lead: id,
            property: active.map(|e| e.property_name.clone()).unwrap_or_default(),
            next_task: None,
        },
        _ => SimulatedOperation::QueryAslc(id),
    }
}

/// Generate an operation that should be rejected
fn generate_invalid_operation(
    rng: &mut StdRng,
    world: &Snapshot,
    now: i64,
) -> SimulatedOperation {
    let malformed = SimulatedOperation::CreateLead {
        name: (*pick(rng, &NAMES)).to_string(),
        phone: "98-76x-5432".into(),
    };
    if world.leads.is_empty() {
        return malformed;
    }
    let lead = pick(rng, &world.leads);
    let id = lead.lead_id.clone();

    match rng.gen_range(0..6) {
        0 => malformed,
        // unknown lead
        1 => SimulatedOperation::TaskSuccess {
            lead: LeadId::from_number(world.leads.len() as u64 + 1_000),
            task: TaskId::from_number(1),
            next_task: None,
        },
        2 if !world.tasks.is_empty() => {
            let task = pick(rng, &world.tasks);
            SimulatedOperation::Reschedule {
                lead: task.lead_id.clone(),
                task: task.task_id.clone(),
                event: ScheduledEvent::Meeting,
                scheduled_date: now - rng.gen_range(1..=48) * HOUR,
            }
        }
        3 => SimulatedOperation::ReopenLead {
            lead: id,
            reason: "  ".into(),
        },
        4 => SimulatedOperation::AddEnquiry {
            lead: id,
            property: (*pick(rng, &PROPERTIES)).to_string(),
            agent: "nobody".into(),
            next_task: None,
        },
        5 if !world.tasks.is_empty() => {
            let task = pick(rng, &world.tasks);
            SimulatedOperation::TaskSuccess {
                lead: task.lead_id.clone(),
                task: task.task_id.clone(),
                next_task: Some(NextTask::new(TaskType::SiteVisit).at(now - HOUR)),
            }
        }
        _ => malformed,
    }
}

/// Decide from the current records whether the pipeline must accept `operation`
fn classify_expected_result(
    operation: &SimulatedOperation,
    world: &Snapshot,
    now: i64,
) -> ExpectedResult {
    if accepted(operation, world, now) {
        ExpectedResult::ShouldSucceed
    } else {
        ExpectedResult::ShouldFail
    }
}

fn accepted(operation: &SimulatedOperation, world: &Snapshot, now: i64) -> bool {
    use SimulatedOperation as Op;

    if let Op::CreateLead { phone, .. } = operation {
        return normalize_phone(phone).is_ok_and(|phone| !world.has_phone(&phone));
    }
    let Some(lead) = operation.lead_id().and_then(|id| world.lead(id)) else {
        return false;
    };
    let state = lead.state;
    let is_open = state == LeadState::Open;
    let active = world.active_enquiry(&lead.lead_id);

    // a task of the enquiry the command resolves to
    let owned = |task_id: &TaskId| -> Option<&Task> {
        let enquiry = active?;
        world
            .task(task_id)
            .filter(|t| t.enquiry_id == enquiry.enquiry_id)
    };
    let not_past = |next: &Option<NextTask>| {
        next.as_ref()
            .and_then(|n| n.scheduled_date)
            .map_or(true, |date| date >= now)
    };

    match operation {
        Op::CreateLead { .. } | Op::QueryAslc(_) => true,
        Op::AddEnquiry {
            property,
            agent,
            next_task,
            ..
        } => {
            state != LeadState::Junk
                && !property.trim().is_empty()
                && agent.parse::<AgentRef>().is_ok()
                && not_past(next_task)
        }
        Op::TaskSuccess {
            task, next_task, ..
        } => {
            is_open
                && owned(task).is_some_and(|t| {
                    t.is_open()
                        && t.task_type != TaskType::EoiCollection
                        && (t.task_type != TaskType::Booking || next_task.is_none())
                })
                && not_past(next_task)
        }
        Op::TaskCloseLead { task, .. } | Op::RequirementCollected { task, .. } => {
            is_open && owned(task).is_some_and(Task::is_open)
        }
        Op::Reschedule {
            task,
            scheduled_date,
            ..
        } => is_open && owned(task).is_some() && *scheduled_date >= now,
        Op::ChangeProperty {
            property,
            next_task,
            ..
        } => {
            let property = property.trim();
            is_open
                && active.is_some_and(|e| {
                    !property.is_empty() && property != e.property_name.trim()
                })
                && not_past(next_task)
        }
        Op::ChangeAgent { agent, .. } => {
            // any write to a junk lead is a junk -> junk move
            state != LeadState::Junk
                && active.is_some_and(|e| {
                    agent
                        .parse::<AgentRef>()
                        .is_ok_and(|agent| agent.id != e.agent_id)
                })
        }
        Op::CloseLead { outcome, .. } => {
            let target = LeadState::from(outcome.state());
            state == target || (active.is_some() && validate_transition(state, target).is_ok())
        }
        Op::ReopenLead { reason, .. } => {
            is_reopenable(state) && !reason.trim().is_empty() && active.is_some()
        }
        Op::Junk { .. } => {
            state == LeadState::Junk || validate_transition(state, LeadState::Junk).is_ok()
        }
    }
}

fn simulator_actor() -> Actor {
    Actor::new("agent000", "Pipeline Simulator")
}

/// Execute an operation against the pipeline
async fn execute_operation(
    pipeline: &Pipeline,
    operation: &SimulatedOperation,
) -> Result<String, WorkflowError> {
    use SimulatedOperation as Op;

    let (target, event) = match operation {
        Op::CreateLead { name, phone } => {
            let lead = pipeline
                .create_lead(NewLead::new(name.as_str(), phone.as_str(), "simulator"))
                .await?;
            return Ok(format!("Created {}", lead.lead_id));
        }
        Op::QueryAslc(lead) => {
            let aslc = pipeline.lead_aslc(lead).await?;
            return Ok(match aslc {
                Some(aslc) => format!("ALSC {} ({:?})", aslc.label, aslc.severity),
                None => "ALSC n/a".to_string(),
            });
        }
        Op::AddEnquiry {
            lead,
            property,
            agent,
            next_task,
        } => (
            ContextRef::lead(lead.clone()),
            PipelineEvent::EnquiryAdded(AddEnquiry {
                property_name: property.clone(),
                agent: agent.clone(),
                next_task: next_task.clone(),
                ..AddEnquiry::default()
            }),
        ),
        Op::TaskSuccess {
            lead,
            task,
            next_task,
        } => (
            ContextRef::lead(lead.clone()).with_task(task.clone()),
            PipelineEvent::TaskSucceeded(TaskSuccess {
                task_state: Some(TaskState::Connected),
                next_task: next_task.clone(),
                ..TaskSuccess::default()
            }),
        ),
        Op::TaskCloseLead {
            lead,
            task,
            task_state,
        } => (
            ContextRef::lead(lead.clone()).with_task(task.clone()),
            PipelineEvent::TaskClosed(TaskCloseLead {
                task_state: *task_state,
                note: Some("not interested any more".into()),
            }),
        ),
        Op::RequirementCollected {
            lead,
            task,
            task_state,
            tag,
        } => (
            ContextRef::lead(lead.clone()).with_task(task.clone()),
            PipelineEvent::RequirementCollected(RequirementCollected {
                task_state: *task_state,
                tag: *tag,
                requirement: None,
                note: None,
                next_task: None,
            }),
        ),
        Op::Reschedule {
            lead,
            task,
            event,
            scheduled_date,
        } => (
            ContextRef::lead(lead.clone()).with_task(task.clone()),
            PipelineEvent::Rescheduled(Reschedule {
                task_state: None,
                event: *event,
                event_name: None,
                scheduled_date: *scheduled_date,
                note: None,
            }),
        ),
        Op::ChangeProperty {
            lead,
            property,
            next_task,
        } => (
            ContextRef::lead(lead.clone()),
            PipelineEvent::PropertyChanged(PropertyChange {
                property_name: property.clone(),
                reason: "other".into(),
                next_task: next_task.clone(),
                ..PropertyChange::default()
            }),
        ),
        Op::ChangeAgent { lead, agent } => (
            ContextRef::lead(lead.clone()),
            PipelineEvent::AgentChanged(AgentChange {
                agent: agent.clone(),
                note: None,
            }),
        ),
        Op::CloseLead { lead, outcome } => (
            ContextRef::lead(lead.clone()),
            PipelineEvent::LeadClosed(CloseLead {
                outcome: *outcome,
                note: None,
            }),
        ),
        Op::ReopenLead { lead, reason } => (
            ContextRef::lead(lead.clone()),
            PipelineEvent::LeadReopened(ReopenLead {
                reason: reason.clone(),
            }),
        ),
        Op::Junk { lead } => (
            ContextRef::lead(lead.clone()),
            PipelineEvent::Junked(JunkLead {
                reason: Some("simulated".into()),
            }),
        ),
    };

    let outcome = pipeline
        .execute(&target, Command::new(simulator_actor(), event))
        .await?;
    Ok(if outcome.noop {
        format!("{} unchanged", outcome.action)
    } else {
        format!("{} -> {}", outcome.action, outcome.lead.state)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm_core::EnquiryState;
    use crm_test_utils::{enquiry, lead, task, T0};
    use pretty_assertions::assert_eq;

    fn world() -> Snapshot {
        Snapshot {
            leads: vec![lead()],
            enquiries: vec![enquiry()],
            tasks: vec![task(1, TaskType::InitialContact, Some(T0 + HOUR))],
        }
    }

    fn closed_world() -> Snapshot {
        let mut world = world();
        world.leads[0].state = LeadState::Closed;
        world.enquiries[0].state = EnquiryState::Closed;
        world
    }

    fn expect(operation: SimulatedOperation, world: &Snapshot) -> ExpectedResult {
        classify_expected_result(&operation, world, T0)
    }

    #[test]
    fn duplicate_and_malformed_phones_are_rejected() {
        let world = world();
        let phone = |phone: &str| SimulatedOperation::CreateLead {
            name: "Arjun Nair".into(),
            phone: phone.into(),
        };
        assert_eq!(expect(phone("+91 98765 43210"), &world), ExpectedResult::ShouldFail);
        assert_eq!(expect(phone("98-76x-5432"), &world), ExpectedResult::ShouldFail);
        assert_eq!(expect(phone("+91 90000 00001"), &world), ExpectedResult::ShouldSucceed);
    }

    #[test]
    fn task_outcomes_need_an_open_lead_and_task() {
        let success = SimulatedOperation::TaskSuccess {
            lead: "lead01".into(),
            task: "task1".into(),
            next_task: None,
        };
        assert_eq!(expect(success.clone(), &world()), ExpectedResult::ShouldSucceed);
        assert_eq!(expect(success, &closed_world()), ExpectedResult::ShouldFail);

        let unknown = SimulatedOperation::TaskSuccess {
            lead: "lead01".into(),
            task: "task9".into(),
            next_task: None,
        };
        assert_eq!(expect(unknown, &world()), ExpectedResult::ShouldFail);
    }

    #[test]
    fn closed_leads_reopen_but_do_not_junk() {
        let world = closed_world();
        let reopen = SimulatedOperation::ReopenLead {
            lead: "lead01".into(),
            reason: "customer called back".into(),
        };
        let junk = SimulatedOperation::Junk { lead: "lead01".into() };
        let drop = SimulatedOperation::CloseLead {
            lead: "lead01".into(),
            outcome: CloseOutcome::Dropped,
        };
        let close_again = SimulatedOperation::CloseLead {
            lead: "lead01".into(),
            outcome: CloseOutcome::Closed,
        };
        assert_eq!(expect(reopen, &world), ExpectedResult::ShouldSucceed);
        assert_eq!(expect(junk, &world), ExpectedResult::ShouldFail);
        assert_eq!(expect(drop, &world), ExpectedResult::ShouldFail);
        assert_eq!(expect(close_again, &world), ExpectedResult::ShouldSucceed);
    }

    #[test]
    fn agent_change_needs_a_different_agent() {
        let world = world();
        let same = SimulatedOperation::ChangeAgent {
            lead: "lead01".into(),
            agent: "agent001|Asha Rao".into(),
        };
        let other = SimulatedOperation::ChangeAgent {
            lead: "lead01".into(),
            agent: "agent005|Rahul Mehta".into(),
        };
        assert_eq!(expect(same, &world), ExpectedResult::ShouldFail);
        assert_eq!(expect(other, &world), ExpectedResult::ShouldSucceed);
    }

    #[test]
    fn reschedule_rejects_past_dates() {
        let world = world();
        let at = |scheduled_date| SimulatedOperation::Reschedule {
            lead: "lead01".into(),
            task: "task1".into(),
            event: ScheduledEvent::Call,
            scheduled_date,
        };
        assert_eq!(expect(at(T0 - 1), &world), ExpectedResult::ShouldFail);
        assert_eq!(expect(at(T0), &world), ExpectedResult::ShouldSucceed);
    }

    #[test]
    fn stop_conditions() {
        let violation = Violation::StoreUnreadable {
            operation_index: 0,
            details: "gone".into(),
        };
        let lenient = SimulatorConfig {
            stop_on_first_violation: false,
            stop_on_error_count: Some(2),
            ..SimulatorConfig::default()
        };
        assert!(!should_stop(&lenient, &[]));
        assert!(!should_stop(&lenient, &[violation.clone()]));
        assert!(should_stop(&lenient, &[violation.clone(), violation.clone()]));
        assert!(should_stop(&SimulatorConfig::default(), &[violation]));
    }

    #[test]
    fn config_reads_partial_toml() {
        let config = SimulatorConfig::from_toml_str(
            "seed = 7\ntotal_operations = 50\n\n[operation_distribution]\ninvalid_ops = 0.3\n",
        )
        .unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.total_operations, 50);
        assert_eq!(config.operation_distribution.invalid_ops, 0.3);
        assert_eq!(config.operation_distribution.valid_ops, 0.70);
        assert_eq!(config.pipeline, PipelineConfig::default());
    }
}
