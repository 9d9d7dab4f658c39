//! Testing utilities for the CRM workspace
//!
//! Shared fixtures, direct seeding, and a store that fails on demand.

#![allow(missing_docs)]

use crm_core::{
    lead_status, Actor, AgentHistoryEntry, Enquiry, EnquiryId, EnquiryState, IdKind, Lead,
    LeadId, LeadState, ManualClock, NewLead, Stage, Tag, Task, TaskId, TaskStatus, TaskType,
};
use crm_store::{
    to_document, Collection, Document, DocumentStore, InMemoryStore, Query, StoreError,
    Subscription, SubscriptionCallback,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Start of time in every fixture
pub const T0: i64 = 1_700_000_000;

pub const HOUR: i64 = 3_600;

pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(T0))
}

pub fn actor() -> Actor {
    Actor::new("agent001", "Asha Rao")
}

pub fn new_lead(name: &str, phone: &str) -> NewLead {
    NewLead::new(name, phone, "website")
}

/// Open lead `lead01` at "Sunset Villa" with agent001
pub fn lead() -> Lead {
    Lead {
        lead_id: LeadId::new("lead01"),
        name: "Priya Sharma".into(),
        phone_number: "+919876543210".into(),
        additional_numbers: Vec::new(),
        email: Some("priya@example.com".into()),
        property_name: Some("Sunset Villa".into()),
        property_id: Some("prop01".into()),
        agent_id: Some("agent001".into()),
        agent_name: Some("Asha Rao".into()),
        tag: Some(Tag::Potential),
        source: "website".into(),
        stage: Some(Stage::LeadRegistered),
        task_type: None,
        scheduled_date: None,
        lead_status: Some(lead_status::INTERESTED.into()),
        state: LeadState::Open,
        rnr: false,
        rnr_count: 0,
        added: T0 - 10 * HOUR,
        last_modified: Some(T0 - 10 * HOUR),
    }
}

/// Enquiry mirrored by [`lead`]
pub fn enquiry() -> Enquiry {
    let lead = lead();
    Enquiry {
        enquiry_id: EnquiryId::new("enq001"),
        lead_id: lead.lead_id,
        agent_id: "agent001".into(),
        agent_name: "Asha Rao".into(),
        property_id: Some("prop01".into()),
        property_name: "Sunset Villa".into(),
        source: "website".into(),
        lead_status: Some(lead_status::INTERESTED.into()),
        stage: Some(Stage::LeadRegistered),
        tag: Some(Tag::Potential),
        state: EnquiryState::Open,
        rnr: false,
        rnr_count: 0,
        agent_history: vec![AgentHistoryEntry {
            agent_id: "agent001".into(),
            agent_name: "Asha Rao".into(),
            timestamp: T0 - 10 * HOUR,
            last_stage: None,
        }],
        activity_history: Vec::new(),
        notes: Vec::new(),
        documents: Vec::new(),
        requirements: Vec::new(),
        added: T0 - 10 * HOUR,
        last_modified: Some(T0 - 10 * HOUR),
    }
}

/// Open task `task{n}` on [`enquiry`]
pub fn task(n: u64, task_type: TaskType, scheduled_date: Option<i64>) -> Task {
    Task {
        task_id: TaskId::from_number(n),
        enquiry_id: EnquiryId::new("enq001"),
        lead_id: LeadId::new("lead01"),
        agent_id: "agent001".into(),
        agent_name: "Asha Rao".into(),
        task_type,
        event_name: None,
        status: TaskStatus::Open,
        stage: Some(Stage::LeadRegistered),
        lead_status: Some(lead_status::INTERESTED.into()),
        tag: Some(Tag::Potential),
        scheduled_date,
        added: T0 - 10 * HOUR,
        completion_date: None,
        last_modified: Some(T0 - 10 * HOUR),
        eoi_entries: Vec::new(),
        email_sent: None,
    }
}

/// Records written straight to a store, bypassing the pipeline
#[derive(Debug, Clone, Default)]
pub struct Seed {
    pub leads: Vec<Lead>,
    pub enquiries: Vec<Enquiry>,
    pub tasks: Vec<Task>,
}

impl Seed {
    /// [`lead`], [`enquiry`] and one open initial-contact task
    pub fn standard() -> Self {
        Self {
            leads: vec![lead()],
            enquiries: vec![enquiry()],
            tasks: vec![task(1, TaskType::InitialContact, Some(T0 + HOUR))],
        }
    }

    #[must_use]
    pub fn with_task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    #[must_use]
    pub fn with_enquiry(mut self, enquiry: Enquiry) -> Self {
        self.enquiries.push(enquiry);
        self
    }

    #[must_use]
    pub fn with_lead(mut self, lead: Lead) -> Self {
        self.leads.push(lead);
        self
    }

    /// Write every record and advance the ID counters past them
    pub async fn write(&self, store: &dyn DocumentStore) -> Result<(), StoreError> {
        for lead in &self.leads {
            store
                .create(Collection::Leads, lead.lead_id.as_str(), to_document(lead)?)
                .await?;
        }
        for enquiry in &self.enquiries {
            store
                .create(
                    Collection::Enquiries,
                    enquiry.enquiry_id.as_str(),
                    to_document(enquiry)?,
                )
                .await?;
        }
        for task in &self.tasks {
            store
                .create(Collection::Tasks, task.task_id.as_str(), to_document(task)?)
                .await?;
        }

        let highest = [
            (IdKind::Lead, self.leads.iter().filter_map(|l| l.lead_id.number()).max()),
            (
                IdKind::Enquiry,
                self.enquiries.iter().filter_map(|e| e.enquiry_id.number()).max(),
            ),
            (IdKind::Task, self.tasks.iter().filter_map(|t| t.task_id.number()).max()),
        ];
        for (kind, max) in highest {
            let Some(max) = max else { continue };
            while store.increment_counter(kind.counter_key()).await? < max {}
        }
        Ok(())
    }
}

/// Store operations a fault can target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Get,
    Create,
    Update,
    Delete,
    Find,
    IncrementCounter,
}

#[derive(Debug, Clone)]
struct Fault {
    op: Operation,
    collection: Option<Collection>,
    id: Option<String>,
    remaining: u32,
    conflict: bool,
}

impl Fault {
    fn matches(&self, op: Operation, collection: Option<Collection>, id: Option<&str>) -> bool {
        self.op == op
            && self.collection.map_or(true, |c| Some(c) == collection)
            && self.id.as_deref().map_or(true, |want| Some(want) == id)
    }
}

/// In-memory store that fails chosen calls
///
/// Faults are consumed in the order they were added; each fires for its
/// configured number of matching calls.
#[derive(Debug, Default)]
pub struct FaultInjectingStore {
    inner: InMemoryStore,
    faults: Mutex<Vec<Fault>>,
}

impl FaultInjectingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Underlying store, for assertions
    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    /// Fail the next matching call on `collection` with a backend error
    pub fn fail_next(&self, op: Operation, collection: Collection) {
        self.push(Fault {
            op,
            collection: Some(collection),
            id: None,
            remaining: 1,
            conflict: false,
        });
    }

    /// Fail every `op` on one document until cleared
    pub fn fail_on(&self, op: Operation, collection: Collection, id: &str) {
        self.push(Fault {
            op,
            collection: Some(collection),
            id: Some(id.to_string()),
            remaining: u32::MAX,
            conflict: false,
        });
    }

    /// Make the next `times` counter increments lose their race
    pub fn conflict_counters(&self, times: u32) {
        self.push(Fault {
            op: Operation::IncrementCounter,
            collection: None,
            id: None,
            remaining: times,
            conflict: true,
        });
    }

    pub fn clear(&self) {
        self.faults.lock().clear();
    }

    fn push(&self, fault: Fault) {
        self.faults.lock().push(fault);
    }

    fn check(
        &self,
        op: Operation,
        collection: Option<Collection>,
        id: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut faults = self.faults.lock();
        let Some(pos) = faults.iter().position(|f| f.matches(op, collection, id)) else {
            return Ok(());
        };
        let fault = &mut faults[pos];
        fault.remaining -= 1;
        let conflict = fault.conflict;
        if fault.remaining == 0 {
            faults.remove(pos);
        }
        drop(faults);

        if conflict {
            Err(StoreError::ConcurrencyConflict {
                counter: id.unwrap_or_default().to_string(),
            })
        } else {
            Err(StoreError::Backend(format!(
                "injected {op:?} failure on {}",
                id.unwrap_or("*")
            )))
        }
    }
}

#[async_trait::async_trait]
impl DocumentStore for FaultInjectingStore {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
        self.check(Operation::Get, Some(collection), Some(id))?;
        self.inner.get(collection, id).await
    }

    async fn create(
        &self,
        collection: Collection,
        id: &str,
        doc: Document,
    ) -> Result<(), StoreError> {
        self.check(Operation::Create, Some(collection), Some(id))?;
        self.inner.create(collection, id, doc).await
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        patch: Document,
    ) -> Result<(), StoreError> {
        self.check(Operation::Update, Some(collection), Some(id))?;
        self.inner.update(collection, id, patch).await
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        self.check(Operation::Delete, Some(collection), Some(id))?;
        self.inner.delete(collection, id).await
    }

    async fn find(
        &self,
        collection: Collection,
        query: &Query,
    ) -> Result<Vec<Document>, StoreError> {
        self.check(Operation::Find, Some(collection), None)?;
        self.inner.find(collection, query).await
    }

    async fn increment_counter(&self, counter: &str) -> Result<u64, StoreError> {
        self.check(Operation::IncrementCounter, None, Some(counter))?;
        self.inner.increment_counter(counter).await
    }

    fn subscribe(
        &self,
        collection: Collection,
        query: Query,
        callback: SubscriptionCallback,
    ) -> Subscription {
        self.inner.subscribe(collection, query, callback)
    }
}

/// Advance `clock` by whole hours
pub fn advance_hours(clock: &ManualClock, hours: i64) -> i64 {
    clock.advance(hours * HOUR)
}

