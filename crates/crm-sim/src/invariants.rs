//! World snapshots and the invariants checked between them

use crm_core::state_machine::validate_transition;
use crm_core::{
    active_enquiry, mirrors, Enquiry, EnquiryId, IdKind, Lead, LeadId, LeadState, Task, TaskId,
    TaskStatus,
};
use crm_store::{InMemoryStore, Query, Repository, StoreError};
use std::collections::HashMap;

/// Every record in the store at one instant
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub leads: Vec<Lead>,
    pub enquiries: Vec<Enquiry>,
    pub tasks: Vec<Task>,
}

impl Snapshot {
    pub async fn load(
        leads: &Repository<Lead>,
        enquiries: &Repository<Enquiry>,
        tasks: &Repository<Task>,
    ) -> Result<Self, StoreError> {
        let all = Query::all();
        Ok(Self {
            leads: leads.find(&all).await?,
            enquiries: enquiries.find(&all).await?,
            tasks: tasks.find(&all).await?,
        })
    }

    #[must_use]
    pub fn lead(&self, lead_id: &LeadId) -> Option<&Lead> {
        self.leads.iter().find(|l| &l.lead_id == lead_id)
    }

    #[must_use]
    pub fn task(&self, task_id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.task_id == task_id)
    }

    pub fn enquiries_of<'a>(&'a self, lead_id: &'a LeadId) -> impl Iterator<Item = &'a Enquiry> {
        self.enquiries.iter().filter(move |e| &e.lead_id == lead_id)
    }

    /// The enquiry `lead_id` should mirror
    #[must_use]
    pub fn active_enquiry(&self, lead_id: &LeadId) -> Option<&Enquiry> {
        active_enquiry(self.enquiries.iter().filter(|e| &e.lead_id == lead_id))
    }

    /// Tasks of an enquiry, open and complete
    #[must_use]
    pub fn tasks_of(&self, enquiry_id: &EnquiryId) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| &t.enquiry_id == enquiry_id)
            .collect()
    }

    /// True when a lead already holds `phone` (normalized)
    #[must_use]
    pub fn has_phone(&self, phone: &str) -> bool {
        self.leads.iter().any(|l| l.phone_number == phone)
    }
}

/// A specific invariant violation
#[derive(Debug, Clone)]
pub struct InvariantViolation {
    pub check: InvariantCheck,
    pub details: String,
}

/// Types of invariant checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantCheck {
    // Lead
    LeadMirrorsActiveEnquiry,
    FreshIffNoEnquiry,
    AllLeadMovesInAllowedMatrix,

    // Enquiry
    AgentHistoryIsAppendOnly,

    // Task
    CompletionDateIffComplete,

    // Ids
    IdsAreUniqueAndGapFree,
}

fn violation(check: InvariantCheck, details: String) -> InvariantViolation {
    InvariantViolation { check, details }
}

/// Pipeline invariant checks
pub struct PipelineInvariants;

impl PipelineInvariants {
    /// Check every invariant on `after`, using `before` for the ones about change
    pub fn check_all(
        before: &Snapshot,
        after: &Snapshot,
        store: &InMemoryStore,
    ) -> Result<(), Vec<InvariantViolation>> {
        let mut violations = Vec::new();
        violations.extend(Self::check_mirroring(after));
        violations.extend(Self::check_fresh_leads(after));
        violations.extend(Self::check_lead_moves(before, after));
        violations.extend(Self::check_agent_history(before, after));
        violations.extend(Self::check_completion_dates(after));
        violations.extend(Self::check_ids(after, store));

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    /// Non-junk leads carry their active enquiry's stage, tag, status, state,
    /// property and agent
    pub fn check_mirroring(world: &Snapshot) -> Vec<InvariantViolation> {
        world
            .leads
            .iter()
            .filter(|lead| lead.state != LeadState::Junk)
            .filter_map(|lead| {
                let enquiry = world.active_enquiry(&lead.lead_id)?;
                (!mirrors(lead, enquiry)).then(|| {
                    violation(
                        InvariantCheck::LeadMirrorsActiveEnquiry,
                        format!(
                            "{} ({}, {:?}, {:?}) does not mirror {} ({}, {:?}, {:?})",
                            lead.lead_id,
                            lead.state,
                            lead.stage,
                            lead.lead_status,
                            enquiry.enquiry_id,
                            enquiry.state,
                            enquiry.stage,
                            enquiry.lead_status,
                        ),
                    )
                })
            })
            .collect()
    }

    /// A fresh lead has no enquiry; a lead without one is fresh or junk
    pub fn check_fresh_leads(world: &Snapshot) -> Vec<InvariantViolation> {
        world
            .leads
            .iter()
            .filter_map(|lead| {
                let count = world.enquiries_of(&lead.lead_id).count();
                let ok = match lead.state {
                    LeadState::Fresh => count == 0,
                    LeadState::Junk => true,
                    _ => count > 0,
                };
                (!ok).then(|| {
                    violation(
                        InvariantCheck::FreshIffNoEnquiry,
                        format!("{} is {} with {count} enquiries", lead.lead_id, lead.state),
                    )
                })
            })
            .collect()
    }

    pub fn check_lead_moves(before: &Snapshot, after: &Snapshot) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();
        for old in &before.leads {
            match after.lead(&old.lead_id) {
                None => violations.push(violation(
                    InvariantCheck::AllLeadMovesInAllowedMatrix,
                    format!("{} disappeared", old.lead_id),
                )),
                Some(new) if new.state != old.state => {
                    if let Err(e) = validate_transition(old.state, new.state) {
                        violations.push(violation(
                            InvariantCheck::AllLeadMovesInAllowedMatrix,
                            format!("{}: {e}", old.lead_id),
                        ));
                    }
                }
                Some(_) => {}
            }
        }
        violations
    }

    pub fn check_agent_history(before: &Snapshot, after: &Snapshot) -> Vec<InvariantViolation> {
        let now: HashMap<_, _> = after
            .enquiries
            .iter()
            .map(|e| (&e.enquiry_id, e))
            .collect();
        before
            .enquiries
            .iter()
            .filter_map(|old| {
                let details = match now.get(&old.enquiry_id) {
                    None => format!("{} disappeared", old.enquiry_id),
                    Some(new) if !new.agent_history.starts_with(&old.agent_history) => format!(
                        "{} agent history rewritten: {} entries before, {} after",
                        old.enquiry_id,
                        old.agent_history.len(),
                        new.agent_history.len()
                    ),
                    Some(_) => return None,
                };
                Some(violation(InvariantCheck::AgentHistoryIsAppendOnly, details))
            })
            .collect()
    }

    pub fn check_completion_dates(world: &Snapshot) -> Vec<InvariantViolation> {
        world
            .tasks
            .iter()
            .filter(|t| (t.status == TaskStatus::Complete) != t.completion_date.is_some())
            .map(|t| {
                violation(
                    InvariantCheck::CompletionDateIffComplete,
                    format!("{} is {} with completion date {:?}", t.task_id, t.status, t.completion_date),
                )
            })
            .collect()
    }

    /// IDs of each kind are exactly 1..=counter
    pub fn check_ids(world: &Snapshot, store: &InMemoryStore) -> Vec<InvariantViolation> {
        IdKind::ALL
            .iter()
            .filter_map(|&kind| {
                let ids: Vec<&str> = match kind {
                    IdKind::Lead => world.leads.iter().map(|l| l.lead_id.as_str()).collect(),
                    IdKind::Enquiry => world.enquiries.iter().map(|e| e.enquiry_id.as_str()).collect(),
                    IdKind::Task => world.tasks.iter().map(|t| t.task_id.as_str()).collect(),
                };
                let mut numbers: Vec<u64> = ids
                    .iter()
                    .filter_map(|id| kind.parse_number(id))
                    .collect();
                numbers.sort_unstable();

                let counter = store.counter(kind.counter_key());
                let expected: Vec<u64> = (1..=counter).collect();
                if numbers.len() == ids.len() && numbers == expected {
                    return None;
                }
                Some(violation(
                    InvariantCheck::IdsAreUniqueAndGapFree,
                    format!(
                        "{} counter at {counter}, ids {:?}",
                        kind.counter_key(),
                        ids
                    ),
                ))
            })
            .collect()
    }
}
