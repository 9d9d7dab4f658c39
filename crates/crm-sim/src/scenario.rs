//! Scripted scenarios
//!
//! A scenario drives a fixed sequence of actions and checks the exact field
//! values that result.

use crate::simulator::SIM_EPOCH;
use crm_core::{
    lead_status, Actor, AddEnquiry, Command, EnquiryState, ManualClock, NewLead, NextTask,
    PipelineEvent, PropertyChange, TaskType,
};
use crm_store::InMemoryStore;
use crm_workflow::{ContextRef, Pipeline, PipelineConfig, WorkflowError};
use std::sync::Arc;

/// One expectation of a scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioCheck {
    pub name: &'static str,
    pub expected: String,
    pub actual: String,
}

impl ScenarioCheck {
    fn new(name: &'static str, expected: impl std::fmt::Debug, actual: impl std::fmt::Debug) -> Self {
        Self {
            name,
            expected: format!("{expected:?}"),
            actual: format!("{actual:?}"),
        }
    }

    #[inline]
    #[must_use]
    pub fn passed(&self) -> bool {
        self.expected == self.actual
    }
}

/// Result of a scripted scenario
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub name: &'static str,
    pub checks: Vec<ScenarioCheck>,
}

impl ScenarioReport {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.checks.iter().all(ScenarioCheck::passed)
    }

    /// Generate a text report
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut report = format!("=== Scenario: {} ===\n\n", self.name);
        for check in &self.checks {
            let mark = if check.passed() { "ok" } else { "FAIL" };
            report.push_str(&format!("[{mark}] {}: {}", check.name, check.actual));
            if !check.passed() {
                report.push_str(&format!(" (expected {})", check.expected));
            }
            report.push('\n');
        }
        report.push_str(&format!(
            "\n=== Result: {} ===\n",
            if self.passed() { "PASS" } else { "FAIL" }
        ));
        report
    }
}

/// Lead at "Sunset Villa" moves to "Ocean View Apartment"
///
/// The old enquiry stays open with `Property Changed` and no stage; a new
/// interested enquiry is opened for the new property and the lead follows it.
pub async fn change_property() -> Result<ScenarioReport, WorkflowError> {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(ManualClock::new(SIM_EPOCH));
    let pipeline = Pipeline::with_clock(store, PipelineConfig::default(), clock.clone());
    let actor = Actor::new("agent001", "Asha Rao");

    let lead = pipeline
        .create_lead(NewLead::new("Priya Sharma", "+91 98765 43210", "website"))
        .await?;
    let target = ContextRef::lead(lead.lead_id.clone());

    let opened = pipeline
        .execute(
            &target,
            Command::new(
                actor.clone(),
                PipelineEvent::EnquiryAdded(AddEnquiry {
                    property_name: "Sunset Villa".into(),
                    agent: "agent001|Asha Rao".into(),
                    next_task: Some(NextTask::new(TaskType::InitialContact).at(SIM_EPOCH + 3_600)),
                    ..AddEnquiry::default()
                }),
            ),
        )
        .await?;
    let first = opened
        .current_enquiry()
        .map(|e| e.enquiry_id.clone())
        .ok_or_else(|| WorkflowError::NotFound {
            entity: "enquiry",
            id: lead.lead_id.to_string(),
        })?;

    clock.advance(60);
    let changed = pipeline
        .execute(
            &target,
            Command::new(
                actor,
                PipelineEvent::PropertyChanged(PropertyChange {
                    property_name: "Ocean View Apartment".into(),
                    reason: "other".into(),
                    ..PropertyChange::default()
                }),
            ),
        )
        .await?;
    let second = changed
        .created_enquiry
        .as_ref()
        .map(|e| e.enquiry_id.clone())
        .ok_or_else(|| WorkflowError::NotFound {
            entity: "enquiry",
            id: lead.lead_id.to_string(),
        })?;

    let e1 = pipeline.enquiry(&first).await?;
    let e2 = pipeline.enquiry(&second).await?;
    let l1 = pipeline.lead(&lead.lead_id).await?;

    let checks = vec![
        ScenarioCheck::new("E1.state", Some(EnquiryState::Open), e1.as_ref().map(|e| e.state)),
        ScenarioCheck::new(
            "E1.leadStatus",
            Some(lead_status::PROPERTY_CHANGED),
            e1.as_ref().and_then(|e| e.lead_status.as_deref()),
        ),
        ScenarioCheck::new("E1.stage", None::<()>, e1.as_ref().and_then(|e| e.stage)),
        ScenarioCheck::new(
            "E2.propertyName",
            Some("Ocean View Apartment"),
            e2.as_ref().map(|e| e.property_name.as_str()),
        ),
        ScenarioCheck::new(
            "E2.leadStatus",
            Some(lead_status::INTERESTED),
            e2.as_ref().and_then(|e| e.lead_status.as_deref()),
        ),
        ScenarioCheck::new(
            "L1.propertyName",
            Some("Ocean View Apartment"),
            l1.as_ref().and_then(|l| l.property_name.as_deref()),
        ),
        ScenarioCheck::new("L1.stage", None::<()>, l1.as_ref().and_then(|l| l.stage)),
        ScenarioCheck::new(
            "L1.leadStatus",
            Some(lead_status::INTERESTED),
            l1.as_ref().and_then(|l| l.lead_status.as_deref()),
        ),
    ];

    Ok(ScenarioReport {
        name: "change property",
        checks,
    })
}
