//! Core records of the lead pipeline
//!
//! Defines:
//! - Lead, Enquiry and Task documents as they are stored
//! - The fixed vocabularies (state, stage, tag, task type, ...)
//! - Note and activity log items
//!
//! Field names serialize in camelCase and vocabulary values as the lowercase
//! labels the store and search index already hold (`"super hot"`,
//! `"initial contacted"`).

use crate::error::ValidationError;
use crate::ids::{EnquiryId, LeadId, TaskId};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $label:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $label)] $variant,)+
        }

        impl $name {
            /// Every value, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            /// Stored label
            #[inline]
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

labelled_enum! {
    /// Lifecycle state of a Lead
    pub enum LeadState {
        /// Registered, no enquiry yet
        Fresh => "fresh",
        Open => "open",
        Closed => "closed",
        Dropped => "dropped",
        Junk => "junk",
    }
}

labelled_enum! {
    /// Lifecycle state of an Enquiry
    pub enum EnquiryState {
        Open => "open",
        Closed => "closed",
        Dropped => "dropped",
        Junk => "junk",
    }
}

impl From<EnquiryState> for LeadState {
    fn from(value: EnquiryState) -> Self {
        match value {
            EnquiryState::Open => LeadState::Open,
            EnquiryState::Closed => LeadState::Closed,
            EnquiryState::Dropped => LeadState::Dropped,
            EnquiryState::Junk => LeadState::Junk,
        }
    }
}

labelled_enum! {
    /// Pipeline stage reached
    pub enum Stage {
        LeadRegistered => "lead registered",
        InitialContacted => "initial contacted",
        SiteVisited => "site visited",
        EoiCollected => "eoi collected",
        BookingConfirmed => "booking confirmed",
    }
}

labelled_enum! {
    /// Lead temperature
    pub enum Tag {
        Cold => "cold",
        Potential => "potential",
        Hot => "hot",
        SuperHot => "super hot",
    }
}

labelled_enum! {
    /// Kind of work a task represents; one per pipeline stage
    pub enum TaskType {
        LeadRegistration => "lead registration",
        InitialContact => "initial contact",
        SiteVisit => "site visit",
        EoiCollection => "eoi collection",
        Booking => "booking",
    }
}

impl TaskType {
    /// Stage reached when a task of this type succeeds
    #[inline]
    #[must_use]
    pub const fn success_stage(self) -> Stage {
        match self {
            TaskType::LeadRegistration => Stage::LeadRegistered,
            TaskType::InitialContact => Stage::InitialContacted,
            TaskType::SiteVisit => Stage::SiteVisited,
            TaskType::EoiCollection => Stage::EoiCollected,
            TaskType::Booking => Stage::BookingConfirmed,
        }
    }
}

labelled_enum! {
    /// Task status
    pub enum TaskStatus {
        Open => "open",
        Complete => "complete",
    }
}

labelled_enum! {
    /// What happened when the agent executed a task, as picked in the outcome form
    pub enum TaskState {
        Connected => "connected",
        NotConnected => "not connected",
        SiteVisited => "site visited",
        SiteNotVisited => "site not visited",
        EoiCollected => "eoi collected",
        EoiNotCollected => "eoi not collected",
        BookingSuccessful => "booking successful",
        BookingUnsuccessful => "booking unsuccessful",
    }
}

labelled_enum! {
    /// Channel an additional phone number is used on
    pub enum NumberLabel {
        Whatsapp => "whatsapp",
        Call => "call",
    }
}

labelled_enum! {
    /// Activity log vocabulary
    pub enum ActivityType {
        NewEnquiry => "new enquiry",
        TaskCreated => "task created",
        TaskExecution => "task execution",
        PropertyChange => "property change",
        AgentChange => "agent change",
        LeadReopen => "lead reopen",
        StatusUpdate => "status update",
    }
}

/// Well-known `leadStatus` labels
///
/// `leadStatus` is free-form in storage; these are the values the pipeline
/// itself writes.
pub mod lead_status {
    pub const INTERESTED: &str = "interested";
    pub const FOLLOW_UP: &str = "follow up";
    pub const CLOSED: &str = "closed";
    pub const DROPPED: &str = "dropped";
    pub const NOT_INTERESTED: &str = "not interested";
    pub const NOT_CONNECTED: &str = "not connected";
    pub const VISIT_UNSUCCESSFUL: &str = "visit unsuccessful";
    pub const VISIT_DROPPED: &str = "visit dropped";
    pub const EOI_DROPPED: &str = "eoi dropped";
    pub const BOOKING_DROPPED: &str = "booking dropped";
    pub const PROPERTY_CHANGED: &str = "Property Changed";
    pub const REQUIREMENT_COLLECTED: &str = "Requirement Collected";
    pub const JUNK: &str = "junk";
}

/// Agent selection, written by the UI as `"<agentId>|<agentName>"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRef {
    pub id: String,
    pub name: String,
}

impl AgentRef {
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl FromStr for AgentRef {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ValidationError::MissingAgent);
        }
        let (id, name) = s
            .split_once('|')
            .ok_or_else(|| ValidationError::InvalidAgentRef(s.to_string()))?;
        let (id, name) = (id.trim(), name.trim());
        if id.is_empty() || name.is_empty() {
            return Err(ValidationError::InvalidAgentRef(s.to_string()));
        }
        Ok(Self::new(id, name))
    }
}

impl std::fmt::Display for AgentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}|{}", self.id, self.name)
    }
}

/// Extra phone number on a lead
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalNumber {
    pub number: String,
    pub label: NumberLabel,
}

/// One agent assignment in an enquiry's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentHistoryEntry {
    pub agent_id: String,
    pub agent_name: String,
    pub timestamp: i64,
    /// Stage the enquiry was at when the agent took over
    pub last_stage: Option<Stage>,
}

/// Free-text note left by an agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteItem {
    pub timestamp: i64,
    pub agent_id: String,
    pub agent_name: String,
    pub task_type: Option<TaskType>,
    pub note: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// Structured activity log item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityHistoryItem {
    pub activity_type: ActivityType,
    pub timestamp: i64,
    pub agent_name: String,
    /// Transition-specific payload
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// Property preference captured from the lead
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    /// Unit configuration, e.g. "3 BHK"
    pub configuration: Option<String>,
    pub property_type: Option<String>,
    pub location: Option<String>,
    pub budget_min: Option<u64>,
    pub budget_max: Option<u64>,
    pub remarks: Option<String>,
}

/// Expression-of-interest payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EoiEntry {
    pub amount: u64,
    /// Payment instrument, e.g. "cheque"
    #[serde(rename = "type")]
    pub kind: String,
}

/// File attached to an enquiry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnquiryDocument {
    pub name: String,
    pub url: String,
    pub uploaded_at: i64,
}

/// One person pursuing property
///
/// `property*`, `agent*`, `tag`, `stage`, `leadStatus`, `state`, `rnr*`,
/// `taskType` and `scheduledDate` are a projection of the active enquiry
/// (see [`crate::projection::project_lead`]); never set them ad hoc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub lead_id: LeadId,
    pub name: String,
    pub phone_number: String,
    #[serde(default)]
    pub additional_numbers: Vec<AdditionalNumber>,
    #[serde(default)]
    pub email: Option<String>,
    pub property_name: Option<String>,
    pub property_id: Option<String>,
    pub agent_id: Option<String>,
    pub agent_name: Option<String>,
    pub tag: Option<Tag>,
    pub source: String,
    pub stage: Option<Stage>,
    pub task_type: Option<TaskType>,
    pub scheduled_date: Option<i64>,
    pub lead_status: Option<String>,
    pub state: LeadState,
    /// Rang, no response on the last attempt
    #[serde(default)]
    pub rnr: bool,
    #[serde(default)]
    pub rnr_count: u32,
    pub added: i64,
    #[serde(default)]
    pub last_modified: Option<i64>,
}

/// One lead's interest episode in one property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enquiry {
    pub enquiry_id: EnquiryId,
    pub lead_id: LeadId,
    pub agent_id: String,
    pub agent_name: String,
    pub property_id: Option<String>,
    pub property_name: String,
    pub source: String,
    pub lead_status: Option<String>,
    pub stage: Option<Stage>,
    pub tag: Option<Tag>,
    pub state: EnquiryState,
    #[serde(default)]
    pub rnr: bool,
    #[serde(default)]
    pub rnr_count: u32,
    #[serde(default)]
    pub agent_history: Vec<AgentHistoryEntry>,
    #[serde(default)]
    pub activity_history: Vec<ActivityHistoryItem>,
    #[serde(default)]
    pub notes: Vec<NoteItem>,
    #[serde(default)]
    pub documents: Vec<EnquiryDocument>,
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    pub added: i64,
    #[serde(default)]
    pub last_modified: Option<i64>,
}

impl Enquiry {
    /// Agent currently holding the enquiry
    #[inline]
    #[must_use]
    pub fn agent(&self) -> AgentRef {
        AgentRef::new(&self.agent_id, &self.agent_name)
    }
}

/// One scheduled or completed unit of work on an enquiry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub task_id: TaskId,
    pub enquiry_id: EnquiryId,
    pub lead_id: LeadId,
    pub agent_id: String,
    pub agent_name: String,
    pub task_type: TaskType,
    pub event_name: Option<String>,
    pub status: TaskStatus,
    pub stage: Option<Stage>,
    pub lead_status: Option<String>,
    pub tag: Option<Tag>,
    pub scheduled_date: Option<i64>,
    pub added: i64,
    /// Set iff `status == Complete`
    pub completion_date: Option<i64>,
    #[serde(default)]
    pub last_modified: Option<i64>,
    #[serde(default)]
    pub eoi_entries: Vec<EoiEntry>,
    #[serde(default)]
    pub email_sent: Option<bool>,
}

impl Task {
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == TaskStatus::Open
    }

    /// Mark complete at `now`
    pub fn complete(&mut self, now: i64) {
        self.status = TaskStatus::Complete;
        self.completion_date = Some(now);
    }
}
