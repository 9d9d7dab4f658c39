//! Outcome tables
//!
//! Static mappings from task type and task state to the enquiry fields a
//! transition writes.

use super::ScheduledEvent;
use crate::types::{lead_status, EnquiryState, Stage, TaskState, TaskType};

/// Where a successful task moves its enquiry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuccessTarget {
    pub stage: Stage,
    pub lead_status: &'static str,
    pub state: EnquiryState,
}

#[must_use]
pub fn success_target(task_type: TaskType) -> SuccessTarget {
    let (lead_status, state) = match task_type {
        TaskType::Booking => (lead_status::CLOSED, EnquiryState::Closed),
        TaskType::LeadRegistration
        | TaskType::InitialContact
        | TaskType::SiteVisit
        | TaskType::EoiCollection => (lead_status::INTERESTED, EnquiryState::Open),
    };
    SuccessTarget {
        stage: task_type.success_stage(),
        lead_status,
        state,
    }
}

/// `leadStatus` written when a task outcome drops the lead
#[must_use]
pub fn close_reason_status(task_state: Option<TaskState>) -> &'static str {
    match task_state {
        Some(TaskState::Connected) => lead_status::NOT_INTERESTED,
        Some(TaskState::NotConnected) => lead_status::NOT_CONNECTED,
        Some(TaskState::SiteVisited) => lead_status::VISIT_UNSUCCESSFUL,
        Some(TaskState::SiteNotVisited) => lead_status::VISIT_DROPPED,
        Some(TaskState::EoiNotCollected) => lead_status::EOI_DROPPED,
        Some(TaskState::BookingUnsuccessful) => lead_status::BOOKING_DROPPED,
        Some(TaskState::EoiCollected | TaskState::BookingSuccessful) | None => {
            lead_status::DROPPED
        }
    }
}

/// `leadStatus` written when a task is rescheduled
#[must_use]
pub fn reschedule_status(event: ScheduledEvent) -> &'static str {
    match event {
        ScheduledEvent::SiteVisit => lead_status::INTERESTED,
        ScheduledEvent::Call | ScheduledEvent::Meeting | ScheduledEvent::FollowUp => {
            lead_status::FOLLOW_UP
        }
    }
}

/// Stage after a reschedule. Only an initial contact moves it.
#[must_use]
pub fn reschedule_stage(
    task_type: TaskType,
    task_state: Option<TaskState>,
    lead_stage: Option<Stage>,
    enquiry_stage: Option<Stage>,
) -> Option<Stage> {
    match (task_type, task_state) {
        (TaskType::InitialContact, Some(TaskState::Connected)) => Some(Stage::InitialContacted),
        (TaskType::InitialContact, Some(TaskState::NotConnected)) => lead_stage,
        _ => enquiry_stage,
    }
}

/// State and stage after requirements are collected
#[must_use]
pub fn requirement_outcome(
    task_type: TaskType,
    task_state: Option<TaskState>,
    stage: Option<Stage>,
) -> (EnquiryState, Option<Stage>) {
    match task_state {
        Some(
            TaskState::SiteNotVisited | TaskState::EoiNotCollected | TaskState::BookingUnsuccessful,
        ) => (EnquiryState::Dropped, stage),
        _ => match task_type {
            TaskType::InitialContact | TaskType::SiteVisit => {
                (EnquiryState::Open, Some(task_type.success_stage()))
            }
            _ => (EnquiryState::Open, stage),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_booking_closes_on_success() {
        for task_type in TaskType::ALL {
            let target = success_target(*task_type);
            assert_eq!(target.stage, task_type.success_stage());
            if *task_type == TaskType::Booking {
                assert_eq!(target.state, EnquiryState::Closed);
                assert_eq!(target.lead_status, "closed");
            } else {
                assert_eq!(target.state, EnquiryState::Open);
                assert_eq!(target.lead_status, "interested");
            }
        }
    }

    #[test]
    fn close_reasons() {
        assert_eq!(close_reason_status(Some(TaskState::Connected)), "not interested");
        assert_eq!(close_reason_status(Some(TaskState::SiteVisited)), "visit unsuccessful");
        assert_eq!(close_reason_status(Some(TaskState::SiteNotVisited)), "visit dropped");
        assert_eq!(close_reason_status(Some(TaskState::BookingSuccessful)), "dropped");
        assert_eq!(close_reason_status(None), "dropped");
    }

    #[test]
    fn reschedule_moves_stage_only_for_initial_contact() {
        let lead = Some(Stage::LeadRegistered);
        let enq = Some(Stage::SiteVisited);
        assert_eq!(
            reschedule_stage(TaskType::InitialContact, Some(TaskState::Connected), lead, enq),
            Some(Stage::InitialContacted)
        );
        assert_eq!(
            reschedule_stage(TaskType::InitialContact, Some(TaskState::NotConnected), lead, enq),
            lead
        );
        assert_eq!(
            reschedule_stage(TaskType::SiteVisit, Some(TaskState::Connected), lead, enq),
            enq
        );
        assert_eq!(reschedule_status(ScheduledEvent::SiteVisit), "interested");
        assert_eq!(reschedule_status(ScheduledEvent::Call), "follow up");
    }

    #[test]
    fn requirement_outcomes() {
        let stage = Some(Stage::SiteVisited);
        assert_eq!(
            requirement_outcome(TaskType::SiteVisit, Some(TaskState::SiteNotVisited), stage),
            (EnquiryState::Dropped, stage)
        );
        assert_eq!(
            requirement_outcome(TaskType::InitialContact, Some(TaskState::Connected), None),
            (EnquiryState::Open, Some(Stage::InitialContacted))
        );
        assert_eq!(
            requirement_outcome(TaskType::EoiCollection, None, stage),
            (EnquiryState::Open, stage)
        );
    }
}
