//! Lead projection
//!
//! A Lead carries denormalized copies of its active enquiry and of that
//! enquiry's earliest open task so list views can filter on them. Those copies
//! are computed here and nowhere else.

use crate::types::{Enquiry, Lead, Task};

/// The open task that governs a lead's `taskType`/`scheduledDate`.
///
/// Smallest `scheduledDate` wins; on equal dates the first one encountered
/// is kept. Open tasks without a date rank after every dated one.
pub fn earliest_open_task<'a, I>(tasks: I) -> Option<&'a Task>
where
    I: IntoIterator<Item = &'a Task>,
{
    tasks
        .into_iter()
        .filter(|t| t.is_open())
        .min_by_key(|t| match t.scheduled_date {
            Some(date) => (false, date),
            None => (true, 0),
        })
}

/// The enquiry a lead currently mirrors: the most recently added one.
///
/// Enquiries added in the same second are ordered by their sequential ID.
pub fn active_enquiry<'a, I>(enquiries: I) -> Option<&'a Enquiry>
where
    I: IntoIterator<Item = &'a Enquiry>,
{
    enquiries
        .into_iter()
        .max_by_key(|e| (e.added, e.enquiry_id.number().unwrap_or(0)))
}

/// The enquiry touched last; bulk junking targets this one.
///
/// Falls back to `added` for enquiries never stamped, then to the ID.
pub fn most_recently_modified<'a, I>(enquiries: I) -> Option<&'a Enquiry>
where
    I: IntoIterator<Item = &'a Enquiry>,
{
    enquiries.into_iter().max_by_key(|e| {
        (
            e.last_modified.unwrap_or(e.added),
            e.enquiry_id.number().unwrap_or(0),
        )
    })
}

/// Recompute every mirrored field of `lead` from its active enquiry.
///
/// Identity, contact details, `source` and timestamps are kept from `lead`.
#[must_use]
pub fn project_lead(lead: &Lead, enquiry: &Enquiry, earliest: Option<&Task>) -> Lead {
    Lead {
        property_name: Some(enquiry.property_name.clone()),
        property_id: enquiry.property_id.clone(),
        agent_id: Some(enquiry.agent_id.clone()),
        agent_name: Some(enquiry.agent_name.clone()),
        tag: enquiry.tag,
        stage: enquiry.stage,
        lead_status: enquiry.lead_status.clone(),
        state: enquiry.state.into(),
        rnr: enquiry.rnr,
        rnr_count: enquiry.rnr_count,
        task_type: earliest.map(|t| t.task_type),
        scheduled_date: earliest.and_then(|t| t.scheduled_date),
        ..lead.clone()
    }
}

/// True when every mirrored field of `lead` matches `enquiry`
#[must_use]
pub fn mirrors(lead: &Lead, enquiry: &Enquiry) -> bool {
    lead.stage == enquiry.stage
        && lead.tag == enquiry.tag
        && lead.lead_status == enquiry.lead_status
        && lead.state == enquiry.state.into()
        && lead.property_name.as_deref() == Some(enquiry.property_name.as_str())
        && lead.agent_id.as_deref() == Some(enquiry.agent_id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{EnquiryId, LeadId, TaskId};
    use crate::types::{EnquiryState, LeadState, Stage, Tag, TaskStatus, TaskType};

    fn task(id: u64, status: TaskStatus, date: Option<i64>) -> Task {
        Task {
            task_id: TaskId::from_number(id),
            enquiry_id: EnquiryId::from_number(1),
            lead_id: LeadId::from_number(1),
            agent_id: "agent001".into(),
            agent_name: "Asha Rao".into(),
            task_type: TaskType::SiteVisit,
            event_name: None,
            status,
            stage: None,
            lead_status: None,
            tag: None,
            scheduled_date: date,
            added: 0,
            completion_date: None,
            last_modified: None,
            eoi_entries: Vec::new(),
            email_sent: None,
        }
    }

    fn enquiry(id: u64, added: i64) -> Enquiry {
        Enquiry {
            enquiry_id: EnquiryId::from_number(id),
            lead_id: LeadId::from_number(1),
            agent_id: "agent001".into(),
            agent_name: "Asha Rao".into(),
            property_id: Some("prop7".into()),
            property_name: "Sunset Villa".into(),
            source: "website".into(),
            lead_status: Some("interested".into()),
            stage: Some(Stage::SiteVisited),
            tag: Some(Tag::Hot),
            state: EnquiryState::Open,
            rnr: false,
            rnr_count: 0,
            agent_history: Vec::new(),
            activity_history: Vec::new(),
            notes: Vec::new(),
            documents: Vec::new(),
            requirements: Vec::new(),
            added,
            last_modified: Some(added),
        }
    }

    #[test]
    fn earliest_ignores_completed_tasks() {
        let tasks = vec![
            task(1, TaskStatus::Complete, Some(10)),
            task(2, TaskStatus::Open, Some(30)),
            task(3, TaskStatus::Open, Some(20)),
        ];
        assert_eq!(earliest_open_task(&tasks).unwrap().task_id.as_str(), "task3");
    }

    #[test]
    fn earliest_keeps_first_on_ties_and_prefers_dated() {
        let tasks = vec![
            task(1, TaskStatus::Open, None),
            task(2, TaskStatus::Open, Some(20)),
            task(3, TaskStatus::Open, Some(20)),
        ];
        assert_eq!(earliest_open_task(&tasks).unwrap().task_id.as_str(), "task2");
    }

    #[test]
    fn earliest_is_none_without_open_tasks() {
        let tasks = vec![task(1, TaskStatus::Complete, Some(10))];
        assert!(earliest_open_task(&tasks).is_none());
    }

    #[test]
    fn active_enquiry_breaks_same_second_ties_by_id() {
        let enquiries = vec![enquiry(2, 100), enquiry(3, 100), enquiry(1, 50)];
        assert_eq!(
            active_enquiry(&enquiries).unwrap().enquiry_id.as_str(),
            "enq003"
        );
    }

    #[test]
    fn most_recently_modified_can_differ_from_active() {
        let mut old = enquiry(1, 50);
        old.last_modified = Some(300);
        let newer = enquiry(2, 100);
        let enquiries = vec![old, newer];
        assert_eq!(
            most_recently_modified(&enquiries).unwrap().enquiry_id.as_str(),
            "enq001"
        );
        assert_eq!(active_enquiry(&enquiries).unwrap().enquiry_id.as_str(), "enq002");
    }

    #[test]
    fn projection_copies_enquiry_and_earliest_task() {
        let lead = Lead {
            lead_id: LeadId::from_number(1),
            name: "Meera Iyer".into(),
            phone_number: "+919800000001".into(),
            additional_numbers: Vec::new(),
            email: None,
            property_name: None,
            property_id: None,
            agent_id: None,
            agent_name: None,
            tag: None,
            source: "website".into(),
            stage: None,
            task_type: None,
            scheduled_date: None,
            lead_status: None,
            state: LeadState::Fresh,
            rnr: false,
            rnr_count: 0,
            added: 1,
            last_modified: Some(1),
        };
        let enq = enquiry(1, 100);
        let open = task(4, TaskStatus::Open, Some(500));

        let projected = project_lead(&lead, &enq, Some(&open));
        assert!(mirrors(&projected, &enq));
        assert_eq!(projected.state, LeadState::Open);
        assert_eq!(projected.task_type, Some(TaskType::SiteVisit));
        assert_eq!(projected.scheduled_date, Some(500));
        assert_eq!(projected.name, "Meera Iyer");

        let without_task = project_lead(&projected, &enq, None);
        assert_eq!(without_task.task_type, None);
        assert_eq!(without_task.scheduled_date, None);
    }
}
