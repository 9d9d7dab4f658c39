//! ALSC - age since last contact
//!
//! How long a lead has gone untouched, shown next to every lead in list
//! views. The reference point is the later of the lead's soonest open
//! scheduled task and its last modification.

use crate::projection::earliest_open_task;
use crate::types::{Lead, Task};
use serde::{Deserialize, Serialize};

const SECS_PER_HOUR: i64 = 3_600;
const SECS_PER_DAY: i64 = 86_400;

/// Display severity of an ALSC value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgingSeverity {
    /// Up to `fresh_max_hours`
    Fresh,
    /// Up to `warm_max_hours`
    Warm,
    /// Up to `stale_max_hours`
    Stale,
    /// Beyond `stale_max_hours`
    Critical,
}

/// Upper bounds (inclusive, whole hours) of the severity bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgingThresholds {
    pub fresh_max_hours: i64,
    pub warm_max_hours: i64,
    pub stale_max_hours: i64,
}

impl AgingThresholds {
    /// Band for an elapsed duration in seconds
    #[must_use]
    pub fn severity(&self, elapsed_secs: i64) -> AgingSeverity {
        let hours = elapsed_secs.max(0) / SECS_PER_HOUR;
        if hours <= self.fresh_max_hours {
            AgingSeverity::Fresh
        } else if hours <= self.warm_max_hours {
            AgingSeverity::Warm
        } else if hours <= self.stale_max_hours {
            AgingSeverity::Stale
        } else {
            AgingSeverity::Critical
        }
    }
}

impl Default for AgingThresholds {
    fn default() -> Self {
        Self {
            fresh_max_hours: 6,
            warm_max_hours: 12,
            stale_max_hours: 24,
        }
    }
}

/// Computed ALSC with its display band
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aslc {
    /// Seconds since the reference point, clamped at zero
    pub elapsed_secs: i64,
    pub label: String,
    pub severity: AgingSeverity,
}

impl std::fmt::Display for Aslc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label)
    }
}

/// ALSC label for `lead`, or `None` when there is nothing to measure from.
///
/// `latest_enquiry_added` is used only when the lead has never been stamped
/// with `lastModified`.
#[must_use]
pub fn compute_aslc(
    lead: &Lead,
    tasks: &[Task],
    latest_enquiry_added: Option<i64>,
    now: i64,
) -> Option<String> {
    aslc_report(
        lead,
        tasks,
        latest_enquiry_added,
        now,
        &AgingThresholds::default(),
    )
    .map(|aslc| aslc.label)
}

/// Full ALSC computation, including the severity band
#[must_use]
pub fn aslc_report(
    lead: &Lead,
    tasks: &[Task],
    latest_enquiry_added: Option<i64>,
    now: i64,
    thresholds: &AgingThresholds,
) -> Option<Aslc> {
    let last_touched = lead.last_modified.or(latest_enquiry_added);
    let scheduled = earliest_open_task(tasks).and_then(|t| t.scheduled_date);

    let end_time = match (scheduled, last_touched) {
        (Some(scheduled), Some(touched)) => scheduled.max(touched),
        (Some(scheduled), None) => scheduled,
        (None, touched) => touched?,
    };

    let elapsed_secs = (now - end_time).max(0);
    Some(Aslc {
        elapsed_secs,
        label: format_elapsed(elapsed_secs),
        severity: thresholds.severity(elapsed_secs),
    })
}

fn format_elapsed(elapsed_secs: i64) -> String {
    let days = elapsed_secs / SECS_PER_DAY;
    let hours = (elapsed_secs % SECS_PER_DAY) / SECS_PER_HOUR;
    if days > 0 {
        format!("{days} days : {hours} hrs")
    } else {
        format!("{hours} hrs")
    }
}
