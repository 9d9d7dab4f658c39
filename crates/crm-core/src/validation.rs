//! Lead registration input
//!
//! Contact details are checked and normalized before a lead is written, so
//! duplicate detection compares like with like.

use crate::error::ValidationError;
use crate::ids::LeadId;
use crate::types::{AdditionalNumber, Lead, LeadState};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

const MIN_PHONE_DIGITS: usize = 7;
const MAX_PHONE_DIGITS: usize = 15;

fn email_pattern() -> Option<&'static Regex> {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| {
            Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$").ok()
        })
        .as_ref()
}

/// Normalize a phone number to `[+]digits`.
///
/// Spaces, dashes, dots and parentheses are dropped; a leading `+` is kept.
pub fn normalize_phone(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    let (plus, rest) = match trimmed.strip_prefix('+') {
        Some(rest) => ("+", rest),
        None => ("", trimmed),
    };

    let mut digits = String::with_capacity(rest.len());
    for c in rest.chars() {
        match c {
            '0'..='9' => digits.push(c),
            ' ' | '-' | '.' | '(' | ')' => {}
            _ => return Err(ValidationError::InvalidPhone(raw.to_string())),
        }
    }

    if !(MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits.len()) {
        return Err(ValidationError::InvalidPhone(raw.to_string()));
    }
    Ok(format!("{plus}{digits}"))
}

/// Check an email address
pub fn validate_email(raw: &str) -> Result<String, ValidationError> {
    let email = raw.trim();
    if email_pattern().is_some_and(|re| re.is_match(email)) {
        Ok(email.to_string())
    } else {
        Err(ValidationError::InvalidEmail(raw.to_string()))
    }
}

/// Form data for registering a lead
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLead {
    pub name: String,
    pub phone_number: String,
    #[serde(default)]
    pub additional_numbers: Vec<AdditionalNumber>,
    #[serde(default)]
    pub email: Option<String>,
    pub source: String,
}

impl NewLead {
    #[must_use]
    pub fn new(name: impl Into<String>, phone: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone_number: phone.into(),
            source: source.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn with_number(mut self, number: AdditionalNumber) -> Self {
        self.additional_numbers.push(number);
        self
    }

    /// Validate and normalize into an unsaved, `fresh` lead
    pub fn into_lead(self, now: i64) -> Result<Lead, ValidationError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::MissingName);
        }

        let phone_number = normalize_phone(&self.phone_number)?;
        let email = match self.email.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(validate_email(raw)?),
        };

        let mut additional_numbers = Vec::with_capacity(self.additional_numbers.len());
        for extra in self.additional_numbers {
            let number = normalize_phone(&extra.number)?;
            if number == phone_number {
                continue;
            }
            additional_numbers.push(AdditionalNumber {
                number,
                label: extra.label,
            });
        }

        Ok(Lead {
            lead_id: LeadId::default(),
            name,
            phone_number,
            additional_numbers,
            email,
            property_name: None,
            property_id: None,
            agent_id: None,
            agent_name: None,
            tag: None,
            source: self.source.trim().to_string(),
            stage: None,
            task_type: None,
            scheduled_date: None,
            lead_status: None,
            state: LeadState::Fresh,
            rnr: false,
            rnr_count: 0,
            added: now,
            last_modified: Some(now),
        })
    }
}
