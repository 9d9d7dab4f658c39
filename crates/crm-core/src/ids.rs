//! Identifier types
//!
//! Entity IDs are human-readable and sequential (`lead01`, `enq001`, `task1`).
//! The number comes from an atomically incremented counter per entity kind;
//! this module only knows how to format and parse them.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ulid::Ulid;

/// Entity kinds that receive generated IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdKind {
    Lead,
    Enquiry,
    Task,
}

impl IdKind {
    /// Every kind, in dependency order
    pub const ALL: [IdKind; 3] = [IdKind::Lead, IdKind::Enquiry, IdKind::Task];

    /// ID prefix
    #[inline]
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            IdKind::Lead => "lead",
            IdKind::Enquiry => "enq",
            IdKind::Task => "task",
        }
    }

    /// Minimum digit count of the numeric part (0 = no padding)
    #[inline]
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            IdKind::Lead => 2,
            IdKind::Enquiry => 3,
            IdKind::Task => 0,
        }
    }

    /// Name of the counter document backing this kind
    #[inline]
    #[must_use]
    pub const fn counter_key(self) -> &'static str {
        match self {
            IdKind::Lead => "leads",
            IdKind::Enquiry => "enquiries",
            IdKind::Task => "tasks",
        }
    }

    /// Format a counter value as an ID
    #[must_use]
    pub fn format(self, n: u64) -> String {
        format!("{}{:0width$}", self.prefix(), n, width = self.width())
    }

    /// Extract the counter value from an ID of this kind
    #[must_use]
    pub fn parse_number(self, id: &str) -> Option<u64> {
        let digits = id.strip_prefix(self.prefix())?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }
}

impl std::fmt::Display for IdKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IdKind::Lead => "lead",
            IdKind::Enquiry => "enquiry",
            IdKind::Task => "task",
        };
        f.write_str(name)
    }
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Kind of entity this ID names
            pub const KIND: IdKind = $kind;

            /// Wrap a raw ID string
            #[inline]
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Build the ID for a counter value
            #[inline]
            #[must_use]
            pub fn from_number(n: u64) -> Self {
                Self($kind.format(n))
            }

            /// Counter value encoded in this ID
            #[inline]
            #[must_use]
            pub fn number(&self) -> Option<u64> {
                $kind.parse_number(&self.0)
            }

            /// True until a store has assigned the ID
            #[inline]
            #[must_use]
            pub fn is_unassigned(&self) -> bool {
                self.0.is_empty()
            }

            /// Borrow as `&str`
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

entity_id!(
    /// Lead identifier (`lead01`)
    LeadId,
    IdKind::Lead
);
entity_id!(
    /// Enquiry identifier (`enq001`)
    EnquiryId,
    IdKind::Enquiry
);
entity_id!(
    /// Task identifier (`task1`)
    TaskId,
    IdKind::Task
);

/// Idempotency key for one user action (ULID for sortability)
///
/// Log entries written by a transition carry keys derived from it, so a
/// retried or double-submitted action never appends twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransitionKey(pub Ulid);

impl TransitionKey {
    /// Generate new key
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Key for the n-th log entry produced under this key
    #[must_use]
    pub fn entry_key(&self, index: usize) -> String {
        format!("{}/{}", self.0, index)
    }
}

impl Default for TransitionKey {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransitionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TransitionKey {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn formats_with_per_kind_padding() {
        assert_eq!(IdKind::Lead.format(1), "lead01");
        assert_eq!(IdKind::Lead.format(123), "lead123");
        assert_eq!(IdKind::Enquiry.format(7), "enq007");
        assert_eq!(IdKind::Task.format(1), "task1");
        assert_eq!(IdKind::Task.format(42), "task42");
    }

    #[test]
    fn parse_rejects_foreign_ids() {
        assert_eq!(IdKind::Enquiry.parse_number("enq010"), Some(10));
        assert_eq!(IdKind::Enquiry.parse_number("lead10"), None);
        assert_eq!(IdKind::Task.parse_number("task"), None);
        assert_eq!(IdKind::Task.parse_number("task1a"), None);
    }

    #[test]
    fn typed_ids_know_their_number() {
        let id = EnquiryId::from_number(12);
        assert_eq!(id.as_str(), "enq012");
        assert_eq!(id.number(), Some(12));
        assert!(EnquiryId::default().is_unassigned());
    }

    #[test]
    fn transition_key_entry_keys_are_distinct() {
        let key = TransitionKey::new();
        assert_ne!(key.entry_key(0), key.entry_key(1));
        let parsed: TransitionKey = key.to_string().parse().unwrap();
        assert_eq!(parsed, key);
    }

    proptest! {
        #[test]
        fn prop_formatted_ids_sort_numerically_within_width(a in 0u64..100, b in 0u64..100) {
            // lead ids pad to two digits, so lexical order matches numeric order below 100
            let (la, lb) = (IdKind::Lead.format(a), IdKind::Lead.format(b));
            prop_assert_eq!(a.cmp(&b), la.cmp(&lb));
            prop_assert_eq!(IdKind::Lead.parse_number(&la), Some(a));
        }
    }
}
