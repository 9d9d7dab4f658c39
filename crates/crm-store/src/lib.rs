//! CRM Store - persistence adapter for the lead pipeline
//!
//! Provides:
//! - The [`DocumentStore`] contract and an in-memory implementation
//! - Sequential, collision-free ID allocation with bounded retry
//! - Typed repositories that stamp `added`/`lastModified`
//! - The per-enquiry activity/note log
//! - Field-level patch computation
//!
//! # Example
//!
//! ```rust,ignore
//! use crm_store::prelude::*;
//!
//! let store: Arc<dyn DocumentStore> = Arc::new(InMemoryStore::new());
//! let ids = IdGenerator::new(Arc::clone(&store));
//! assert_eq!(ids.next_id(IdKind::Lead).await?, "lead01");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod activity_log;
pub mod document;
pub mod error;
pub mod id_gen;
pub mod memory;
pub mod patch;
pub mod repository;
pub mod store;

pub use activity_log::ActivityLog;
pub use document::{from_document, to_document, Collection, Document, Query};
pub use error::StoreError;
pub use id_gen::{IdGenerator, RetryPolicy};
pub use memory::InMemoryStore;
pub use patch::diff;
pub use repository::{Entity, Repository, LAST_MODIFIED};
pub use store::{DocumentStore, Subscription, SubscriptionCallback, SubscriberRegistry};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for store users
    pub use crate::{
        ActivityLog, Collection, Document, DocumentStore, IdGenerator, InMemoryStore, Query,
        Repository, RetryPolicy, StoreError, Subscription,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
