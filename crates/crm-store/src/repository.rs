//! Typed repositories over the document store
//!
//! Every write goes through here so `added`/`lastModified` are always
//! stamped from the same clock.

use crate::document::{from_document, to_document, Collection, Document, Query};
use crate::error::StoreError;
use crate::id_gen::IdGenerator;
use crate::store::DocumentStore;
use crm_core::{Clock, Enquiry, IdKind, Lead, Task};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::marker::PhantomData;
use std::sync::Arc;

/// Name of the modification stamp field
pub const LAST_MODIFIED: &str = "lastModified";

/// A record kind with a generated ID
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: Collection;
    const KIND: IdKind;
    /// Field holding the ID
    const ID_FIELD: &'static str;

    fn id(&self) -> &str;

    /// Set the ID and both timestamps of a record about to be created
    fn assign(&mut self, id: String, now: i64);
}

impl Entity for Lead {
    const COLLECTION: Collection = Collection::Leads;
    const KIND: IdKind = IdKind::Lead;
    const ID_FIELD: &'static str = "leadId";

    fn id(&self) -> &str {
        self.lead_id.as_str()
    }

    fn assign(&mut self, id: String, now: i64) {
        self.lead_id = id.into();
        self.added = now;
        self.last_modified = Some(now);
    }
}

impl Entity for Enquiry {
    const COLLECTION: Collection = Collection::Enquiries;
    const KIND: IdKind = IdKind::Enquiry;
    const ID_FIELD: &'static str = "enquiryId";

    fn id(&self) -> &str {
        self.enquiry_id.as_str()
    }

    fn assign(&mut self, id: String, now: i64) {
        self.enquiry_id = id.into();
        self.added = now;
        self.last_modified = Some(now);
    }
}

impl Entity for Task {
    const COLLECTION: Collection = Collection::Tasks;
    const KIND: IdKind = IdKind::Task;
    const ID_FIELD: &'static str = "taskId";

    fn id(&self) -> &str {
        self.task_id.as_str()
    }

    fn assign(&mut self, id: String, now: i64) {
        self.task_id = id.into();
        self.added = now;
        self.last_modified = Some(now);
    }
}

/// CRUD for one entity kind
pub struct Repository<T: Entity> {
    store: Arc<dyn DocumentStore>,
    ids: IdGenerator,
    clock: Arc<dyn Clock>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            ids: self.ids.clone(),
            clock: Arc::clone(&self.clock),
            _marker: PhantomData,
        }
    }
}

impl<T: Entity> std::fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("collection", &T::COLLECTION)
            .finish_non_exhaustive()
    }
}

impl<T: Entity> Repository<T> {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, ids: IdGenerator, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            ids,
            clock,
            _marker: PhantomData,
        }
    }

    /// Fetch by ID; a missing record is `None`
    pub async fn get_by_id(&self, id: &str) -> Result<Option<T>, StoreError> {
        self.store
            .get(T::COLLECTION, id)
            .await?
            .map(from_document)
            .transpose()
    }

    /// Fetch by ID; a missing record is [`StoreError::NotFound`]
    pub async fn require(&self, id: &str) -> Result<T, StoreError> {
        self.get_by_id(id).await?.ok_or_else(|| StoreError::NotFound {
            collection: T::COLLECTION,
            id: id.to_string(),
        })
    }

    /// Allocate an ID, stamp timestamps and persist. Returns the stored record.
    pub async fn create(&self, mut record: T) -> Result<T, StoreError> {
        let id = self.ids.next_id(T::KIND).await?;
        record.assign(id, self.clock.now());
        let doc = to_document(&record)?;
        self.store.create(T::COLLECTION, record.id(), doc).await?;
        tracing::debug!(collection = %T::COLLECTION, id = record.id(), "created");
        Ok(record)
    }

    /// Merge `patch` and stamp `lastModified`. Returns the stamp.
    pub async fn update(&self, id: &str, mut patch: Document) -> Result<i64, StoreError> {
        let now = self.clock.now();
        patch.insert(LAST_MODIFIED.to_string(), json!(now));
        self.store.update(T::COLLECTION, id, patch).await?;
        Ok(now)
    }

    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.store.delete(T::COLLECTION, id).await
    }

    pub async fn find(&self, query: &Query) -> Result<Vec<T>, StoreError> {
        self.store
            .find(T::COLLECTION, query)
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }
}
