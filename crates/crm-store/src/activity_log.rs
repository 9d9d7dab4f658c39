//! Per-enquiry notes and activity history
//!
//! Both lists live on the enquiry document and the store has no append
//! primitive, so an append is read, push, write back. Appends to one enquiry
//! are serialized through a per-enquiry lock; entries whose idempotency key is
//! already present are skipped.

use crate::document::{from_document, Collection, Document, Query};
use crate::error::StoreError;
use crate::repository::LAST_MODIFIED;
use crate::store::{DocumentStore, Subscription};
use crm_core::{ActivityHistoryItem, ActivityType, Clock, Enquiry, EnquiryId, LogEntry, NoteItem};
use dashmap::DashMap;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;

const ACTIVITY_HISTORY: &str = "activityHistory";
const NOTES: &str = "notes";

/// Append-only log over enquiry documents
pub struct ActivityLog {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    locks: DashMap<EnquiryId, Arc<Mutex<()>>>,
}

impl std::fmt::Debug for ActivityLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityLog")
            .field("locks", &self.locks.len())
            .finish_non_exhaustive()
    }
}

impl ActivityLog {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, enquiry_id: &EnquiryId) -> Arc<Mutex<()>> {
        Arc::clone(
            self.locks
                .entry(enquiry_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }

    /// Drop the enquiry's lock once no other append holds or waits on it
    fn release(&self, enquiry_id: &EnquiryId, lock: Arc<Mutex<()>>) {
        drop(lock);
        self.locks
            .remove_if(enquiry_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Enquiries with an append in flight
    #[must_use]
    pub fn locked_enquiries(&self) -> usize {
        self.locks.len()
    }

    async fn load(&self, enquiry_id: &EnquiryId) -> Result<Enquiry, StoreError> {
        let doc = self
            .store
            .get(Collection::Enquiries, enquiry_id.as_str())
            .await?
            .ok_or_else(|| StoreError::NotFound {
                collection: Collection::Enquiries,
                id: enquiry_id.to_string(),
            })?;
        from_document(doc)
    }

    /// Append one entry. Returns `false` if its key was already present.
    pub async fn append(&self, enquiry_id: &EnquiryId, entry: LogEntry) -> Result<bool, StoreError> {
        Ok(self.append_all(enquiry_id, [entry]).await? == 1)
    }

    /// Append entries in order with a single write. Returns how many were new.
    pub async fn append_all<I>(&self, enquiry_id: &EnquiryId, entries: I) -> Result<usize, StoreError>
    where
        I: IntoIterator<Item = LogEntry> + Send,
        I::IntoIter: Send,
    {
        let lock = self.lock_for(enquiry_id);
        let result = {
            let _guard = lock.lock().await;
            self.append_locked(enquiry_id, entries).await
        };
        self.release(enquiry_id, lock);
        result
    }

    async fn append_locked<I>(&self, enquiry_id: &EnquiryId, entries: I) -> Result<usize, StoreError>
    where
        I: IntoIterator<Item = LogEntry> + Send,
        I::IntoIter: Send,
    {
        let mut enquiry = self.load(enquiry_id).await?;
        let (mut notes_changed, mut history_changed) = (false, false);
        let mut appended = 0;

        for entry in entries {
            if let Some(key) = entry.key() {
                if is_logged(&enquiry, key) {
                    tracing::debug!(enquiry = %enquiry_id, key, "duplicate log entry skipped");
                    continue;
                }
            }
            match entry {
                LogEntry::Note(note) => {
                    enquiry.notes.push(note);
                    notes_changed = true;
                }
                LogEntry::Activity(item) => {
                    enquiry.activity_history.push(item);
                    history_changed = true;
                }
            }
            appended += 1;
        }

        if appended == 0 {
            return Ok(0);
        }

        let mut patch = Document::new();
        if notes_changed {
            patch.insert(NOTES.to_string(), serde_json::to_value(&enquiry.notes)?);
        }
        if history_changed {
            patch.insert(
                ACTIVITY_HISTORY.to_string(),
                serde_json::to_value(&enquiry.activity_history)?,
            );
        }
        patch.insert(LAST_MODIFIED.to_string(), json!(self.clock.now()));
        self.store
            .update(Collection::Enquiries, enquiry_id.as_str(), patch)
            .await?;
        Ok(appended)
    }

    /// Activity history in insertion order
    pub async fn history(&self, enquiry_id: &EnquiryId) -> Result<Vec<ActivityHistoryItem>, StoreError> {
        Ok(self.load(enquiry_id).await?.activity_history)
    }

    /// Notes in insertion order
    pub async fn notes(&self, enquiry_id: &EnquiryId) -> Result<Vec<NoteItem>, StoreError> {
        Ok(self.load(enquiry_id).await?.notes)
    }

    pub async fn by_type(
        &self,
        enquiry_id: &EnquiryId,
        activity_type: ActivityType,
    ) -> Result<Vec<ActivityHistoryItem>, StoreError> {
        Ok(self
            .history(enquiry_id)
            .await?
            .into_iter()
            .filter(|item| item.activity_type == activity_type)
            .collect())
    }

    /// Call `callback` with the full history after every write to the enquiry
    pub fn subscribe<F>(&self, enquiry_id: &EnquiryId, callback: F) -> Subscription
    where
        F: Fn(&[ActivityHistoryItem]) + Send + Sync + 'static,
    {
        let id = enquiry_id.clone();
        self.store.subscribe(
            Collection::Enquiries,
            Query::all().eq("enquiryId", enquiry_id.as_str()),
            Arc::new(move |docs: &[Document]| {
                for doc in docs {
                    match from_document::<Enquiry>(doc.clone()) {
                        Ok(enquiry) => callback(&enquiry.activity_history),
                        Err(e) => {
                            tracing::warn!(enquiry = %id, error = %e, "undecodable enquiry in subscription");
                        }
                    }
                }
            }),
        )
    }
}

fn is_logged(enquiry: &Enquiry, key: &str) -> bool {
    enquiry
        .activity_history
        .iter()
        .any(|item| item.key.as_deref() == Some(key))
        || enquiry
            .notes
            .iter()
            .any(|note| note.key.as_deref() == Some(key))
}
