//! Document store interface and live subscriptions
//!
//! The pipeline only needs a small slice of a hosted document database:
//! keyed CRUD with top-level merge, equality queries, an atomic counter and
//! change notifications.

use crate::document::{Collection, Document, Query};
use crate::error::StoreError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Receives the full matching result set after every relevant write
pub type SubscriptionCallback = Arc<dyn Fn(&[Document]) + Send + Sync>;

/// Backend contract
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document; `None` if absent
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError>;

    /// Insert a new document under `id`
    async fn create(&self, collection: Collection, id: &str, doc: Document)
        -> Result<(), StoreError>;

    /// Merge `patch` into the top level of an existing document
    async fn update(&self, collection: Collection, id: &str, patch: Document)
        -> Result<(), StoreError>;

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError>;

    /// Documents matching `query`, ordered by ID
    async fn find(&self, collection: Collection, query: &Query)
        -> Result<Vec<Document>, StoreError>;

    /// Atomically increment a named counter and return the new value
    async fn increment_counter(&self, counter: &str) -> Result<u64, StoreError>;

    /// Push matching documents to `callback` after every write to `collection`
    /// that touches a matching document
    fn subscribe(
        &self,
        collection: Collection,
        query: Query,
        callback: SubscriptionCallback,
    ) -> Subscription;
}

struct Subscriber {
    collection: Collection,
    query: Query,
    callback: SubscriptionCallback,
}

#[derive(Default)]
struct RegistryInner {
    next_id: AtomicU64,
    subscribers: RwLock<HashMap<u64, Subscriber>>,
}

/// Subscriber bookkeeping shared by store implementations
#[derive(Clone, Default)]
pub struct SubscriberRegistry {
    inner: Arc<RegistryInner>,
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("subscribers", &self.len())
            .finish()
    }
}

impl SubscriberRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber
    #[must_use]
    pub fn register(
        &self,
        collection: Collection,
        query: Query,
        callback: SubscriptionCallback,
    ) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers.write().insert(
            id,
            Subscriber {
                collection,
                query,
                callback,
            },
        );
        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Subscribers of `collection` whose query matches any of `touched`
    ///
    /// Returned outside the lock so callbacks may re-enter the store.
    #[must_use]
    pub fn interested(
        &self,
        collection: Collection,
        touched: &[&Document],
    ) -> Vec<(Query, SubscriptionCallback)> {
        self.inner
            .subscribers
            .read()
            .values()
            .filter(|s| s.collection == collection)
            .filter(|s| touched.iter().any(|doc| s.query.matches(doc)))
            .map(|s| (s.query.clone(), Arc::clone(&s.callback)))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.subscribers.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Live subscription handle; dropping it unsubscribes
#[must_use = "dropping a Subscription unsubscribes immediately"]
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<RegistryInner>,
}

impl Subscription {
    /// Stop receiving updates
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.registry.upgrade() {
            inner.subscribers.write().remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::sync::atomic::AtomicUsize;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn drop_unregisters() {
        let registry = SubscriberRegistry::new();
        let sub = registry.register(Collection::Tasks, Query::all(), Arc::new(|_| {}));
        assert_eq!(registry.len(), 1);
        sub.cancel();
        assert!(registry.is_empty());
    }

    #[test]
    fn interest_follows_collection_and_query() {
        let registry = SubscriberRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let _sub = registry.register(
            Collection::Enquiries,
            Query::all().eq("enquiryId", "enq001"),
            Arc::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let matching = doc(json!({"enquiryId": "enq001"}));
        let other = doc(json!({"enquiryId": "enq002"}));
        assert_eq!(registry.interested(Collection::Enquiries, &[&matching]).len(), 1);
        assert!(registry.interested(Collection::Enquiries, &[&other]).is_empty());
        assert!(registry.interested(Collection::Tasks, &[&matching]).is_empty());

        for (_, callback) in registry.interested(Collection::Enquiries, &[&matching]) {
            callback(&[]);
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
