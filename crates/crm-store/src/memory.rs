//! In-process document store
//!
//! Backs tests, the simulator and single-node deployments. Each collection is
//! a `DashMap`; counters increment under the shard lock, so they never
//! conflict.

use crate::document::{id_order, Collection, Document, Query};
use crate::error::StoreError;
use crate::store::{DocumentStore, Subscription, SubscriptionCallback, SubscriberRegistry};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Document store held in memory
#[derive(Debug, Default)]
pub struct InMemoryStore {
    leads: DashMap<String, Document>,
    enquiries: DashMap<String, Document>,
    tasks: DashMap<String, Document>,
    counters: DashMap<String, u64>,
    subscribers: SubscriberRegistry,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn collection(&self, collection: Collection) -> &DashMap<String, Document> {
        match collection {
            Collection::Leads => &self.leads,
            Collection::Enquiries => &self.enquiries,
            Collection::Tasks => &self.tasks,
        }
    }

    /// Current value of a counter (0 if never incremented)
    #[must_use]
    pub fn counter(&self, counter: &str) -> u64 {
        self.counters.get(counter).map_or(0, |v| *v)
    }

    /// Number of documents in `collection`
    #[must_use]
    pub fn len(&self, collection: Collection) -> usize {
        self.collection(collection).len()
    }

    fn query(&self, collection: Collection, query: &Query) -> Vec<Document> {
        let mut found: Vec<(String, Document)> = self
            .collection(collection)
            .iter()
            .filter(|entry| query.matches(entry.value()))
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        found.sort_by(|(a, _), (b, _)| id_order(a).cmp(&id_order(b)));
        found.into_iter().map(|(_, doc)| doc).collect()
    }

    /// Push to subscribers; must be called with no map guard held
    fn notify(&self, collection: Collection, touched: &[&Document]) {
        let interested = self.subscribers.interested(collection, touched);
        if interested.is_empty() {
            return;
        }
        tracing::trace!(%collection, subscribers = interested.len(), "notifying subscribers");
        for (query, callback) in interested {
            let snapshot = self.query(collection, &query);
            callback(&snapshot);
        }
    }
}

#[async_trait::async_trait]
impl DocumentStore for InMemoryStore {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self
            .collection(collection)
            .get(id)
            .map(|doc| doc.value().clone()))
    }

    async fn create(
        &self,
        collection: Collection,
        id: &str,
        doc: Document,
    ) -> Result<(), StoreError> {
        match self.collection(collection).entry(id.to_string()) {
            Entry::Occupied(_) => {
                return Err(StoreError::AlreadyExists {
                    collection,
                    id: id.to_string(),
                })
            }
            Entry::Vacant(slot) => {
                slot.insert(doc.clone());
            }
        }
        self.notify(collection, &[&doc]);
        Ok(())
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        patch: Document,
    ) -> Result<(), StoreError> {
        let (before, after) = {
            let mut doc = self
                .collection(collection)
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound {
                    collection,
                    id: id.to_string(),
                })?;
            let before = doc.value().clone();
            for (field, value) in patch {
                doc.insert(field, value);
            }
            (before, doc.value().clone())
        };
        self.notify(collection, &[&before, &after]);
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        let (_, removed) =
            self.collection(collection)
                .remove(id)
                .ok_or_else(|| StoreError::NotFound {
                    collection,
                    id: id.to_string(),
                })?;
        self.notify(collection, &[&removed]);
        Ok(())
    }

    async fn find(
        &self,
        collection: Collection,
        query: &Query,
    ) -> Result<Vec<Document>, StoreError> {
        Ok(self.query(collection, query))
    }

    async fn increment_counter(&self, counter: &str) -> Result<u64, StoreError> {
        let mut value = self.counters.entry(counter.to_string()).or_insert(0);
        *value += 1;
        Ok(*value)
    }

    fn subscribe(
        &self,
        collection: Collection,
        query: Query,
        callback: SubscriptionCallback,
    ) -> Subscription {
        self.subscribers.register(collection, query, callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn crud_round() {
        let store = InMemoryStore::new();
        store
            .create(Collection::Leads, "lead01", doc(json!({"name": "Kiran", "state": "fresh"})))
            .await
            .unwrap();
        assert!(matches!(
            store
                .create(Collection::Leads, "lead01", Document::new())
                .await,
            Err(StoreError::AlreadyExists { .. })
        ));

        store
            .update(Collection::Leads, "lead01", doc(json!({"state": "open"})))
            .await
            .unwrap();
        let lead = store.get(Collection::Leads, "lead01").await.unwrap().unwrap();
        assert_eq!(lead["name"], "Kiran");
        assert_eq!(lead["state"], "open");

        store.delete(Collection::Leads, "lead01").await.unwrap();
        assert!(store.get(Collection::Leads, "lead01").await.unwrap().is_none());
        assert!(store
            .update(Collection::Leads, "lead01", Document::new())
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn find_filters_and_orders_by_id() {
        let store = InMemoryStore::new();
        for (id, enquiry) in [("task10", "enq001"), ("task2", "enq001"), ("task3", "enq002")] {
            store
                .create(Collection::Tasks, id, doc(json!({"taskId": id, "enquiryId": enquiry})))
                .await
                .unwrap();
        }
        let found = store
            .find(Collection::Tasks, &Query::all().eq("enquiryId", "enq001"))
            .await
            .unwrap();
        let ids: Vec<_> = found.iter().map(|d| d["taskId"].clone()).collect();
        assert_eq!(ids, vec![json!("task2"), json!("task10")]);
    }

    #[tokio::test]
    async fn subscribers_see_every_matching_write() {
        let store = InMemoryStore::new();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = store.subscribe(
            Collection::Enquiries,
            Query::all().eq("enquiryId", "enq001"),
            Arc::new(move |docs: &[Document]| sink.lock().push(docs.len())),
        );

        store
            .create(Collection::Enquiries, "enq001", doc(json!({"enquiryId": "enq001"})))
            .await
            .unwrap();
        store
            .create(Collection::Enquiries, "enq002", doc(json!({"enquiryId": "enq002"})))
            .await
            .unwrap();
        store
            .update(Collection::Enquiries, "enq001", doc(json!({"tag": "hot"})))
            .await
            .unwrap();
        assert_eq!(*seen.lock(), vec![1, 1]);

        drop(sub);
        store
            .update(Collection::Enquiries, "enq001", doc(json!({"tag": "cold"})))
            .await
            .unwrap();
        assert_eq!(seen.lock().len(), 2);
    }

    #[tokio::test]
    async fn counters_start_at_one() {
        let store = InMemoryStore::new();
        assert_eq!(store.increment_counter("leads").await.unwrap(), 1);
        assert_eq!(store.increment_counter("leads").await.unwrap(), 2);
        assert_eq!(store.increment_counter("tasks").await.unwrap(), 1);
        assert_eq!(store.counter("leads"), 2);
    }
}
