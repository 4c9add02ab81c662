use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value as JsonValue;

use wrenchbook_core::AggregateId;

use super::{CounterStore, DocumentStore, Filter, StoreError};

/// In-memory document store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    documents: RwLock<HashMap<(String, AggregateId), JsonValue>>,
    counters: RwLock<HashMap<String, u64>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("in-memory store lock poisoned".to_string())
}

#[async_trait::async_trait]
impl DocumentStore for InMemoryStore {
    async fn get(&self, collection: &str, id: AggregateId) -> Result<Option<JsonValue>, StoreError> {
        let map = self.documents.read().map_err(|_| poisoned())?;
        Ok(map.get(&(collection.to_string(), id)).cloned())
    }

    async fn upsert(&self, collection: &str, id: AggregateId, body: JsonValue) -> Result<(), StoreError> {
        let mut map = self.documents.write().map_err(|_| poisoned())?;
        map.insert((collection.to_string(), id), body);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: AggregateId) -> Result<bool, StoreError> {
        let mut map = self.documents.write().map_err(|_| poisoned())?;
        Ok(map.remove(&(collection.to_string(), id)).is_some())
    }

    async fn find(&self, collection: &str, filters: &[Filter]) -> Result<Vec<JsonValue>, StoreError> {
        let map = self.documents.read().map_err(|_| poisoned())?;
        let mut hits: Vec<(&AggregateId, &JsonValue)> = map
            .iter()
            .filter(|((c, _), doc)| c == collection && filters.iter().all(|f| f.matches(doc)))
            .map(|((_, id), doc)| (id, doc))
            .collect();
        // v7 ids sort by creation time; keeps results stable across calls.
        hits.sort_by_key(|(id, _)| **id);
        Ok(hits.into_iter().map(|(_, doc)| doc.clone()).collect())
    }
}

#[async_trait::async_trait]
impl CounterStore for InMemoryStore {
    async fn next(&self, name: &str) -> Result<u64, StoreError> {
        let mut counters = self.counters.write().map_err(|_| poisoned())?;
        let value = counters.entry(name.to_string()).or_insert(0);
        *value += 1;
        Ok(*value)
    }
}
