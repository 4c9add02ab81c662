use std::marker::PhantomData;
use std::sync::Arc;

use wrenchbook_core::{AggregateId, Document};

use super::{DocumentStore, Filter, StoreError};

/// Typed view over one collection of a [`DocumentStore`].
pub struct Repository<T> {
    store: Arc<dyn DocumentStore>,
    _doc: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _doc: PhantomData,
        }
    }
}

fn decode<T: Document>(body: serde_json::Value) -> Result<T, StoreError> {
    serde_json::from_value(body)
        .map_err(|e| StoreError::Serialization(format!("{}: {e}", T::COLLECTION)))
}

impl<T: Document> Repository<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _doc: PhantomData,
        }
    }

    pub async fn get(&self, id: AggregateId) -> Result<Option<T>, StoreError> {
        match self.store.get(T::COLLECTION, id).await? {
            Some(body) => decode(body).map(Some),
            None => Ok(None),
        }
    }

    pub async fn save(&self, doc: &T) -> Result<(), StoreError> {
        let body = serde_json::to_value(doc)
            .map_err(|e| StoreError::Serialization(format!("{}: {e}", T::COLLECTION)))?;
        self.store.upsert(T::COLLECTION, doc.key(), body).await
    }

    pub async fn delete(&self, id: AggregateId) -> Result<bool, StoreError> {
        self.store.delete(T::COLLECTION, id).await
    }

    pub async fn find(&self, filters: &[Filter]) -> Result<Vec<T>, StoreError> {
        self.store
            .find(T::COLLECTION, filters)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    pub async fn all(&self) -> Result<Vec<T>, StoreError> {
        self.find(&[]).await
    }

    pub async fn find_one(&self, filters: &[Filter]) -> Result<Option<T>, StoreError> {
        Ok(self.find(filters).await?.into_iter().next())
    }
}
