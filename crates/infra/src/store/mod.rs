//! Document persistence.
//!
//! Entities are stored whole, as JSON documents keyed by collection and id.
//! Writes are last-write-wins upserts; there are no cross-document
//! transactions.

pub mod in_memory;
pub mod postgres;
pub mod repository;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use thiserror::Error;

use std::sync::Arc;

use wrenchbook_core::AggregateId;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use repository::Repository;

/// Storage failure. Never carries domain meaning.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("document (de)serialization failed: {0}")]
    Serialization(String),

    #[error("storage constraint violated: {0}")]
    Constraint(String),

    #[error("storage operation failed: {0}")]
    Backend(String),
}

/// Predicate over a top-level field of a stored document.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Field equals the given JSON value.
    Eq { field: &'static str, value: JsonValue },
    /// Field holds an RFC 3339 timestamp within `[from, to)`.
    Between {
        field: &'static str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
}

impl Filter {
    pub fn eq(field: &'static str, value: impl serde::Serialize) -> Self {
        Filter::Eq {
            field,
            value: serde_json::to_value(value).unwrap_or(JsonValue::Null),
        }
    }

    pub fn between(field: &'static str, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Filter::Between { field, from, to }
    }

    /// Evaluate against an in-memory document.
    pub fn matches(&self, doc: &JsonValue) -> bool {
        match self {
            Filter::Eq { field, value } => doc.get(*field) == Some(value),
            Filter::Between { field, from, to } => doc
                .get(*field)
                .and_then(JsonValue::as_str)
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|at| at.with_timezone(&Utc))
                .is_some_and(|at| at >= *from && at < *to),
        }
    }
}

/// Keyed JSON document storage.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: AggregateId) -> Result<Option<JsonValue>, StoreError>;

    async fn upsert(&self, collection: &str, id: AggregateId, body: JsonValue) -> Result<(), StoreError>;

    /// Returns whether a document was removed.
    async fn delete(&self, collection: &str, id: AggregateId) -> Result<bool, StoreError>;

    /// All documents of `collection` matching every filter.
    async fn find(&self, collection: &str, filters: &[Filter]) -> Result<Vec<JsonValue>, StoreError>;
}

/// Named monotonically increasing sequences.
#[async_trait::async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically increment `name` and return the new value (first call yields 1).
    async fn next(&self, name: &str) -> Result<u64, StoreError>;
}

#[async_trait::async_trait]
impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore + ?Sized,
{
    async fn get(&self, collection: &str, id: AggregateId) -> Result<Option<JsonValue>, StoreError> {
        (**self).get(collection, id).await
    }

    async fn upsert(&self, collection: &str, id: AggregateId, body: JsonValue) -> Result<(), StoreError> {
        (**self).upsert(collection, id, body).await
    }

    async fn delete(&self, collection: &str, id: AggregateId) -> Result<bool, StoreError> {
        (**self).delete(collection, id).await
    }

    async fn find(&self, collection: &str, filters: &[Filter]) -> Result<Vec<JsonValue>, StoreError> {
        (**self).find(collection, filters).await
    }
}
