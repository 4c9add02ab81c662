//! Postgres-backed document store.
//!
//! Documents live in one JSONB table keyed by `(collection, id)`; counters in
//! a separate table incremented with a single upsert statement.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique / foreign key / check violation) | `23505` / `23503` / `23514` | `Constraint` |
//! | Database (other) | Any other | `Backend` |
//! | PoolClosed, PoolTimedOut, Io | N/A | `Unavailable` |
//! | Other | N/A | `Backend` |

use std::sync::Arc;

use serde_json::Value as JsonValue;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::{Span, instrument};

use wrenchbook_core::AggregateId;

use super::{CounterStore, DocumentStore, Filter, StoreError};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS documents (
        collection TEXT NOT NULL,
        id UUID NOT NULL,
        body JSONB NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        PRIMARY KEY (collection, id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS counters (
        name TEXT PRIMARY KEY,
        value BIGINT NOT NULL CHECK (value > 0)
    )
    "#,
];

/// Postgres-backed document + counter store.
///
/// `Send + Sync`; all statements go through the shared SQLx pool.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    #[instrument(skip(database_url), err)]
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }

    #[instrument(
        skip(self),
        fields(operation = tracing::field::Empty),
        err
    )]
    pub async fn get_document(
        &self,
        collection: &str,
        id: AggregateId,
    ) -> Result<Option<JsonValue>, StoreError> {
        Span::current().record("operation", "get_document");

        let row = sqlx::query("SELECT body FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_document", e))?;

        row.map(|r| r.try_get::<JsonValue, _>("body"))
            .transpose()
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    #[instrument(
        skip(self, body),
        fields(operation = tracing::field::Empty),
        err
    )]
    pub async fn upsert_document(
        &self,
        collection: &str,
        id: AggregateId,
        body: JsonValue,
    ) -> Result<(), StoreError> {
        Span::current().record("operation", "upsert_document");

        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, body)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id)
            DO UPDATE SET body = EXCLUDED.body, updated_at = NOW()
            "#,
        )
        .bind(collection)
        .bind(id.as_uuid())
        .bind(body)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_document", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    pub async fn delete_document(&self, collection: &str, id: AggregateId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_document", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(
        skip(self, filters),
        fields(filter_count = filters.len(), document_count = tracing::field::Empty),
        err
    )]
    pub async fn find_documents(
        &self,
        collection: &str,
        filters: &[Filter],
    ) -> Result<Vec<JsonValue>, StoreError> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT body FROM documents WHERE collection = ");
        qb.push_bind(collection.to_string());

        // Field names are bound as parameters, never interpolated.
        for filter in filters {
            match filter {
                Filter::Eq { field, value } => {
                    qb.push(" AND body -> ");
                    qb.push_bind(*field);
                    qb.push(" = ");
                    qb.push_bind(value.clone());
                }
                Filter::Between { field, from, to } => {
                    qb.push(" AND (body ->> ");
                    qb.push_bind(*field);
                    qb.push(")::timestamptz >= ");
                    qb.push_bind(*from);
                    qb.push(" AND (body ->> ");
                    qb.push_bind(*field);
                    qb.push(")::timestamptz < ");
                    qb.push_bind(*to);
                }
            }
        }
        qb.push(" ORDER BY id ASC");

        let rows = qb
            .build()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_documents", e))?;

        let docs = rows
            .into_iter()
            .map(|r| r.try_get::<JsonValue, _>("body"))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        Span::current().record("document_count", docs.len());
        Ok(docs)
    }

    #[instrument(skip(self), err)]
    pub async fn next_value(&self, name: &str) -> Result<u64, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO counters (name, value)
            VALUES ($1, 1)
            ON CONFLICT (name)
            DO UPDATE SET value = counters.value + 1
            RETURNING value
            "#,
        )
        .bind(name)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("next_counter", e))?;

        let value: i64 = row
            .try_get("value")
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        u64::try_from(value).map_err(|_| StoreError::Backend(format!("counter {name} is negative")))
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") | Some("23503") | Some("23514") => StoreError::Constraint(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("connection pool unavailable in {}", operation))
        }
        sqlx::Error::Io(e) => StoreError::Unavailable(format!("io error in {}: {}", operation, e)),
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

#[async_trait::async_trait]
impl DocumentStore for PostgresStore {
    async fn get(&self, collection: &str, id: AggregateId) -> Result<Option<JsonValue>, StoreError> {
        self.get_document(collection, id).await
    }

    async fn upsert(&self, collection: &str, id: AggregateId, body: JsonValue) -> Result<(), StoreError> {
        self.upsert_document(collection, id, body).await
    }

    async fn delete(&self, collection: &str, id: AggregateId) -> Result<bool, StoreError> {
        self.delete_document(collection, id).await
    }

    async fn find(&self, collection: &str, filters: &[Filter]) -> Result<Vec<JsonValue>, StoreError> {
        self.find_documents(collection, filters).await
    }
}

#[async_trait::async_trait]
impl CounterStore for PostgresStore {
    async fn next(&self, name: &str) -> Result<u64, StoreError> {
        self.next_value(name).await
    }
}
