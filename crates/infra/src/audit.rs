//! Append-only audit log of mutating operations.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use wrenchbook_core::{AggregateId, Document, Entity, UserId};

use crate::services::OperationContext;
use crate::store::{DocumentStore, Filter, Repository, StoreError};

wrenchbook_core::typed_id!(
    /// Audit entry identifier.
    AuditEntryId
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditEntryId,
    pub actor: Option<UserId>,
    /// Dotted verb, e.g. `service_order.product_line_added`.
    pub action: String,
    pub entity_type: String,
    pub entity_id: AggregateId,
    pub details: JsonValue,
    pub recorded_at: DateTime<Utc>,
}

impl Entity for AuditEntry {
    type Id = AuditEntryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Document for AuditEntry {
    const COLLECTION: &'static str = "audit_log";

    fn key(&self) -> AggregateId {
        self.id.0
    }
}

/// Fire-and-forget writer for [`AuditEntry`] records.
///
/// A failed audit write is logged and never fails the operation being audited.
#[derive(Clone)]
pub struct AuditTrail {
    entries: Repository<AuditEntry>,
}

impl AuditTrail {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            entries: Repository::new(store),
        }
    }

    pub async fn record(
        &self,
        ctx: &OperationContext,
        action: &str,
        entity_type: &str,
        entity_id: AggregateId,
        details: JsonValue,
    ) {
        let entry = AuditEntry {
            id: AuditEntryId::generate(),
            actor: ctx.actor,
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id,
            details,
            recorded_at: ctx.at,
        };
        if let Err(e) = self.entries.save(&entry).await {
            tracing::warn!(
                action,
                entity_type,
                entity_id = %entity_id,
                error = %e,
                "audit entry could not be written"
            );
        }
    }

    /// Entries for one entity (or all, when `entity_id` is `None`), newest first.
    pub async fn list(&self, entity_id: Option<AggregateId>) -> Result<Vec<AuditEntry>, StoreError> {
        let filters: Vec<Filter> = entity_id
            .map(|id| vec![Filter::eq("entity_id", id)])
            .unwrap_or_default();
        let mut entries = self.entries.find(&filters).await?;
        entries.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        Ok(entries)
    }
}
