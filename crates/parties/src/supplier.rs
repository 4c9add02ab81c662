use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wrenchbook_core::error::require_text;
use wrenchbook_core::{AggregateId, Document, DomainError, DomainResult, Entity};

use crate::client::{Address, ContactInfo, non_blank, normalize_tax_id};

wrenchbook_core::typed_id!(
    /// Supplier identifier.
    SupplierId
);

/// Entity: Supplier (a company the shop buys parts from).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    id: SupplierId,
    legal_name: String,
    trade_name: Option<String>,
    tax_id: String,
    state_registration: Option<String>,
    contact: ContactInfo,
    address: Address,
    contact_person: Option<String>,
    notes: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Command: RegisterSupplier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterSupplier {
    pub supplier_id: SupplierId,
    pub legal_name: String,
    pub trade_name: Option<String>,
    pub tax_id: String,
    pub state_registration: Option<String>,
    pub contact: ContactInfo,
    pub address: Address,
    pub contact_person: Option<String>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl Supplier {
    pub fn register(cmd: RegisterSupplier) -> DomainResult<Self> {
        let legal_name = require_text("legal_name", &cmd.legal_name)?;
        let tax_id = normalize_tax_id(&cmd.tax_id);
        if tax_id.is_empty() {
            return Err(DomainError::validation("tax_id cannot be empty"));
        }

        Ok(Self {
            id: cmd.supplier_id,
            legal_name,
            trade_name: non_blank(cmd.trade_name.as_deref()),
            tax_id,
            state_registration: non_blank(cmd.state_registration.as_deref()),
            contact: cmd.contact.normalized()?,
            address: cmd.address,
            contact_person: non_blank(cmd.contact_person.as_deref()),
            notes: non_blank(cmd.notes.as_deref()),
            active: true,
            created_at: cmd.occurred_at,
            updated_at: cmd.occurred_at,
        })
    }

    pub fn id_typed(&self) -> SupplierId {
        self.id
    }

    pub fn legal_name(&self) -> &str {
        &self.legal_name
    }

    pub fn trade_name(&self) -> Option<&str> {
        self.trade_name.as_deref()
    }

    /// Trade name when there is one, the legal name otherwise.
    pub fn display_name(&self) -> &str {
        self.trade_name.as_deref().unwrap_or(&self.legal_name)
    }

    pub fn tax_id(&self) -> &str {
        &self.tax_id
    }

    pub fn contact(&self) -> &ContactInfo {
        &self.contact
    }

    pub fn contact_person(&self) -> Option<&str> {
        self.contact_person.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Case-insensitive match on either name or the tax id.
    pub fn matches(&self, term: &str) -> bool {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        let digits = normalize_tax_id(&needle);

        self.legal_name.to_lowercase().contains(&needle)
            || self
                .trade_name
                .as_deref()
                .is_some_and(|n| n.to_lowercase().contains(&needle))
            || (!digits.is_empty() && self.tax_id.contains(&digits))
    }
}

impl Entity for Supplier {
    type Id = SupplierId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Document for Supplier {
    const COLLECTION: &'static str = "suppliers";

    fn key(&self) -> AggregateId {
        self.id.0
    }
}
