use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wrenchbook_core::error::require_text;
use wrenchbook_core::{AggregateId, Document, DomainError, DomainResult, Entity};

wrenchbook_core::typed_id!(
    /// Catalog service identifier.
    ServiceId
);

/// Entity: a service the shop offers (oil change, alignment, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    id: ServiceId,
    code: String,
    name: String,
    description: Option<String>,
    category: String,
    /// Price in smallest currency unit (e.g., cents).
    price: u64,
    estimated_minutes: u32,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Command: RegisterService.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterService {
    pub service_id: ServiceId,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub price: u64,
    pub estimated_minutes: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateService. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateService {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<u64>,
    pub estimated_minutes: Option<u32>,
}

fn normalize_code(raw: &str) -> DomainResult<String> {
    Ok(require_text("code", raw)?.to_uppercase())
}

fn validate_minutes(minutes: u32) -> DomainResult<u32> {
    if minutes == 0 {
        return Err(DomainError::validation(
            "estimated_minutes must be greater than zero",
        ));
    }
    Ok(minutes)
}

impl Service {
    pub fn register(cmd: RegisterService) -> DomainResult<Self> {
        Ok(Self {
            id: cmd.service_id,
            code: normalize_code(&cmd.code)?,
            name: require_text("name", &cmd.name)?,
            description: cmd.description,
            category: require_text("category", &cmd.category)?,
            price: cmd.price,
            estimated_minutes: validate_minutes(cmd.estimated_minutes)?,
            active: true,
            created_at: cmd.occurred_at,
            updated_at: cmd.occurred_at,
        })
    }

    pub fn id_typed(&self) -> ServiceId {
        self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn price(&self) -> u64 {
        self.price
    }

    pub fn estimated_minutes(&self) -> u32 {
        self.estimated_minutes
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn update(&mut self, cmd: UpdateService, at: DateTime<Utc>) -> DomainResult<()> {
        let code = cmd.code.as_deref().map(normalize_code).transpose()?;
        let name = cmd.name.as_deref().map(|n| require_text("name", n)).transpose()?;
        let category = cmd
            .category
            .as_deref()
            .map(|c| require_text("category", c))
            .transpose()?;
        let minutes = cmd.estimated_minutes.map(validate_minutes).transpose()?;

        if let Some(code) = code {
            self.code = code;
        }
        if let Some(name) = name {
            self.name = name;
        }
        if cmd.description.is_some() {
            self.description = cmd.description;
        }
        if let Some(category) = category {
            self.category = category;
        }
        if let Some(price) = cmd.price {
            self.price = price;
        }
        if let Some(minutes) = minutes {
            self.estimated_minutes = minutes;
        }
        self.updated_at = at;
        Ok(())
    }

    pub fn deactivate(&mut self, at: DateTime<Utc>) {
        self.active = false;
        self.updated_at = at;
    }

    /// Case-insensitive match on name, code or category.
    pub fn matches(&self, term: &str) -> bool {
        let needle = term.trim().to_lowercase();
        needle.is_empty()
            || self.name.to_lowercase().contains(&needle)
            || self.code.to_lowercase().contains(&needle)
            || self.category.to_lowercase().contains(&needle)
    }
}

impl Entity for Service {
    type Id = ServiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Document for Service {
    const COLLECTION: &'static str = "services";

    fn key(&self) -> AggregateId {
        self.id.0
    }
}
