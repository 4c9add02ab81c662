use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wrenchbook_core::error::require_text;
use wrenchbook_core::{AggregateId, Document, DomainResult, Entity};

wrenchbook_core::typed_id!(
    /// Staff member identifier.
    StaffId
);

/// What a staff member does in the shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaffRole {
    Mechanic,
    Attendant,
    Manager,
}

/// Entity: StaffMember (mechanics and front-desk staff assigned to work).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffMember {
    id: StaffId,
    name: String,
    role: StaffRole,
    phone: Option<String>,
    email: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Command: RegisterStaff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterStaff {
    pub staff_id: StaffId,
    pub name: String,
    pub role: StaffRole,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl StaffMember {
    pub fn register(cmd: RegisterStaff) -> DomainResult<Self> {
        Ok(Self {
            id: cmd.staff_id,
            name: require_text("name", &cmd.name)?,
            role: cmd.role,
            phone: cmd.phone,
            email: cmd.email.map(|e| e.trim().to_lowercase()),
            active: true,
            created_at: cmd.occurred_at,
            updated_at: cmd.occurred_at,
        })
    }

    pub fn id_typed(&self) -> StaffId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> StaffRole {
        self.role
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn deactivate(&mut self, at: DateTime<Utc>) {
        self.active = false;
        self.updated_at = at;
    }
}

impl Entity for StaffMember {
    type Id = StaffId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Document for StaffMember {
    const COLLECTION: &'static str = "staff";

    fn key(&self) -> AggregateId {
        self.id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_requires_name() {
        let cmd = RegisterStaff {
            staff_id: StaffId::generate(),
            name: String::new(),
            role: StaffRole::Mechanic,
            phone: None,
            email: None,
            occurred_at: Utc::now(),
        };
        assert!(StaffMember::register(cmd).is_err());
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(StaffRole::Attendant).unwrap(),
            serde_json::json!("attendant")
        );
    }
}
