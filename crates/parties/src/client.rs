use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wrenchbook_core::error::require_text;
use wrenchbook_core::{AggregateId, Document, DomainError, DomainResult, Entity};

wrenchbook_core::typed_id!(
    /// Client identifier.
    ClientId
);

/// Client kind: private individual or company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientKind {
    Individual,
    Company,
}

/// Contact information for a client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub email: Option<String>,
}

impl ContactInfo {
    pub(crate) fn normalized(&self) -> DomainResult<Self> {
        let email = match self.email.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(e) if !e.contains('@') => {
                return Err(DomainError::validation("email must contain '@'"));
            }
            Some(e) => Some(e.to_lowercase()),
        };

        Ok(Self {
            phone: non_blank(self.phone.as_deref()),
            mobile: non_blank(self.mobile.as_deref()),
            email,
        })
    }
}

/// Postal address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: Option<String>,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
}

/// Reduce a tax document number to its alphanumeric characters.
///
/// Formatting punctuation (`123.456.789-00`) is not significant for uniqueness.
pub fn normalize_tax_id(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Entity: Client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    id: ClientId,
    name: String,
    tax_id: String,
    kind: ClientKind,
    contact: ContactInfo,
    address: Address,
    notes: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Command: RegisterClient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterClient {
    pub client_id: ClientId,
    pub name: String,
    pub tax_id: String,
    pub kind: ClientKind,
    pub contact: ContactInfo,
    pub address: Address,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateClient. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateClient {
    pub name: Option<String>,
    pub tax_id: Option<String>,
    pub kind: Option<ClientKind>,
    pub contact: Option<ContactInfo>,
    pub address: Option<Address>,
    pub notes: Option<String>,
}

impl Client {
    pub fn register(cmd: RegisterClient) -> DomainResult<Self> {
        let name = require_text("name", &cmd.name)?;
        let tax_id = normalize_tax_id(&cmd.tax_id);
        if tax_id.is_empty() {
            return Err(DomainError::validation("tax_id cannot be empty"));
        }

        Ok(Self {
            id: cmd.client_id,
            name,
            tax_id,
            kind: cmd.kind,
            contact: cmd.contact.normalized()?,
            address: cmd.address,
            notes: non_blank(cmd.notes.as_deref()),
            active: true,
            created_at: cmd.occurred_at,
            updated_at: cmd.occurred_at,
        })
    }

    pub fn id_typed(&self) -> ClientId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tax_id(&self) -> &str {
        &self.tax_id
    }

    pub fn kind(&self) -> ClientKind {
        self.kind
    }

    pub fn contact(&self) -> &ContactInfo {
        &self.contact
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
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

    /// Apply a partial update. Validation runs before anything is changed.
    pub fn update(&mut self, cmd: UpdateClient, at: DateTime<Utc>) -> DomainResult<()> {
        let name = cmd.name.as_deref().map(|n| require_text("name", n)).transpose()?;
        let tax_id = match cmd.tax_id.as_deref() {
            Some(raw) => {
                let normalized = normalize_tax_id(raw);
                if normalized.is_empty() {
                    return Err(DomainError::validation("tax_id cannot be empty"));
                }
                Some(normalized)
            }
            None => None,
        };
        let contact = cmd.contact.map(|c| c.normalized()).transpose()?;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(tax_id) = tax_id {
            self.tax_id = tax_id;
        }
        if let Some(kind) = cmd.kind {
            self.kind = kind;
        }
        if let Some(contact) = contact {
            self.contact = contact;
        }
        if let Some(address) = cmd.address {
            self.address = address;
        }
        if let Some(notes) = cmd.notes {
            self.notes = non_blank(Some(notes.as_str()));
        }
        self.updated_at = at;
        Ok(())
    }

    /// Soft delete: the record stays for history but no longer shows in listings.
    pub fn deactivate(&mut self, at: DateTime<Utc>) {
        self.active = false;
        self.updated_at = at;
    }

    /// Case-insensitive match on name, tax id, email, or phone numbers.
    pub fn matches(&self, term: &str) -> bool {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        let digits = normalize_tax_id(&needle);

        self.name.to_lowercase().contains(&needle)
            || (!digits.is_empty() && self.tax_id.contains(&digits))
            || self
                .contact
                .email
                .as_deref()
                .is_some_and(|e| e.contains(&needle))
            || [&self.contact.phone, &self.contact.mobile]
                .into_iter()
                .flatten()
                .any(|p| p.contains(&needle))
    }
}

impl Entity for Client {
    type Id = ClientId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Document for Client {
    const COLLECTION: &'static str = "clients";

    fn key(&self) -> AggregateId {
        self.id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn register_cmd() -> RegisterClient {
        RegisterClient {
            client_id: ClientId::generate(),
            name: "  Maria Souza ".to_string(),
            tax_id: "123.456.789-09".to_string(),
            kind: ClientKind::Individual,
            contact: ContactInfo {
                phone: Some("1133334444".to_string()),
                mobile: None,
                email: Some("Maria@Example.COM".to_string()),
            },
            address: Address::default(),
            notes: None,
            occurred_at: test_time(),
        }
    }

    #[test]
    fn register_normalizes_fields() {
        let client = Client::register(register_cmd()).unwrap();
        assert_eq!(client.name(), "Maria Souza");
        assert_eq!(client.tax_id(), "12345678909");
        assert_eq!(client.contact().email.as_deref(), Some("maria@example.com"));
        assert!(client.is_active());
    }

    #[test]
    fn register_rejects_blank_name_and_tax_id() {
        let mut cmd = register_cmd();
        cmd.name = " ".to_string();
        assert!(matches!(Client::register(cmd), Err(DomainError::Validation(_))));

        let mut cmd = register_cmd();
        cmd.tax_id = "..-".to_string();
        assert!(matches!(Client::register(cmd), Err(DomainError::Validation(_))));
    }

    #[test]
    fn register_rejects_malformed_email() {
        let mut cmd = register_cmd();
        cmd.contact.email = Some("nobody".to_string());
        assert!(matches!(Client::register(cmd), Err(DomainError::Validation(_))));
    }

    #[test]
    fn failed_update_leaves_client_unchanged() {
        let mut client = Client::register(register_cmd()).unwrap();
        let before = client.clone();

        let result = client.update(
            UpdateClient {
                name: Some("New Name".to_string()),
                contact: Some(ContactInfo {
                    email: Some("broken".to_string()),
                    ..ContactInfo::default()
                }),
                ..UpdateClient::default()
            },
            test_time(),
        );

        assert!(result.is_err());
        assert_eq!(client, before);
    }

    #[test]
    fn deactivate_is_a_soft_delete() {
        let mut client = Client::register(register_cmd()).unwrap();
        client.deactivate(test_time());
        assert!(!client.is_active());
        assert_eq!(client.name(), "Maria Souza");
    }

    #[test]
    fn matches_name_tax_id_and_email() {
        let client = Client::register(register_cmd()).unwrap();
        assert!(client.matches("maria"));
        assert!(client.matches("123.456"));
        assert!(client.matches("example.com"));
        assert!(client.matches("3333"));
        assert!(!client.matches("joao"));
    }

    #[test]
    fn document_round_trips_through_json() {
        let client = Client::register(register_cmd()).unwrap();
        let json = serde_json::to_value(&client).unwrap();
        assert_eq!(json["kind"], "individual");
        let back: Client = serde_json::from_value(json).unwrap();
        assert_eq!(back, client);
    }
}
