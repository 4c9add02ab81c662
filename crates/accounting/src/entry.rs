use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use wrenchbook_core::error::require_text;
use wrenchbook_core::{AggregateId, Document, DomainError, DomainResult, Entity};
use wrenchbook_service_orders::ServiceOrderId;

wrenchbook_core::typed_id!(
    /// Financial entry identifier.
    FinancialEntryId
);

/// Direction of money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Revenue,
    Expense,
}

/// `Pending` becomes `Overdue` once the due date has passed without payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Pending,
    Paid,
    Overdue,
    Canceled,
}

impl EntryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryStatus::Pending => "pending",
            EntryStatus::Paid => "paid",
            EntryStatus::Overdue => "overdue",
            EntryStatus::Canceled => "canceled",
        }
    }
}

/// Entity: FinancialEntry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialEntry {
    id: FinancialEntryId,
    kind: EntryKind,
    category: String,
    description: String,
    /// Amount in smallest currency unit (e.g., cents). Always positive.
    amount: u64,
    due_date: NaiveDate,
    paid_on: Option<NaiveDate>,
    payment_method: Option<String>,
    status: EntryStatus,
    service_order_id: Option<ServiceOrderId>,
    /// Client (revenue) or supplier (expense) the entry is about.
    counterparty_id: Option<AggregateId>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Command: CreateEntry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateEntry {
    pub entry_id: FinancialEntryId,
    pub kind: EntryKind,
    pub category: String,
    pub description: String,
    pub amount: u64,
    pub due_date: NaiveDate,
    pub paid_on: Option<NaiveDate>,
    pub payment_method: Option<String>,
    pub service_order_id: Option<ServiceOrderId>,
    pub counterparty_id: Option<AggregateId>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateEntry. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateEntry {
    pub category: Option<String>,
    pub description: Option<String>,
    pub amount: Option<u64>,
    pub due_date: Option<NaiveDate>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

/// Command: RegisterPayment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterPayment {
    pub paid_on: NaiveDate,
    pub payment_method: Option<String>,
}

fn positive_amount(amount: u64) -> DomainResult<u64> {
    if amount == 0 {
        return Err(DomainError::validation("amount must be greater than zero"));
    }
    Ok(amount)
}

fn status_for(due_date: NaiveDate, today: NaiveDate) -> EntryStatus {
    if due_date < today {
        EntryStatus::Overdue
    } else {
        EntryStatus::Pending
    }
}

impl FinancialEntry {
    /// Create an entry. A payment date makes it `Paid` right away; otherwise
    /// the status follows the due date relative to `occurred_at`.
    pub fn create(cmd: CreateEntry) -> DomainResult<Self> {
        let category = require_text("category", &cmd.category)?;
        let description = require_text("description", &cmd.description)?;
        let amount = positive_amount(cmd.amount)?;
        let status = match cmd.paid_on {
            Some(_) => EntryStatus::Paid,
            None => status_for(cmd.due_date, cmd.occurred_at.date_naive()),
        };

        Ok(Self {
            id: cmd.entry_id,
            kind: cmd.kind,
            category,
            description,
            amount,
            due_date: cmd.due_date,
            paid_on: cmd.paid_on,
            payment_method: cmd.payment_method,
            status,
            service_order_id: cmd.service_order_id,
            counterparty_id: cmd.counterparty_id,
            notes: cmd.notes,
            created_at: cmd.occurred_at,
            updated_at: cmd.occurred_at,
        })
    }

    pub fn id_typed(&self) -> FinancialEntryId {
        self.id
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn due_date(&self) -> NaiveDate {
        self.due_date
    }

    pub fn paid_on(&self) -> Option<NaiveDate> {
        self.paid_on
    }

    pub fn payment_method(&self) -> Option<&str> {
        self.payment_method.as_deref()
    }

    pub fn status(&self) -> EntryStatus {
        self.status
    }

    pub fn service_order_id(&self) -> Option<ServiceOrderId> {
        self.service_order_id
    }

    pub fn counterparty_id(&self) -> Option<AggregateId> {
        self.counterparty_id
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Re-derive `Pending`/`Overdue` for `today`. Returns whether it changed.
    pub fn refresh_status(&mut self, today: NaiveDate) -> bool {
        if !matches!(self.status, EntryStatus::Pending | EntryStatus::Overdue) {
            return false;
        }
        let next = status_for(self.due_date, today);
        let changed = next != self.status;
        self.status = next;
        changed
    }

    fn ensure_open(&self, action: &str) -> DomainResult<()> {
        if matches!(self.status, EntryStatus::Paid | EntryStatus::Canceled) {
            return Err(DomainError::invalid_transition(format!(
                "cannot {action} an entry that is {}",
                self.status.as_str()
            )));
        }
        Ok(())
    }

    pub fn update(&mut self, cmd: UpdateEntry, at: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_open("update")?;
        let category = cmd
            .category
            .as_deref()
            .map(|c| require_text("category", c))
            .transpose()?;
        let description = cmd
            .description
            .as_deref()
            .map(|d| require_text("description", d))
            .transpose()?;
        let amount = cmd.amount.map(positive_amount).transpose()?;

        if let Some(category) = category {
            self.category = category;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(amount) = amount {
            self.amount = amount;
        }
        if let Some(due_date) = cmd.due_date {
            self.due_date = due_date;
            self.status = status_for(due_date, at.date_naive());
        }
        if cmd.payment_method.is_some() {
            self.payment_method = cmd.payment_method;
        }
        if cmd.notes.is_some() {
            self.notes = cmd.notes;
        }
        self.updated_at = at;
        Ok(())
    }

    pub fn register_payment(&mut self, cmd: RegisterPayment, at: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_open("pay")?;
        self.status = EntryStatus::Paid;
        self.paid_on = Some(cmd.paid_on);
        if cmd.payment_method.is_some() {
            self.payment_method = cmd.payment_method;
        }
        self.updated_at = at;
        Ok(())
    }

    /// Paid entries may still be canceled (e.g. a refund written off).
    pub fn cancel(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        if self.status == EntryStatus::Canceled {
            return Err(DomainError::invalid_transition("entry is already canceled"));
        }
        self.status = EntryStatus::Canceled;
        self.updated_at = at;
        Ok(())
    }
}

impl Entity for FinancialEntry {
    type Id = FinancialEntryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Document for FinancialEntry {
    const COLLECTION: &'static str = "financial_entries";

    fn key(&self) -> AggregateId {
        self.id.0
    }
}
