use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wrenchbook_core::error::require_text;
use wrenchbook_core::{AggregateId, Document, DomainError, DomainResult, Entity};
use wrenchbook_parties::ClientId;
use wrenchbook_service_orders::{ServiceOrder, ServiceOrderId};

use crate::tax::{TaxEstimate, TaxRates};

wrenchbook_core::typed_id!(
    /// Invoice identifier.
    InvoiceId
);

/// Fiscal operation code used for labour items.
pub const SERVICE_FISCAL_CODE: &str = "5933";
/// Fiscal operation code used for parts sold inside the state.
pub const PRODUCT_FISCAL_CODE: &str = "5102";

/// Zero-padded invoice number for a counter value.
pub fn format_invoice_number(sequence: u64) -> String {
    format!("{sequence:09}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Issued,
    Canceled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceItemKind {
    Service,
    Product,
}

/// Invoice item copied from a service order line at issue time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub kind: InvoiceItemKind,
    /// Catalog service or product the line referred to.
    pub reference_id: AggregateId,
    pub description: String,
    pub quantity: u32,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: u64,
    pub total: u64,
    pub fiscal_code: String,
}

/// Command: IssueInvoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueInvoice {
    pub invoice_id: InvoiceId,
    /// Counter value; formatted into the invoice number.
    pub sequence: u64,
    pub series: String,
    pub rates: TaxRates,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Entity: Invoice.
///
/// Items and totals are a snapshot of the order at issue time and never
/// change afterwards. Only the status can move, from `Issued` to `Canceled`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    id: InvoiceId,
    number: String,
    series: String,
    service_order_id: ServiceOrderId,
    order_number: String,
    client_id: ClientId,
    items: Vec<InvoiceItem>,
    services_total: u64,
    products_total: u64,
    discount: u64,
    total: u64,
    taxes: TaxEstimate,
    status: InvoiceStatus,
    notes: Option<String>,
    cancel_reason: Option<String>,
    issued_at: DateTime<Utc>,
    canceled_at: Option<DateTime<Utc>>,
}

impl Invoice {
    /// Build an invoice from a finished service order.
    ///
    /// The caller is responsible for attaching the new invoice id to the order.
    pub fn issue(order: &ServiceOrder, cmd: IssueInvoice) -> DomainResult<Self> {
        order.ensure_invoiceable()?;
        if order.service_lines().is_empty() && order.product_lines().is_empty() {
            return Err(DomainError::validation(
                "cannot invoice a service order without items",
            ));
        }
        let series = require_text("series", &cmd.series)?;

        let services = order.service_lines().iter().map(|l| InvoiceItem {
            kind: InvoiceItemKind::Service,
            reference_id: l.service_id.as_aggregate(),
            description: l.description.clone(),
            quantity: 1,
            unit_price: l.price,
            total: l.price,
            fiscal_code: SERVICE_FISCAL_CODE.to_string(),
        });
        let products = order.product_lines().iter().map(|l| InvoiceItem {
            kind: InvoiceItemKind::Product,
            reference_id: l.product_id.as_aggregate(),
            description: l.description.clone(),
            quantity: l.quantity,
            unit_price: l.unit_price,
            total: l.line_total,
            fiscal_code: PRODUCT_FISCAL_CODE.to_string(),
        });
        let items: Vec<InvoiceItem> = services.chain(products).collect();

        let totals = order.totals();
        let taxes = cmd
            .rates
            .estimate(totals.products, totals.services, totals.grand_total);

        Ok(Self {
            id: cmd.invoice_id,
            number: format_invoice_number(cmd.sequence),
            series,
            service_order_id: order.id_typed(),
            order_number: order.number().to_string(),
            client_id: order.client_id(),
            items,
            services_total: totals.services,
            products_total: totals.products,
            discount: totals.discount,
            total: totals.grand_total,
            taxes,
            status: InvoiceStatus::Issued,
            notes: cmd.notes,
            cancel_reason: None,
            issued_at: cmd.occurred_at,
            canceled_at: None,
        })
    }

    pub fn id_typed(&self) -> InvoiceId {
        self.id
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn series(&self) -> &str {
        &self.series
    }

    pub fn service_order_id(&self) -> ServiceOrderId {
        self.service_order_id
    }

    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn items(&self) -> &[InvoiceItem] {
        &self.items
    }

    pub fn services_total(&self) -> u64 {
        self.services_total
    }

    pub fn products_total(&self) -> u64 {
        self.products_total
    }

    pub fn discount(&self) -> u64 {
        self.discount
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn taxes(&self) -> TaxEstimate {
        self.taxes
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn cancel_reason(&self) -> Option<&str> {
        self.cancel_reason.as_deref()
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn canceled_at(&self) -> Option<DateTime<Utc>> {
        self.canceled_at
    }

    pub fn cancel(&mut self, reason: &str, at: DateTime<Utc>) -> DomainResult<()> {
        if self.status == InvoiceStatus::Canceled {
            return Err(DomainError::invalid_transition(format!(
                "invoice {} is already canceled",
                self.number
            )));
        }
        let reason = require_text("cancel reason", reason)?;
        self.status = InvoiceStatus::Canceled;
        self.cancel_reason = Some(reason);
        self.canceled_at = Some(at);
        Ok(())
    }
}

impl Entity for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Document for Invoice {
    const COLLECTION: &'static str = "invoices";

    fn key(&self) -> AggregateId {
        self.id.0
    }
}
