//! Invoicing domain module.
//!
//! Invoices are issued from completed service orders. Tax figures are
//! estimates computed from configurable rates; no fiscal authority protocol is
//! spoken here.

pub mod invoice;
pub mod tax;

pub use invoice::{
    Invoice, InvoiceId, InvoiceItem, InvoiceItemKind, InvoiceStatus, IssueInvoice,
    format_invoice_number,
};
pub use tax::{TaxEstimate, TaxRates};
