//! Accounting domain module.
//!
//! Receivables and payables of the shop as single-sided financial entries,
//! plus period summaries computed over settled entries.

pub mod entry;
pub mod summary;

pub use entry::{
    CreateEntry, EntryKind, EntryStatus, FinancialEntry, FinancialEntryId, RegisterPayment,
    UpdateEntry,
};
pub use summary::{FinancialSummary, summarize};
