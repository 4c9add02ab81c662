use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::entry::{EntryKind, EntryStatus, FinancialEntry};

/// Cash summary for a period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub revenue: u64,
    pub expenses: u64,
    /// `revenue - expenses`; negative when the shop spent more than it earned.
    pub balance: i64,
    pub revenue_by_category: BTreeMap<String, u64>,
    pub expenses_by_category: BTreeMap<String, u64>,
}

/// Summarize paid entries whose payment date lies in `[from, to]`.
pub fn summarize<'a>(
    entries: impl IntoIterator<Item = &'a FinancialEntry>,
    from: NaiveDate,
    to: NaiveDate,
) -> FinancialSummary {
    let mut summary = FinancialSummary {
        from: Some(from),
        to: Some(to),
        ..FinancialSummary::default()
    };

    for entry in entries {
        if entry.status() != EntryStatus::Paid {
            continue;
        }
        let Some(paid_on) = entry.paid_on() else {
            continue;
        };
        if paid_on < from || paid_on > to {
            continue;
        }

        let (total, by_category) = match entry.kind() {
            EntryKind::Revenue => (&mut summary.revenue, &mut summary.revenue_by_category),
            EntryKind::Expense => (&mut summary.expenses, &mut summary.expenses_by_category),
        };
        *total = total.saturating_add(entry.amount());
        let slot = by_category.entry(entry.category().to_string()).or_default();
        *slot = slot.saturating_add(entry.amount());
    }

    let revenue = i64::try_from(summary.revenue).unwrap_or(i64::MAX);
    let expenses = i64::try_from(summary.expenses).unwrap_or(i64::MAX);
    summary.balance = revenue.saturating_sub(expenses);
    summary
}
