use std::sync::Arc;

use chrono::NaiveDate;
use tracing::instrument;

use wrenchbook_accounting::{
    CreateEntry, EntryKind, EntryStatus, FinancialEntry, FinancialEntryId, FinancialSummary,
    RegisterPayment, UpdateEntry, summarize,
};
use wrenchbook_core::AggregateId;
use wrenchbook_parties::{Client, Supplier};
use wrenchbook_service_orders::ServiceOrder;

use crate::audit::AuditTrail;
use crate::error::{ServiceError, ServiceResult};
use crate::store::{DocumentStore, Filter, Repository};

use super::{OperationContext, details, require};

/// Listing filter. Due dates are inclusive on both ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryQuery {
    pub kind: Option<EntryKind>,
    pub status: Option<EntryStatus>,
    pub due_from: Option<NaiveDate>,
    pub due_to: Option<NaiveDate>,
}

/// Receivables and payables.
#[derive(Clone)]
pub struct FinanceBook {
    entries: Repository<FinancialEntry>,
    orders: Repository<ServiceOrder>,
    clients: Repository<Client>,
    suppliers: Repository<Supplier>,
    audit: AuditTrail,
}

impl FinanceBook {
    pub fn new(store: Arc<dyn DocumentStore>, audit: AuditTrail) -> Self {
        Self {
            entries: Repository::new(store.clone()),
            orders: Repository::new(store.clone()),
            clients: Repository::new(store.clone()),
            suppliers: Repository::new(store),
            audit,
        }
    }

    async fn load(&self, id: FinancialEntryId) -> ServiceResult<FinancialEntry> {
        require(&self.entries, id.as_aggregate(), "financial entry").await
    }

    /// Revenue is owed by a client, expenses are owed to a supplier.
    async fn require_counterparty(&self, kind: EntryKind, id: AggregateId) -> ServiceResult<()> {
        match kind {
            EntryKind::Revenue => require(&self.clients, id, "client").await.map(drop),
            EntryKind::Expense => require(&self.suppliers, id, "supplier").await.map(drop),
        }
    }

    async fn store_change(
        &self,
        ctx: &OperationContext,
        entry: &FinancialEntry,
        action: &str,
    ) -> ServiceResult<()> {
        self.entries.save(entry).await?;
        self.audit
            .record(
                ctx,
                action,
                "financial_entry",
                entry.id_typed().as_aggregate(),
                serde_json::json!({ "status": entry.status(), "amount": entry.amount() }),
            )
            .await;
        Ok(())
    }

    #[instrument(skip(self, cmd), fields(entry_id = %cmd.entry_id), err)]
    pub async fn create(&self, ctx: &OperationContext, cmd: CreateEntry) -> ServiceResult<FinancialEntry> {
        if let Some(order_id) = cmd.service_order_id {
            require(&self.orders, order_id.as_aggregate(), "service order").await?;
        }
        if let Some(counterparty_id) = cmd.counterparty_id {
            self.require_counterparty(cmd.kind, counterparty_id).await?;
        }
        let entry = FinancialEntry::create(cmd)?;
        self.entries.save(&entry).await?;

        tracing::info!(kind = ?entry.kind(), amount = entry.amount(), "financial entry created");
        self.audit
            .record(
                ctx,
                "financial_entry.created",
                "financial_entry",
                entry.id_typed().as_aggregate(),
                details(&entry),
            )
            .await;
        Ok(entry)
    }

    #[instrument(skip(self, cmd), err)]
    pub async fn update(
        &self,
        ctx: &OperationContext,
        id: FinancialEntryId,
        cmd: UpdateEntry,
    ) -> ServiceResult<FinancialEntry> {
        let mut entry = self.load(id).await?;
        entry.update(cmd, ctx.at)?;
        self.store_change(ctx, &entry, "financial_entry.updated").await?;
        Ok(entry)
    }

    #[instrument(skip(self, cmd), err)]
    pub async fn register_payment(
        &self,
        ctx: &OperationContext,
        id: FinancialEntryId,
        cmd: RegisterPayment,
    ) -> ServiceResult<FinancialEntry> {
        let mut entry = self.load(id).await?;
        entry.register_payment(cmd, ctx.at)?;
        self.store_change(ctx, &entry, "financial_entry.paid").await?;
        Ok(entry)
    }

    #[instrument(skip(self), err)]
    pub async fn cancel(&self, ctx: &OperationContext, id: FinancialEntryId) -> ServiceResult<FinancialEntry> {
        let mut entry = self.load(id).await?;
        entry.cancel(ctx.at)?;
        self.store_change(ctx, &entry, "financial_entry.canceled").await?;
        Ok(entry)
    }

    /// Entry as of `today`: pending entries past due read as overdue.
    pub async fn get(&self, id: FinancialEntryId, today: NaiveDate) -> ServiceResult<FinancialEntry> {
        let mut entry = self.load(id).await?;
        entry.refresh_status(today);
        Ok(entry)
    }

    /// Entries by kind, status and due-date period, earliest due first.
    pub async fn list(&self, query: EntryQuery, today: NaiveDate) -> ServiceResult<Vec<FinancialEntry>> {
        let filters: Vec<Filter> = query
            .kind
            .map(|kind| vec![Filter::eq("kind", kind)])
            .unwrap_or_default();

        let mut entries: Vec<FinancialEntry> = self
            .entries
            .find(&filters)
            .await?
            .into_iter()
            .map(|mut entry| {
                entry.refresh_status(today);
                entry
            })
            .filter(|e| query.status.is_none_or(|s| e.status() == s))
            .filter(|e| query.due_from.is_none_or(|from| e.due_date() >= from))
            .filter(|e| query.due_to.is_none_or(|to| e.due_date() <= to))
            .collect();
        entries.sort_by_key(|e| e.due_date());
        Ok(entries)
    }

    /// Revenue, expenses and balance over entries paid within `[from, to]`.
    pub async fn summary(&self, from: NaiveDate, to: NaiveDate) -> ServiceResult<FinancialSummary> {
        if to < from {
            return Err(ServiceError::validation("period end is before its start"));
        }
        let entries = self
            .entries
            .find(&[Filter::eq("status", EntryStatus::Paid)])
            .await?;
        Ok(summarize(&entries, from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{seed_client, seed_supplier, test_ctx, test_services};
    use chrono::Utc;
    use wrenchbook_core::DomainError;
    use wrenchbook_service_orders::ServiceOrderId;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 5, d).unwrap()
    }

    fn entry_cmd(kind: EntryKind, category: &str, amount: u64, due: NaiveDate) -> CreateEntry {
        CreateEntry {
            entry_id: FinancialEntryId::generate(),
            kind,
            category: category.to_string(),
            description: format!("{category} entry"),
            amount,
            due_date: due,
            paid_on: None,
            payment_method: None,
            service_order_id: None,
            counterparty_id: None,
            notes: None,
            occurred_at: Utc::now(),
        }
    }

    fn paid(on: NaiveDate) -> RegisterPayment {
        RegisterPayment {
            paid_on: on,
            payment_method: Some("pix".to_string()),
        }
    }

    #[tokio::test]
    async fn pending_entries_read_as_overdue_after_due_date() {
        let services = test_services();
        let entry = services
            .finance
            .create(&test_ctx(), entry_cmd(EntryKind::Expense, "rent", 500_000, day(10)))
            .await
            .unwrap();

        let before = services.finance.get(entry.id_typed(), day(10)).await.unwrap();
        assert_eq!(before.status(), EntryStatus::Pending);
        let after = services.finance.get(entry.id_typed(), day(11)).await.unwrap();
        assert_eq!(after.status(), EntryStatus::Overdue);

        let overdue = services
            .finance
            .list(
                EntryQuery {
                    status: Some(EntryStatus::Overdue),
                    ..EntryQuery::default()
                },
                day(20),
            )
            .await
            .unwrap();
        assert_eq!(overdue.len(), 1);
    }

    #[tokio::test]
    async fn paid_entries_are_frozen_but_cancelable() {
        let services = test_services();
        let ctx = test_ctx();
        let entry = services
            .finance
            .create(&ctx, entry_cmd(EntryKind::Revenue, "services", 12_000, day(5)))
            .await
            .unwrap();
        services
            .finance
            .register_payment(&ctx, entry.id_typed(), paid(day(4)))
            .await
            .unwrap();

        let err = services
            .finance
            .register_payment(&ctx, entry.id_typed(), paid(day(6)))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::InvalidStateTransition(_))));

        let err = services
            .finance
            .update(
                &ctx,
                entry.id_typed(),
                UpdateEntry {
                    amount: Some(1),
                    ..UpdateEntry::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::InvalidStateTransition(_))));

        let canceled = services.finance.cancel(&ctx, entry.id_typed()).await.unwrap();
        assert_eq!(canceled.status(), EntryStatus::Canceled);
    }

    #[tokio::test]
    async fn summary_counts_paid_entries_in_period() {
        let services = test_services();
        let ctx = test_ctx();
        let mut cmds = vec![
            entry_cmd(EntryKind::Revenue, "services", 30_000, day(1)),
            entry_cmd(EntryKind::Revenue, "parts", 10_000, day(1)),
            entry_cmd(EntryKind::Expense, "rent", 25_000, day(1)),
        ];
        for cmd in &mut cmds {
            cmd.paid_on = Some(day(3));
        }
        // paid outside the period
        let mut late = entry_cmd(EntryKind::Revenue, "services", 99_000, day(1));
        late.paid_on = Some(day(25));
        cmds.push(late);
        // never paid
        cmds.push(entry_cmd(EntryKind::Expense, "rent", 7_000, day(2)));

        for cmd in cmds {
            services.finance.create(&ctx, cmd).await.unwrap();
        }

        let summary = services.finance.summary(day(1), day(15)).await.unwrap();
        assert_eq!(summary.revenue, 40_000);
        assert_eq!(summary.expenses, 25_000);
        assert_eq!(summary.balance, 15_000);
        assert_eq!(summary.revenue_by_category.get("services"), Some(&30_000));
        assert_eq!(summary.expenses_by_category.get("rent"), Some(&25_000));
    }

    #[tokio::test]
    async fn list_filters_kind_and_due_period() {
        let services = test_services();
        let ctx = test_ctx();
        for (kind, due) in [
            (EntryKind::Revenue, day(2)),
            (EntryKind::Revenue, day(9)),
            (EntryKind::Expense, day(5)),
        ] {
            services
                .finance
                .create(&ctx, entry_cmd(kind, "misc", 1_000, due))
                .await
                .unwrap();
        }

        let listed = services
            .finance
            .list(
                EntryQuery {
                    kind: Some(EntryKind::Revenue),
                    due_from: Some(day(1)),
                    due_to: Some(day(5)),
                    ..EntryQuery::default()
                },
                day(1),
            )
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].due_date(), day(2));
    }

    #[tokio::test]
    async fn entry_must_reference_an_existing_order() {
        let services = test_services();
        let mut cmd = entry_cmd(EntryKind::Revenue, "services", 1_000, day(1));
        cmd.service_order_id = Some(ServiceOrderId::generate());

        let err = services.finance.create(&test_ctx(), cmd).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn counterparty_must_match_the_entry_kind() {
        let services = test_services();
        let ctx = test_ctx();
        let client = seed_client(&services).await;
        let supplier = seed_supplier(&services).await;

        let mut revenue = entry_cmd(EntryKind::Revenue, "services", 1_000, day(1));
        revenue.counterparty_id = Some(client.id_typed().as_aggregate());
        let entry = services.finance.create(&ctx, revenue).await.unwrap();
        assert_eq!(entry.counterparty_id(), Some(client.id_typed().as_aggregate()));

        let mut expense = entry_cmd(EntryKind::Expense, "parts", 2_000, day(1));
        expense.counterparty_id = Some(supplier.id_typed().as_aggregate());
        services.finance.create(&ctx, expense).await.unwrap();

        // a client is not a supplier
        let mut expense = entry_cmd(EntryKind::Expense, "parts", 2_000, day(1));
        expense.counterparty_id = Some(client.id_typed().as_aggregate());
        let err = services.finance.create(&ctx, expense).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFound(_))));

        let mut revenue = entry_cmd(EntryKind::Revenue, "services", 1_000, day(1));
        revenue.counterparty_id = Some(AggregateId::new());
        let err = services.finance.create(&ctx, revenue).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFound(_))));

        let all = services.finance.list(EntryQuery::default(), day(1)).await.unwrap();
        assert_eq!(all.len(), 2);
    }
}
