use std::sync::Arc;

use tracing::instrument;

use wrenchbook_invoicing::{Invoice, InvoiceId, InvoiceStatus, IssueInvoice, TaxRates};
use wrenchbook_parties::ClientId;
use wrenchbook_service_orders::{ServiceOrder, ServiceOrderId};

use crate::audit::AuditTrail;
use crate::error::{ServiceError, ServiceResult};
use crate::store::{CounterStore, DocumentStore, Filter, Repository};

use super::{OperationContext, details, require};

/// Issues and cancels invoices for finished service orders.
#[derive(Clone)]
pub struct InvoiceDesk {
    invoices: Repository<Invoice>,
    orders: Repository<ServiceOrder>,
    counters: Arc<dyn CounterStore>,
    series: String,
    rates: TaxRates,
    audit: AuditTrail,
}

impl InvoiceDesk {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        counters: Arc<dyn CounterStore>,
        series: String,
        rates: TaxRates,
        audit: AuditTrail,
    ) -> Self {
        Self {
            invoices: Repository::new(store.clone()),
            orders: Repository::new(store),
            counters,
            series,
            rates,
            audit,
        }
    }

    fn counter_name(&self) -> String {
        format!("invoice:{}", self.series)
    }

    async fn load(&self, id: InvoiceId) -> ServiceResult<Invoice> {
        require(&self.invoices, id.as_aggregate(), "invoice").await
    }

    /// Issue an invoice for a completed or delivered order and link it back
    /// to the order.
    #[instrument(skip(self, notes), err)]
    pub async fn issue(
        &self,
        ctx: &OperationContext,
        order_id: ServiceOrderId,
        notes: Option<String>,
    ) -> ServiceResult<Invoice> {
        let mut order = require(&self.orders, order_id.as_aggregate(), "service order").await?;
        order.ensure_invoiceable()?;

        let sequence = self.counters.next(&self.counter_name()).await?;
        let invoice = Invoice::issue(
            &order,
            IssueInvoice {
                invoice_id: InvoiceId::generate(),
                sequence,
                series: self.series.clone(),
                rates: self.rates,
                notes,
                occurred_at: ctx.at,
            },
        )?;
        order.attach_invoice(invoice.id_typed().as_aggregate(), ctx.at)?;

        self.invoices.save(&invoice).await?;
        self.orders.save(&order).await?;

        tracing::info!(
            number = invoice.number(),
            series = invoice.series(),
            order = order.number(),
            "invoice issued"
        );
        self.audit
            .record(
                ctx,
                "invoice.issued",
                "invoice",
                invoice.id_typed().as_aggregate(),
                details(&invoice),
            )
            .await;
        Ok(invoice)
    }

    /// Cancel an issued invoice; its order becomes invoiceable again.
    #[instrument(skip(self, reason), err)]
    pub async fn cancel(&self, ctx: &OperationContext, id: InvoiceId, reason: &str) -> ServiceResult<Invoice> {
        let mut invoice = self.load(id).await?;
        invoice.cancel(reason, ctx.at)?;
        self.invoices.save(&invoice).await?;

        let order = self
            .orders
            .get(invoice.service_order_id().as_aggregate())
            .await?;
        if let Some(mut order) = order {
            if order.invoice_id() == Some(id.as_aggregate()) {
                order.detach_invoice(ctx.at);
                self.orders.save(&order).await?;
            }
        }

        tracing::info!(number = invoice.number(), "invoice canceled");
        self.audit
            .record(
                ctx,
                "invoice.canceled",
                "invoice",
                id.as_aggregate(),
                serde_json::json!({ "reason": invoice.cancel_reason() }),
            )
            .await;
        Ok(invoice)
    }

    pub async fn get(&self, id: InvoiceId) -> ServiceResult<Invoice> {
        self.load(id).await
    }

    /// Invoices, optionally of one client, newest first.
    pub async fn list(&self, client_id: Option<ClientId>) -> ServiceResult<Vec<Invoice>> {
        let filters: Vec<Filter> = client_id
            .map(|id| vec![Filter::eq("client_id", id)])
            .unwrap_or_default();
        let mut invoices = self.invoices.find(&filters).await?;
        invoices.sort_by(|a, b| b.issued_at().cmp(&a.issued_at()));
        Ok(invoices)
    }

    /// The order's current invoice; falls back to its latest canceled one.
    pub async fn get_by_order(&self, order_id: ServiceOrderId) -> ServiceResult<Invoice> {
        let mut invoices = self
            .invoices
            .find(&[Filter::eq("service_order_id", order_id)])
            .await?;
        if invoices.is_empty() {
            return Err(ServiceError::not_found("invoice"));
        }
        invoices.sort_by(|a, b| b.issued_at().cmp(&a.issued_at()));
        let current = invoices
            .iter()
            .position(|i| i.status() == InvoiceStatus::Issued)
            .unwrap_or(0);
        Ok(invoices.swap_remove(current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{
        seed_client, seed_order, seed_product, seed_service, seed_vehicle, test_ctx, test_services,
    };
    use crate::services::{NewProductLine, NewServiceLine, Services};
    use wrenchbook_core::DomainError;
    use wrenchbook_invoicing::InvoiceItemKind;
    use wrenchbook_service_orders::ServiceOrderStatus;

    async fn completed_order(services: &Services, plate: &str) -> ServiceOrder {
        let ctx = test_ctx();
        let client = seed_client(services).await;
        let vehicle = seed_vehicle(services, &client, plate).await;
        let order = seed_order(services, &client, &vehicle).await;
        let service = seed_service(services, &format!("S-{plate}"), 60).await;
        let product = seed_product(services, &format!("P-{plate}"), 10).await;

        services
            .orders
            .add_service_line(
                &ctx,
                order.id_typed(),
                NewServiceLine {
                    service_id: service.id_typed(),
                    description: None,
                    price: Some(20_000),
                    mechanic_id: None,
                },
            )
            .await
            .unwrap();
        services
            .orders
            .add_product_line(
                &ctx,
                order.id_typed(),
                NewProductLine {
                    product_id: product.id_typed(),
                    quantity: 2,
                    unit_price: Some(5_000),
                },
            )
            .await
            .unwrap();
        services
            .orders
            .change_status(&ctx, order.id_typed(), ServiceOrderStatus::Completed)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn issuing_numbers_invoices_and_links_the_order() {
        let services = test_services();
        let ctx = test_ctx();
        let order = completed_order(&services, "INV1A23").await;

        let invoice = services.invoices.issue(&ctx, order.id_typed(), None).await.unwrap();
        assert_eq!(invoice.number(), "000000001");
        assert_eq!(invoice.total(), 30_000);
        assert_eq!(invoice.items().len(), 2);
        assert_eq!(invoice.items()[0].kind, InvoiceItemKind::Service);
        assert_eq!(invoice.items()[1].quantity, 2);

        let linked = services.orders.get(order.id_typed()).await.unwrap();
        assert_eq!(linked.invoice_id(), Some(invoice.id_typed().as_aggregate()));

        let second = completed_order(&services, "INV1A24").await;
        let next = services.invoices.issue(&ctx, second.id_typed(), None).await.unwrap();
        assert_eq!(next.number(), "000000002");
    }

    #[tokio::test]
    async fn order_is_invoiced_once() {
        let services = test_services();
        let ctx = test_ctx();
        let order = completed_order(&services, "INV2A23").await;
        services.invoices.issue(&ctx, order.id_typed(), None).await.unwrap();

        let err = services
            .invoices
            .issue(&ctx, order.id_typed(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn open_order_cannot_be_invoiced() {
        let services = test_services();
        let client = seed_client(&services).await;
        let vehicle = seed_vehicle(&services, &client, "INV3A23").await;
        let order = seed_order(&services, &client, &vehicle).await;

        let err = services
            .invoices
            .issue(&test_ctx(), order.id_typed(), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::InvalidStateTransition(_))
        ));
    }

    #[tokio::test]
    async fn canceling_frees_the_order_for_a_new_invoice() {
        let services = test_services();
        let ctx = test_ctx();
        let order = completed_order(&services, "INV4A23").await;
        let first = services.invoices.issue(&ctx, order.id_typed(), None).await.unwrap();

        let canceled = services
            .invoices
            .cancel(&ctx, first.id_typed(), "wrong client data")
            .await
            .unwrap();
        assert_eq!(canceled.status(), InvoiceStatus::Canceled);
        assert_eq!(services.orders.get(order.id_typed()).await.unwrap().invoice_id(), None);

        let reissued = services.invoices.issue(&ctx, order.id_typed(), None).await.unwrap();
        let current = services.invoices.get_by_order(order.id_typed()).await.unwrap();
        assert_eq!(current.id_typed(), reissued.id_typed());

        let err = services
            .invoices
            .cancel(&ctx, first.id_typed(), "again")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::InvalidStateTransition(_))
        ));
    }

    #[tokio::test]
    async fn list_by_client_only_returns_their_invoices() {
        let services = test_services();
        let ctx = test_ctx();
        let mine = completed_order(&services, "INV5A23").await;
        let theirs = completed_order(&services, "INV5A24").await;
        services.invoices.issue(&ctx, mine.id_typed(), None).await.unwrap();
        services.invoices.issue(&ctx, theirs.id_typed(), None).await.unwrap();

        let listed = services.invoices.list(Some(mine.client_id())).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].client_id(), mine.client_id());
        assert_eq!(services.invoices.list(None).await.unwrap().len(), 2);
    }
}
