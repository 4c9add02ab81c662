use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::instrument;

use wrenchbook_catalog::{Service, ServiceId};
use wrenchbook_core::DomainResult;
use wrenchbook_inventory::{MoveStock, MovementDirection, OrderRef, ProductId, StockMovementId};
use wrenchbook_parties::{Client, ClientId, StaffId, StaffMember, Vehicle, VehicleId};
use wrenchbook_service_orders::{
    AddProductLine, AddServiceLine, LineId, OpenServiceOrder, ServiceOrder, ServiceOrderId,
    ServiceOrderStatus, UpdateOrderDetails, UpdateServiceLine, format_order_number,
};

use crate::audit::AuditTrail;
use crate::error::{ServiceError, ServiceResult};
use crate::store::{CounterStore, DocumentStore, Filter, Repository};

use super::stock::StockKeeper;
use super::{OperationContext, details, require};

const ORDER_COUNTER: &str = "service_order";

/// Input for [`OrderLedger::open`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewServiceOrder {
    pub client_id: ClientId,
    pub vehicle_id: VehicleId,
    pub mileage: Option<u32>,
    pub diagnosis: Option<String>,
    pub customer_notes: Option<String>,
    pub internal_notes: Option<String>,
    pub expected_at: Option<DateTime<Utc>>,
    pub responsible_id: Option<StaffId>,
}

impl NewServiceOrder {
    pub fn new(client_id: ClientId, vehicle_id: VehicleId) -> Self {
        Self {
            client_id,
            vehicle_id,
            mileage: None,
            diagnosis: None,
            customer_notes: None,
            internal_notes: None,
            expected_at: None,
            responsible_id: None,
        }
    }
}

/// Labour line request; description and price default to the catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewServiceLine {
    pub service_id: ServiceId,
    pub description: Option<String>,
    pub price: Option<u64>,
    pub mechanic_id: Option<StaffId>,
}

/// Parts line request; the unit price defaults to the product's sale price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProductLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Option<u64>,
}

/// Listing filter; `from`/`to` bound the opening date as `[from, to)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderQuery {
    pub status: Option<ServiceOrderStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// The order ledger: service orders, their lines, and the stock they consume.
#[derive(Clone)]
pub struct OrderLedger {
    orders: Repository<ServiceOrder>,
    clients: Repository<Client>,
    vehicles: Repository<Vehicle>,
    staff: Repository<StaffMember>,
    services: Repository<Service>,
    counters: Arc<dyn CounterStore>,
    stock: StockKeeper,
    audit: AuditTrail,
}

impl OrderLedger {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        counters: Arc<dyn CounterStore>,
        stock: StockKeeper,
        audit: AuditTrail,
    ) -> Self {
        Self {
            orders: Repository::new(store.clone()),
            clients: Repository::new(store.clone()),
            vehicles: Repository::new(store.clone()),
            staff: Repository::new(store.clone()),
            services: Repository::new(store),
            counters,
            stock,
            audit,
        }
    }

    async fn load(&self, id: ServiceOrderId) -> ServiceResult<ServiceOrder> {
        require(&self.orders, id.as_aggregate(), "service order").await
    }

    async fn require_staff(&self, id: Option<StaffId>) -> ServiceResult<()> {
        if let Some(id) = id {
            require(&self.staff, id.as_aggregate(), "staff member").await?;
        }
        Ok(())
    }

    /// Apply `change` to a copy of the order, persist it, and audit `action`.
    async fn mutate(
        &self,
        ctx: &OperationContext,
        id: ServiceOrderId,
        action: &str,
        change: impl FnOnce(&mut ServiceOrder) -> DomainResult<()>,
    ) -> ServiceResult<ServiceOrder> {
        let mut order = self.load(id).await?;
        change(&mut order)?;
        self.orders.save(&order).await?;

        self.audit
            .record(ctx, action, "service_order", id.as_aggregate(), details(order.totals()))
            .await;
        Ok(order)
    }

    #[instrument(skip(self, input), fields(client_id = %input.client_id), err)]
    pub async fn open(&self, ctx: &OperationContext, input: NewServiceOrder) -> ServiceResult<ServiceOrder> {
        require(&self.clients, input.client_id.as_aggregate(), "client").await?;
        let mut vehicle = require(&self.vehicles, input.vehicle_id.as_aggregate(), "vehicle").await?;
        if !vehicle.belongs_to(input.client_id) {
            return Err(ServiceError::validation("vehicle does not belong to the client"));
        }
        self.require_staff(input.responsible_id).await?;

        let sequence = self.counters.next(ORDER_COUNTER).await?;
        let order = ServiceOrder::open(OpenServiceOrder {
            order_id: ServiceOrderId::generate(),
            number: format_order_number(sequence, ctx.at),
            client_id: input.client_id,
            vehicle_id: input.vehicle_id,
            mileage: input.mileage,
            diagnosis: input.diagnosis,
            customer_notes: input.customer_notes,
            internal_notes: input.internal_notes,
            expected_at: input.expected_at,
            responsible_id: input.responsible_id,
            occurred_at: ctx.at,
        })?;
        self.orders.save(&order).await?;

        if let Some(mileage) = input.mileage {
            if vehicle.record_mileage(mileage, ctx.at) {
                self.vehicles.save(&vehicle).await?;
            }
        }

        tracing::info!(number = order.number(), "service order opened");
        self.audit
            .record(
                ctx,
                "service_order.created",
                "service_order",
                order.id_typed().as_aggregate(),
                details(&order),
            )
            .await;
        Ok(order)
    }

    #[instrument(skip(self, line), fields(service_id = %line.service_id), err)]
    pub async fn add_service_line(
        &self,
        ctx: &OperationContext,
        id: ServiceOrderId,
        line: NewServiceLine,
    ) -> ServiceResult<ServiceOrder> {
        let mut order = self.load(id).await?;
        order.ensure_editable()?;
        let service = require(&self.services, line.service_id.as_aggregate(), "service").await?;
        self.require_staff(line.mechanic_id).await?;

        order.add_service_line(AddServiceLine {
            line_id: LineId::generate(),
            service_id: line.service_id,
            description: line
                .description
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| service.name().to_string()),
            price: line.price.unwrap_or(service.price()),
            mechanic_id: line.mechanic_id,
            occurred_at: ctx.at,
        })?;
        self.orders.save(&order).await?;

        self.audit
            .record(
                ctx,
                "service_order.service_added",
                "service_order",
                id.as_aggregate(),
                details(order.totals()),
            )
            .await;
        Ok(order)
    }

    #[instrument(skip(self), err)]
    pub async fn remove_service_line(
        &self,
        ctx: &OperationContext,
        id: ServiceOrderId,
        line_id: LineId,
    ) -> ServiceResult<ServiceOrder> {
        self.mutate(ctx, id, "service_order.service_removed", |order| {
            order.remove_service_line(line_id, ctx.at).map(drop)
        })
        .await
    }

    /// Add a parts line and take its quantity out of stock.
    ///
    /// Writes happen in order: product, stock movement, service order. They
    /// are not atomic; if the order write fails the stock stays decremented
    /// and the movement stays recorded without a matching line.
    #[instrument(skip(self, line), fields(product_id = %line.product_id, quantity = line.quantity), err)]
    pub async fn add_product_line(
        &self,
        ctx: &OperationContext,
        id: ServiceOrderId,
        line: NewProductLine,
    ) -> ServiceResult<ServiceOrder> {
        let mut order = self.load(id).await?;
        order.ensure_editable()?;
        let mut product = self.stock.load(line.product_id).await?;
        product.ensure_available(line.quantity)?;

        order.add_product_line(AddProductLine {
            line_id: LineId::generate(),
            product_id: line.product_id,
            description: product.name().to_string(),
            quantity: line.quantity,
            unit_price: line.unit_price.unwrap_or(product.sale_price()),
            occurred_at: ctx.at,
        })?;

        let movement = self
            .stock
            .commit_movement(
                &mut product,
                MoveStock {
                    movement_id: StockMovementId::generate(),
                    direction: MovementDirection::Out,
                    quantity: line.quantity,
                    reason: format!("Used in service order {}", order.number()),
                    order: Some(OrderRef {
                        order_id: id.as_aggregate(),
                        number: order.number().to_string(),
                    }),
                    actor: ctx.actor,
                    occurred_at: ctx.at,
                },
            )
            .await?;
        self.orders.save(&order).await?;

        tracing::info!(
            number = order.number(),
            balance = movement.balance_after(),
            "product line added"
        );
        self.audit
            .record(
                ctx,
                "service_order.product_added",
                "service_order",
                id.as_aggregate(),
                details(&movement),
            )
            .await;
        Ok(order)
    }

    /// Remove a parts line and put its quantity back into stock.
    #[instrument(skip(self), err)]
    pub async fn remove_product_line(
        &self,
        ctx: &OperationContext,
        id: ServiceOrderId,
        line_id: LineId,
    ) -> ServiceResult<ServiceOrder> {
        let mut order = self.load(id).await?;
        let removed = order.remove_product_line(line_id, ctx.at)?;
        let mut product = self.stock.load(removed.product_id).await?;

        let movement = self
            .stock
            .commit_movement(
                &mut product,
                MoveStock {
                    movement_id: StockMovementId::generate(),
                    direction: MovementDirection::In,
                    quantity: removed.quantity,
                    reason: format!("Returned from service order {}", order.number()),
                    order: Some(OrderRef {
                        order_id: id.as_aggregate(),
                        number: order.number().to_string(),
                    }),
                    actor: ctx.actor,
                    occurred_at: ctx.at,
                },
            )
            .await?;
        self.orders.save(&order).await?;

        self.audit
            .record(
                ctx,
                "service_order.product_removed",
                "service_order",
                id.as_aggregate(),
                details(&movement),
            )
            .await;
        Ok(order)
    }

    #[instrument(skip(self, cmd), err)]
    pub async fn update_service_line(
        &self,
        ctx: &OperationContext,
        id: ServiceOrderId,
        line_id: LineId,
        cmd: UpdateServiceLine,
    ) -> ServiceResult<ServiceOrder> {
        self.require_staff(cmd.mechanic_id).await?;
        self.mutate(ctx, id, "service_order.service_updated", |order| {
            order.update_service_line(line_id, cmd, ctx.at).map(drop)
        })
        .await
    }

    #[instrument(skip(self, cmd), err)]
    pub async fn update_details(
        &self,
        ctx: &OperationContext,
        id: ServiceOrderId,
        cmd: UpdateOrderDetails,
    ) -> ServiceResult<ServiceOrder> {
        self.require_staff(cmd.responsible_id).await?;
        self.mutate(ctx, id, "service_order.updated", |order| {
            order.update_details(cmd, ctx.at)
        })
        .await
    }

    #[instrument(skip(self), err)]
    pub async fn change_status(
        &self,
        ctx: &OperationContext,
        id: ServiceOrderId,
        status: ServiceOrderStatus,
    ) -> ServiceResult<ServiceOrder> {
        let order = self
            .mutate(ctx, id, "service_order.status_changed", |order| {
                order.transition_to(status, ctx.at)
            })
            .await?;
        tracing::info!(number = order.number(), status = status.as_str(), "service order status changed");
        Ok(order)
    }

    pub async fn get(&self, id: ServiceOrderId) -> ServiceResult<ServiceOrder> {
        self.load(id).await
    }

    /// Orders by status and opening date, most recent first.
    pub async fn list(&self, query: OrderQuery) -> ServiceResult<Vec<ServiceOrder>> {
        let mut filters = Vec::new();
        if let Some(status) = query.status {
            filters.push(Filter::eq("status", status));
        }
        if let (Some(from), Some(to)) = (query.from, query.to) {
            filters.push(Filter::between("opened_at", from, to));
        }
        let orders = self
            .orders
            .find(&filters)
            .await?
            .into_iter()
            .filter(|o| query.from.is_none_or(|from| o.opened_at() >= from))
            .filter(|o| query.to.is_none_or(|to| o.opened_at() < to))
            .collect();
        Ok(most_recent_first(orders))
    }

    pub async fn list_by_client(&self, client_id: ClientId) -> ServiceResult<Vec<ServiceOrder>> {
        let orders = self.orders.find(&[Filter::eq("client_id", client_id)]).await?;
        Ok(most_recent_first(orders))
    }

    pub async fn list_by_vehicle(&self, vehicle_id: VehicleId) -> ServiceResult<Vec<ServiceOrder>> {
        let orders = self.orders.find(&[Filter::eq("vehicle_id", vehicle_id)]).await?;
        Ok(most_recent_first(orders))
    }

    /// Orders whose number contains `term`.
    pub async fn search_by_number(&self, term: &str) -> ServiceResult<Vec<ServiceOrder>> {
        let orders = self.orders.all().await?;
        Ok(most_recent_first(
            orders.into_iter().filter(|o| o.matches_number(term)).collect(),
        ))
    }
}

fn most_recent_first(mut orders: Vec<ServiceOrder>) -> Vec<ServiceOrder> {
    orders.sort_by(|a, b| b.opened_at().cmp(&a.opened_at()));
    orders
}
