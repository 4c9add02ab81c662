use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wrenchbook_catalog::ServiceId;
use wrenchbook_core::error::require_text;
use wrenchbook_core::{AggregateId, Document, DomainError, DomainResult, Entity};
use wrenchbook_inventory::ProductId;
use wrenchbook_parties::{ClientId, StaffId, VehicleId};

use crate::line::{LineId, LineStatus, ProductLine, ServiceLine, Totals, compute_totals};

wrenchbook_core::typed_id!(
    /// Service order identifier.
    ServiceOrderId
);

/// Service order status lifecycle.
///
/// The three working states (`Open`, `InProgress`, `AwaitingParts`) move
/// freely among themselves and on to `Completed` or `Canceled`. A completed
/// order can only be `Delivered`. `Delivered` and `Canceled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceOrderStatus {
    Open,
    InProgress,
    AwaitingParts,
    Completed,
    Delivered,
    Canceled,
}

impl ServiceOrderStatus {
    pub fn is_working(self) -> bool {
        matches!(
            self,
            ServiceOrderStatus::Open
                | ServiceOrderStatus::InProgress
                | ServiceOrderStatus::AwaitingParts
        )
    }

    /// Line items, discount and details are frozen in these states.
    pub fn is_locked(self) -> bool {
        !self.is_working()
    }

    pub fn can_transition_to(self, next: ServiceOrderStatus) -> bool {
        use ServiceOrderStatus::*;
        match (self, next) {
            (from, to) if from.is_working() && to.is_working() => from != to,
            (from, Completed | Canceled) if from.is_working() => true,
            (Completed, Delivered) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceOrderStatus::Open => "open",
            ServiceOrderStatus::InProgress => "in_progress",
            ServiceOrderStatus::AwaitingParts => "awaiting_parts",
            ServiceOrderStatus::Completed => "completed",
            ServiceOrderStatus::Delivered => "delivered",
            ServiceOrderStatus::Canceled => "canceled",
        }
    }
}

/// Aggregate root: ServiceOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceOrder {
    id: ServiceOrderId,
    number: String,
    client_id: ClientId,
    vehicle_id: VehicleId,
    status: ServiceOrderStatus,
    opened_at: DateTime<Utc>,
    expected_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    mileage: Option<u32>,
    diagnosis: Option<String>,
    customer_notes: Option<String>,
    internal_notes: Option<String>,
    responsible_id: Option<StaffId>,
    payment_method: Option<String>,
    installments: u8,
    invoice_id: Option<AggregateId>,
    service_lines: Vec<ServiceLine>,
    product_lines: Vec<ProductLine>,
    totals: Totals,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Command: OpenServiceOrder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenServiceOrder {
    pub order_id: ServiceOrderId,
    pub number: String,
    pub client_id: ClientId,
    pub vehicle_id: VehicleId,
    pub mileage: Option<u32>,
    pub diagnosis: Option<String>,
    pub customer_notes: Option<String>,
    pub internal_notes: Option<String>,
    pub expected_at: Option<DateTime<Utc>>,
    pub responsible_id: Option<StaffId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddServiceLine (defaults already resolved from the catalog).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddServiceLine {
    pub line_id: LineId,
    pub service_id: ServiceId,
    pub description: String,
    pub price: u64,
    pub mechanic_id: Option<StaffId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddProductLine (defaults already resolved from the product).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddProductLine {
    pub line_id: LineId,
    pub product_id: ProductId,
    pub description: String,
    pub quantity: u32,
    pub unit_price: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateServiceLine. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateServiceLine {
    pub status: Option<LineStatus>,
    pub minutes_spent: Option<u32>,
    pub mechanic_id: Option<StaffId>,
}

/// Command: UpdateOrderDetails. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateOrderDetails {
    pub expected_at: Option<DateTime<Utc>>,
    pub diagnosis: Option<String>,
    pub customer_notes: Option<String>,
    pub internal_notes: Option<String>,
    pub responsible_id: Option<StaffId>,
    pub discount: Option<u64>,
    pub payment_method: Option<String>,
    pub installments: Option<u8>,
}

impl ServiceOrder {
    pub fn open(cmd: OpenServiceOrder) -> DomainResult<Self> {
        Ok(Self {
            id: cmd.order_id,
            number: require_text("number", &cmd.number)?,
            client_id: cmd.client_id,
            vehicle_id: cmd.vehicle_id,
            status: ServiceOrderStatus::Open,
            opened_at: cmd.occurred_at,
            expected_at: cmd.expected_at,
            completed_at: None,
            mileage: cmd.mileage,
            diagnosis: cmd.diagnosis,
            customer_notes: cmd.customer_notes,
            internal_notes: cmd.internal_notes,
            responsible_id: cmd.responsible_id,
            payment_method: None,
            installments: 1,
            invoice_id: None,
            service_lines: Vec::new(),
            product_lines: Vec::new(),
            totals: Totals::default(),
            created_at: cmd.occurred_at,
            updated_at: cmd.occurred_at,
        })
    }

    pub fn id_typed(&self) -> ServiceOrderId {
        self.id
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn vehicle_id(&self) -> VehicleId {
        self.vehicle_id
    }

    pub fn status(&self) -> ServiceOrderStatus {
        self.status
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    pub fn expected_at(&self) -> Option<DateTime<Utc>> {
        self.expected_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn mileage(&self) -> Option<u32> {
        self.mileage
    }

    pub fn diagnosis(&self) -> Option<&str> {
        self.diagnosis.as_deref()
    }

    pub fn customer_notes(&self) -> Option<&str> {
        self.customer_notes.as_deref()
    }

    pub fn internal_notes(&self) -> Option<&str> {
        self.internal_notes.as_deref()
    }

    pub fn responsible_id(&self) -> Option<StaffId> {
        self.responsible_id
    }

    pub fn payment_method(&self) -> Option<&str> {
        self.payment_method.as_deref()
    }

    pub fn installments(&self) -> u8 {
        self.installments
    }

    pub fn invoice_id(&self) -> Option<AggregateId> {
        self.invoice_id
    }

    pub fn service_lines(&self) -> &[ServiceLine] {
        &self.service_lines
    }

    pub fn product_lines(&self) -> &[ProductLine] {
        &self.product_lines
    }

    pub fn product_line(&self, line_id: LineId) -> Option<&ProductLine> {
        self.product_lines.iter().find(|l| l.line_id == line_id)
    }

    pub fn totals(&self) -> Totals {
        self.totals
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Reject edits once the order is finished or canceled.
    pub fn ensure_editable(&self) -> DomainResult<()> {
        if self.status.is_locked() {
            return Err(DomainError::invalid_transition(format!(
                "service order {} is {} and can no longer be edited",
                self.number,
                self.status.as_str()
            )));
        }
        Ok(())
    }

    pub fn add_service_line(&mut self, cmd: AddServiceLine) -> DomainResult<&ServiceLine> {
        self.ensure_editable()?;
        let line = ServiceLine {
            line_id: cmd.line_id,
            service_id: cmd.service_id,
            description: require_text("description", &cmd.description)?,
            price: cmd.price,
            mechanic_id: cmd.mechanic_id,
            minutes_spent: None,
            status: LineStatus::Pending,
        };

        let mut lines = self.service_lines.clone();
        lines.push(line);
        let totals = compute_totals(&lines, &self.product_lines, self.totals.discount)?;

        self.service_lines = lines;
        self.totals = totals;
        self.updated_at = cmd.occurred_at;
        Ok(&self.service_lines[self.service_lines.len() - 1])
    }

    pub fn add_product_line(&mut self, cmd: AddProductLine) -> DomainResult<&ProductLine> {
        self.ensure_editable()?;
        if cmd.quantity == 0 {
            return Err(DomainError::validation("quantity must be greater than zero"));
        }
        let line_total = u64::from(cmd.quantity)
            .checked_mul(cmd.unit_price)
            .ok_or_else(|| DomainError::validation("line total is too large"))?;
        let line = ProductLine {
            line_id: cmd.line_id,
            product_id: cmd.product_id,
            description: require_text("description", &cmd.description)?,
            quantity: cmd.quantity,
            unit_price: cmd.unit_price,
            line_total,
        };

        let mut lines = self.product_lines.clone();
        lines.push(line);
        let totals = compute_totals(&self.service_lines, &lines, self.totals.discount)?;

        self.product_lines = lines;
        self.totals = totals;
        self.updated_at = cmd.occurred_at;
        Ok(&self.product_lines[self.product_lines.len() - 1])
    }

    /// Remove a service line. Fails if that would leave the discount above
    /// the remaining subtotal.
    pub fn remove_service_line(
        &mut self,
        line_id: LineId,
        at: DateTime<Utc>,
    ) -> DomainResult<ServiceLine> {
        self.ensure_editable()?;
        let idx = self
            .service_lines
            .iter()
            .position(|l| l.line_id == line_id)
            .ok_or_else(|| DomainError::not_found("service line"))?;

        let mut lines = self.service_lines.clone();
        let removed = lines.remove(idx);
        let totals = compute_totals(&lines, &self.product_lines, self.totals.discount)?;

        self.service_lines = lines;
        self.totals = totals;
        self.updated_at = at;
        Ok(removed)
    }

    /// Remove a product line. Stock restoration is the caller's job.
    pub fn remove_product_line(
        &mut self,
        line_id: LineId,
        at: DateTime<Utc>,
    ) -> DomainResult<ProductLine> {
        self.ensure_editable()?;
        let idx = self
            .product_lines
            .iter()
            .position(|l| l.line_id == line_id)
            .ok_or_else(|| DomainError::not_found("product line"))?;

        let mut lines = self.product_lines.clone();
        let removed = lines.remove(idx);
        let totals = compute_totals(&self.service_lines, &lines, self.totals.discount)?;

        self.product_lines = lines;
        self.totals = totals;
        self.updated_at = at;
        Ok(removed)
    }

    pub fn update_service_line(
        &mut self,
        line_id: LineId,
        cmd: UpdateServiceLine,
        at: DateTime<Utc>,
    ) -> DomainResult<&ServiceLine> {
        self.ensure_editable()?;
        let line = self
            .service_lines
            .iter_mut()
            .find(|l| l.line_id == line_id)
            .ok_or_else(|| DomainError::not_found("service line"))?;

        if let Some(status) = cmd.status {
            line.status = status;
        }
        if cmd.minutes_spent.is_some() {
            line.minutes_spent = cmd.minutes_spent;
        }
        if cmd.mechanic_id.is_some() {
            line.mechanic_id = cmd.mechanic_id;
        }
        self.updated_at = at;
        Ok(line)
    }

    pub fn update_details(&mut self, cmd: UpdateOrderDetails, at: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_editable()?;
        if cmd.installments == Some(0) {
            return Err(DomainError::validation("installments must be at least 1"));
        }
        let totals = match cmd.discount {
            Some(discount) => compute_totals(&self.service_lines, &self.product_lines, discount)?,
            None => self.totals,
        };

        if cmd.expected_at.is_some() {
            self.expected_at = cmd.expected_at;
        }
        if cmd.diagnosis.is_some() {
            self.diagnosis = cmd.diagnosis;
        }
        if cmd.customer_notes.is_some() {
            self.customer_notes = cmd.customer_notes;
        }
        if cmd.internal_notes.is_some() {
            self.internal_notes = cmd.internal_notes;
        }
        if cmd.responsible_id.is_some() {
            self.responsible_id = cmd.responsible_id;
        }
        if cmd.payment_method.is_some() {
            self.payment_method = cmd.payment_method;
        }
        if let Some(installments) = cmd.installments {
            self.installments = installments;
        }
        self.totals = totals;
        self.updated_at = at;
        Ok(())
    }

    /// Move to `next`. Completing stamps the completion time.
    pub fn transition_to(&mut self, next: ServiceOrderStatus, at: DateTime<Utc>) -> DomainResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::invalid_transition(format!(
                "service order cannot move from {} to {}",
                self.status.as_str(),
                next.as_str()
            )));
        }
        if next == ServiceOrderStatus::Completed {
            self.completed_at = Some(at);
        }
        self.status = next;
        self.updated_at = at;
        Ok(())
    }

    /// Whether an invoice may be issued for this order right now.
    pub fn ensure_invoiceable(&self) -> DomainResult<()> {
        if !matches!(
            self.status,
            ServiceOrderStatus::Completed | ServiceOrderStatus::Delivered
        ) {
            return Err(DomainError::invalid_transition(format!(
                "only completed or delivered orders can be invoiced (current: {})",
                self.status.as_str()
            )));
        }
        if self.invoice_id.is_some() {
            return Err(DomainError::validation(format!(
                "service order {} already has an invoice",
                self.number
            )));
        }
        Ok(())
    }

    pub fn attach_invoice(&mut self, invoice_id: AggregateId, at: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_invoiceable()?;
        self.invoice_id = Some(invoice_id);
        self.updated_at = at;
        Ok(())
    }

    pub fn detach_invoice(&mut self, at: DateTime<Utc>) {
        self.invoice_id = None;
        self.updated_at = at;
    }

    pub fn matches_number(&self, term: &str) -> bool {
        self.number.contains(term.trim())
    }
}

impl Entity for ServiceOrder {
    type Id = ServiceOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Document for ServiceOrder {
    const COLLECTION: &'static str = "service_orders";

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

    fn test_order() -> ServiceOrder {
        ServiceOrder::open(OpenServiceOrder {
            order_id: ServiceOrderId::generate(),
            number: "000001/032026".to_string(),
            client_id: ClientId::generate(),
            vehicle_id: VehicleId::generate(),
            mileage: Some(50_000),
            diagnosis: None,
            customer_notes: None,
            internal_notes: None,
            expected_at: None,
            responsible_id: None,
            occurred_at: test_time(),
        })
        .unwrap()
    }

    fn service_cmd(price: u64) -> AddServiceLine {
        AddServiceLine {
            line_id: LineId::generate(),
            service_id: ServiceId::generate(),
            description: "Alignment".to_string(),
            price,
            mechanic_id: None,
            occurred_at: test_time(),
        }
    }

    fn product_cmd(quantity: u32, unit_price: u64) -> AddProductLine {
        AddProductLine {
            line_id: LineId::generate(),
            product_id: ProductId::generate(),
            description: "Brake pad".to_string(),
            quantity,
            unit_price,
            occurred_at: test_time(),
        }
    }

    fn assert_totals_consistent(order: &ServiceOrder) {
        let services: u64 = order.service_lines().iter().map(|l| l.price).sum();
        let products: u64 = order.product_lines().iter().map(|l| l.line_total).sum();
        let totals = order.totals();
        assert_eq!(totals.services, services);
        assert_eq!(totals.products, products);
        assert_eq!(totals.grand_total, services + products - totals.discount);
    }

    #[test]
    fn open_order_starts_empty_and_open() {
        let order = test_order();
        assert_eq!(order.status(), ServiceOrderStatus::Open);
        assert_eq!(order.totals(), Totals::default());
        assert_eq!(order.installments(), 1);
    }

    #[test]
    fn adding_lines_recomputes_totals() {
        let mut order = test_order();
        order.add_service_line(service_cmd(8_000)).unwrap();
        let line = order.add_product_line(product_cmd(3, 2_500)).unwrap();
        assert_eq!(line.line_total, 7_500);

        assert_eq!(order.totals().services, 8_000);
        assert_eq!(order.totals().products, 7_500);
        assert_eq!(order.totals().grand_total, 15_500);
        assert_totals_consistent(&order);
    }

    #[test]
    fn zero_quantity_product_line_is_rejected() {
        let mut order = test_order();
        let result = order.add_product_line(product_cmd(0, 100));
        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert!(order.product_lines().is_empty());
    }

    #[test]
    fn removing_unknown_line_is_not_found() {
        let mut order = test_order();
        let err = order.remove_product_line(LineId::generate(), test_time()).unwrap_err();
        assert_eq!(err, DomainError::not_found("product line"));
        let err = order.remove_service_line(LineId::generate(), test_time()).unwrap_err();
        assert_eq!(err, DomainError::not_found("service line"));
    }

    #[test]
    fn removing_line_below_discount_is_rejected() {
        let mut order = test_order();
        let line_id = order.add_service_line(service_cmd(5_000)).unwrap().line_id;
        order.add_service_line(service_cmd(1_000)).unwrap();
        order
            .update_details(
                UpdateOrderDetails {
                    discount: Some(2_000),
                    ..UpdateOrderDetails::default()
                },
                test_time(),
            )
            .unwrap();
        let before = order.clone();

        let err = order.remove_service_line(line_id, test_time()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(order, before);
    }

    #[test]
    fn discount_cannot_exceed_subtotal() {
        let mut order = test_order();
        order.add_service_line(service_cmd(1_000)).unwrap();
        let result = order.update_details(
            UpdateOrderDetails {
                discount: Some(1_001),
                ..UpdateOrderDetails::default()
            },
            test_time(),
        );
        assert!(result.is_err());
        assert_eq!(order.totals().discount, 0);
    }

    #[test]
    fn zero_installments_rejected() {
        let mut order = test_order();
        let result = order.update_details(
            UpdateOrderDetails {
                installments: Some(0),
                ..UpdateOrderDetails::default()
            },
            test_time(),
        );
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn completing_stamps_completion_time_and_locks_edits() {
        let mut order = test_order();
        let done_at = test_time();
        order.transition_to(ServiceOrderStatus::InProgress, done_at).unwrap();
        order.transition_to(ServiceOrderStatus::Completed, done_at).unwrap();
        assert_eq!(order.completed_at(), Some(done_at));

        let before = order.clone();
        assert!(matches!(
            order.add_service_line(service_cmd(100)),
            Err(DomainError::InvalidStateTransition(_))
        ));
        assert!(matches!(
            order.add_product_line(product_cmd(1, 100)),
            Err(DomainError::InvalidStateTransition(_))
        ));
        assert_eq!(order, before);
    }

    #[test]
    fn canceling_a_completed_order_fails_and_leaves_it_unchanged() {
        let mut order = test_order();
        order.transition_to(ServiceOrderStatus::Completed, test_time()).unwrap();
        let before = order.clone();

        let err = order
            .transition_to(ServiceOrderStatus::Canceled, test_time())
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidStateTransition(_)));
        assert_eq!(order, before);
    }

    #[test]
    fn transition_table() {
        use ServiceOrderStatus::*;
        assert!(Open.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(AwaitingParts));
        assert!(AwaitingParts.can_transition_to(Open));
        assert!(AwaitingParts.can_transition_to(Canceled));
        assert!(Completed.can_transition_to(Delivered));
        assert!(!Open.can_transition_to(Open));
        assert!(!Open.can_transition_to(Delivered));
        assert!(!Completed.can_transition_to(InProgress));
        assert!(!Delivered.can_transition_to(Canceled));
        assert!(!Canceled.can_transition_to(Open));
    }

    #[test]
    fn invoice_requires_finished_order_and_is_single() {
        let mut order = test_order();
        assert!(matches!(
            order.attach_invoice(AggregateId::new(), test_time()),
            Err(DomainError::InvalidStateTransition(_))
        ));

        order.transition_to(ServiceOrderStatus::Completed, test_time()).unwrap();
        order.attach_invoice(AggregateId::new(), test_time()).unwrap();
        assert!(matches!(
            order.attach_invoice(AggregateId::new(), test_time()),
            Err(DomainError::Validation(_))
        ));

        order.detach_invoice(test_time());
        assert!(order.invoice_id().is_none());
        order.transition_to(ServiceOrderStatus::Delivered, test_time()).unwrap();
        order.attach_invoice(AggregateId::new(), test_time()).unwrap();
    }

    #[test]
    fn service_line_progress_updates() {
        let mut order = test_order();
        let line_id = order.add_service_line(service_cmd(100)).unwrap().line_id;
        let line = order
            .update_service_line(
                line_id,
                UpdateServiceLine {
                    status: Some(LineStatus::Done),
                    minutes_spent: Some(40),
                    mechanic_id: None,
                },
                test_time(),
            )
            .unwrap();
        assert_eq!(line.status, LineStatus::Done);
        assert_eq!(line.minutes_spent, Some(40));
    }

    #[test]
    fn document_round_trips_through_json() {
        let mut order = test_order();
        order.add_product_line(product_cmd(2, 300)).unwrap();
        order.transition_to(ServiceOrderStatus::AwaitingParts, test_time()).unwrap();

        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["status"], "awaiting_parts");
        let back: ServiceOrder = serde_json::from_value(json).unwrap();
        assert_eq!(back, order);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            AddService(u64),
            AddProduct(u32, u64),
            RemoveService(usize),
            RemoveProduct(usize),
            Discount(u64),
        }

        fn op_strategy() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0u64..100_000).prop_map(Op::AddService),
                (1u32..20, 0u64..50_000).prop_map(|(q, p)| Op::AddProduct(q, p)),
                (0usize..8).prop_map(Op::RemoveService),
                (0usize..8).prop_map(Op::RemoveProduct),
                (0u64..200_000).prop_map(Op::Discount),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: totals always equal the sums of the current lines minus
            /// the discount, whatever sequence of edits was applied (failed edits
            /// included).
            #[test]
            fn totals_track_lines(ops in prop::collection::vec(op_strategy(), 0..40)) {
                let mut order = test_order();
                for op in ops {
                    let _ = match op {
                        Op::AddService(price) => order.add_service_line(service_cmd(price)).map(|_| ()),
                        Op::AddProduct(q, p) => order.add_product_line(product_cmd(q, p)).map(|_| ()),
                        Op::RemoveService(i) => match order.service_lines().get(i).map(|l| l.line_id) {
                            Some(id) => order.remove_service_line(id, test_time()).map(|_| ()),
                            None => Ok(()),
                        },
                        Op::RemoveProduct(i) => match order.product_lines().get(i).map(|l| l.line_id) {
                            Some(id) => order.remove_product_line(id, test_time()).map(|_| ()),
                            None => Ok(()),
                        },
                        Op::Discount(d) => order.update_details(
                            UpdateOrderDetails { discount: Some(d), ..UpdateOrderDetails::default() },
                            test_time(),
                        ),
                    };

                    let services: u64 = order.service_lines().iter().map(|l| l.price).sum();
                    let products: u64 = order.product_lines().iter().map(|l| l.line_total).sum();
                    let totals = order.totals();
                    prop_assert_eq!(totals.services, services);
                    prop_assert_eq!(totals.products, products);
                    prop_assert!(totals.discount <= services + products);
                    prop_assert_eq!(totals.grand_total, services + products - totals.discount);
                    for line in order.product_lines() {
                        prop_assert_eq!(line.line_total, u64::from(line.quantity) * line.unit_price);
                    }
                }
            }
        }
    }
}
