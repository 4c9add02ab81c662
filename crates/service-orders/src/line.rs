use serde::{Deserialize, Serialize};

use wrenchbook_catalog::ServiceId;
use wrenchbook_core::{DomainError, DomainResult};
use wrenchbook_inventory::ProductId;
use wrenchbook_parties::StaffId;

wrenchbook_core::typed_id!(
    /// Identifier of a line inside a service order.
    LineId
);

/// Progress of a single service line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStatus {
    Pending,
    InProgress,
    Done,
}

/// Labour line: one catalog service performed on the vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceLine {
    pub line_id: LineId,
    pub service_id: ServiceId,
    pub description: String,
    /// Price in smallest currency unit (e.g., cents).
    pub price: u64,
    pub mechanic_id: Option<StaffId>,
    pub minutes_spent: Option<u32>,
    pub status: LineStatus,
}

/// Parts line: a quantity of one product taken out of stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductLine {
    pub line_id: LineId,
    pub product_id: ProductId,
    pub description: String,
    pub quantity: u32,
    pub unit_price: u64,
    /// Always `quantity * unit_price`.
    pub line_total: u64,
}

/// Derived money figures of an order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub services: u64,
    pub products: u64,
    pub discount: u64,
    pub grand_total: u64,
}

impl Totals {
    pub fn subtotal(&self) -> u64 {
        self.services + self.products
    }
}

fn overflow() -> DomainError {
    DomainError::validation("order amount is too large")
}

/// Derive totals from line items and a discount.
///
/// Fails when the discount exceeds the subtotal or an amount overflows.
pub fn compute_totals(
    service_lines: &[ServiceLine],
    product_lines: &[ProductLine],
    discount: u64,
) -> DomainResult<Totals> {
    let services = service_lines
        .iter()
        .try_fold(0u64, |acc, l| acc.checked_add(l.price))
        .ok_or_else(overflow)?;
    let products = product_lines
        .iter()
        .try_fold(0u64, |acc, l| acc.checked_add(l.line_total))
        .ok_or_else(overflow)?;
    let subtotal = services.checked_add(products).ok_or_else(overflow)?;

    let grand_total = subtotal.checked_sub(discount).ok_or_else(|| {
        DomainError::validation(format!(
            "discount ({discount}) cannot exceed the order subtotal ({subtotal})"
        ))
    })?;

    Ok(Totals {
        services,
        products,
        discount,
        grand_total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_line(price: u64) -> ServiceLine {
        ServiceLine {
            line_id: LineId::generate(),
            service_id: ServiceId::generate(),
            description: "labour".to_string(),
            price,
            mechanic_id: None,
            minutes_spent: None,
            status: LineStatus::Pending,
        }
    }

    fn product_line(quantity: u32, unit_price: u64) -> ProductLine {
        ProductLine {
            line_id: LineId::generate(),
            product_id: ProductId::generate(),
            description: "part".to_string(),
            quantity,
            unit_price,
            line_total: u64::from(quantity) * unit_price,
        }
    }

    #[test]
    fn totals_sum_lines_and_subtract_discount() {
        let totals = compute_totals(
            &[service_line(10_000), service_line(5_000)],
            &[product_line(2, 1_500)],
            2_000,
        )
        .unwrap();

        assert_eq!(totals.services, 15_000);
        assert_eq!(totals.products, 3_000);
        assert_eq!(totals.subtotal(), 18_000);
        assert_eq!(totals.grand_total, 16_000);
    }

    #[test]
    fn discount_above_subtotal_is_rejected() {
        let err = compute_totals(&[service_line(100)], &[], 101).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn empty_order_totals_are_zero() {
        assert_eq!(compute_totals(&[], &[], 0).unwrap(), Totals::default());
    }
}
