use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wrenchbook_core::error::require_text;
use wrenchbook_core::{AggregateId, Document, DomainError, DomainResult, Entity};
use wrenchbook_parties::SupplierId;

use crate::movement::{MoveStock, MovementDirection, StockMovement};

wrenchbook_core::typed_id!(
    /// Product identifier.
    ProductId
);

/// Entity: a stocked part or consumable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    code: String,
    name: String,
    description: Option<String>,
    category: String,
    unit: String,
    /// Prices in smallest currency unit (e.g., cents).
    cost_price: u64,
    sale_price: u64,
    stock_quantity: u32,
    min_stock: u32,
    max_stock: Option<u32>,
    location: Option<String>,
    barcode: Option<String>,
    #[serde(default)]
    supplier_id: Option<SupplierId>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Command: RegisterProduct.
///
/// Products start with zero on hand; opening stock is booked as an inbound
/// movement so that it shows up in the movement history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterProduct {
    pub product_id: ProductId,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub unit: Option<String>,
    pub cost_price: u64,
    pub sale_price: u64,
    pub min_stock: u32,
    pub max_stock: Option<u32>,
    pub location: Option<String>,
    pub barcode: Option<String>,
    pub supplier_id: Option<SupplierId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateProduct. Absent fields are left untouched; stock is not
/// editable here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateProduct {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub cost_price: Option<u64>,
    pub sale_price: Option<u64>,
    pub min_stock: Option<u32>,
    pub max_stock: Option<u32>,
    pub location: Option<String>,
    pub barcode: Option<String>,
    pub supplier_id: Option<SupplierId>,
}

fn normalize_code(raw: &str) -> DomainResult<String> {
    Ok(require_text("code", raw)?.to_uppercase())
}

fn check_stock_bounds(min: u32, max: Option<u32>) -> DomainResult<()> {
    match max {
        Some(max) if max < min => Err(DomainError::validation(
            "max_stock cannot be lower than min_stock",
        )),
        _ => Ok(()),
    }
}

impl Product {
    pub fn register(cmd: RegisterProduct) -> DomainResult<Self> {
        check_stock_bounds(cmd.min_stock, cmd.max_stock)?;
        let unit = match cmd.unit.as_deref() {
            Some(u) => require_text("unit", u)?,
            None => "UN".to_string(),
        };

        Ok(Self {
            id: cmd.product_id,
            code: normalize_code(&cmd.code)?,
            name: require_text("name", &cmd.name)?,
            description: cmd.description,
            category: require_text("category", &cmd.category)?,
            unit,
            cost_price: cmd.cost_price,
            sale_price: cmd.sale_price,
            stock_quantity: 0,
            min_stock: cmd.min_stock,
            max_stock: cmd.max_stock,
            location: cmd.location,
            barcode: cmd.barcode,
            supplier_id: cmd.supplier_id,
            active: true,
            created_at: cmd.occurred_at,
            updated_at: cmd.occurred_at,
        })
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn cost_price(&self) -> u64 {
        self.cost_price
    }

    pub fn sale_price(&self) -> u64 {
        self.sale_price
    }

    pub fn stock_quantity(&self) -> u32 {
        self.stock_quantity
    }

    pub fn min_stock(&self) -> u32 {
        self.min_stock
    }

    pub fn max_stock(&self) -> Option<u32> {
        self.max_stock
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn barcode(&self) -> Option<&str> {
        self.barcode.as_deref()
    }

    /// Supplier the part is usually bought from.
    pub fn supplier_id(&self) -> Option<SupplierId> {
        self.supplier_id
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.min_stock
    }

    /// Markup over cost in basis points (`None` when cost is zero).
    pub fn margin_bps(&self) -> Option<i64> {
        if self.cost_price == 0 {
            return None;
        }
        let cost = self.cost_price as i128;
        let sale = self.sale_price as i128;
        Some(((sale - cost) * 10_000 / cost) as i64)
    }

    /// Check that `quantity` units can be taken out right now.
    pub fn ensure_available(&self, quantity: u32) -> DomainResult<()> {
        if self.stock_quantity < quantity {
            return Err(DomainError::insufficient_stock(quantity, self.stock_quantity));
        }
        Ok(())
    }

    /// The only way on-hand quantity changes.
    ///
    /// Returns the movement record describing the change; the caller is
    /// expected to append it. On error the product is left untouched.
    pub fn move_stock(&mut self, cmd: MoveStock) -> DomainResult<StockMovement> {
        if cmd.quantity == 0 {
            return Err(DomainError::validation("quantity must be greater than zero"));
        }
        require_text("reason", &cmd.reason)?;

        let new_quantity = match cmd.direction {
            MovementDirection::In => self
                .stock_quantity
                .checked_add(cmd.quantity)
                .ok_or_else(|| DomainError::validation("stock quantity overflow"))?,
            MovementDirection::Out => {
                self.ensure_available(cmd.quantity)?;
                self.stock_quantity - cmd.quantity
            }
        };

        self.stock_quantity = new_quantity;
        self.updated_at = cmd.occurred_at;
        Ok(StockMovement::from_command(self.id, new_quantity, cmd))
    }

    pub fn update(&mut self, cmd: UpdateProduct, at: DateTime<Utc>) -> DomainResult<()> {
        let code = cmd.code.as_deref().map(normalize_code).transpose()?;
        let name = cmd.name.as_deref().map(|n| require_text("name", n)).transpose()?;
        let category = cmd
            .category
            .as_deref()
            .map(|c| require_text("category", c))
            .transpose()?;
        let unit = cmd.unit.as_deref().map(|u| require_text("unit", u)).transpose()?;
        let min_stock = cmd.min_stock.unwrap_or(self.min_stock);
        let max_stock = cmd.max_stock.or(self.max_stock);
        check_stock_bounds(min_stock, max_stock)?;

        if let Some(code) = code {
            self.code = code;
        }
        if let Some(name) = name {
            self.name = name;
        }
        if cmd.description.is_some() {
            self.description = cmd.description;
        }
        if let Some(category) = category {
            self.category = category;
        }
        if let Some(unit) = unit {
            self.unit = unit;
        }
        if let Some(cost) = cmd.cost_price {
            self.cost_price = cost;
        }
        if let Some(sale) = cmd.sale_price {
            self.sale_price = sale;
        }
        self.min_stock = min_stock;
        self.max_stock = max_stock;
        if cmd.location.is_some() {
            self.location = cmd.location;
        }
        if cmd.barcode.is_some() {
            self.barcode = cmd.barcode;
        }
        if cmd.supplier_id.is_some() {
            self.supplier_id = cmd.supplier_id;
        }
        self.updated_at = at;
        Ok(())
    }

    pub fn deactivate(&mut self, at: DateTime<Utc>) {
        self.active = false;
        self.updated_at = at;
    }

    /// Case-insensitive match on name, code or barcode.
    pub fn matches(&self, term: &str) -> bool {
        let needle = term.trim().to_lowercase();
        needle.is_empty()
            || self.name.to_lowercase().contains(&needle)
            || self.code.to_lowercase().contains(&needle)
            || self.barcode.as_deref().is_some_and(|b| b.contains(&needle))
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Document for Product {
    const COLLECTION: &'static str = "products";

    fn key(&self) -> AggregateId {
        self.id.0
    }
}
