use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wrenchbook_core::{AggregateId, Document, Entity, UserId};

use crate::product::ProductId;

wrenchbook_core::typed_id!(
    /// Stock movement identifier.
    StockMovementId
);

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementDirection {
    In,
    Out,
}

/// Service order that caused a movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRef {
    pub order_id: AggregateId,
    pub number: String,
}

/// Command: MoveStock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveStock {
    pub movement_id: StockMovementId,
    pub direction: MovementDirection,
    pub quantity: u32,
    pub reason: String,
    pub order: Option<OrderRef>,
    pub actor: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

/// Immutable record of one stock change.
///
/// Movements are append-only: there are no mutators, and the store layer
/// only ever inserts them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    id: StockMovementId,
    product_id: ProductId,
    direction: MovementDirection,
    quantity: u32,
    /// On-hand quantity right after this movement.
    balance_after: u32,
    reason: String,
    order: Option<OrderRef>,
    actor: Option<UserId>,
    occurred_at: DateTime<Utc>,
}

impl StockMovement {
    pub(crate) fn from_command(product_id: ProductId, balance_after: u32, cmd: MoveStock) -> Self {
        Self {
            id: cmd.movement_id,
            product_id,
            direction: cmd.direction,
            quantity: cmd.quantity,
            balance_after,
            reason: cmd.reason.trim().to_string(),
            order: cmd.order,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        }
    }

    pub fn id_typed(&self) -> StockMovementId {
        self.id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn direction(&self) -> MovementDirection {
        self.direction
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn balance_after(&self) -> u32 {
        self.balance_after
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn order(&self) -> Option<&OrderRef> {
        self.order.as_ref()
    }

    pub fn actor(&self) -> Option<UserId> {
        self.actor
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

impl Entity for StockMovement {
    type Id = StockMovementId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Document for StockMovement {
    const COLLECTION: &'static str = "stock_movements";

    fn key(&self) -> AggregateId {
        self.id.0
    }
}
