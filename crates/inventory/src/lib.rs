//! Inventory domain module (products and their stock movements).
//!
//! This crate contains business rules for inventory, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage). A product's
//! on-hand quantity changes only through [`Product::move_stock`], which
//! always yields the [`StockMovement`] record that explains the change.

pub mod movement;
pub mod product;

pub use movement::{MoveStock, MovementDirection, OrderRef, StockMovement, StockMovementId};
pub use product::{Product, ProductId, RegisterProduct, UpdateProduct};
