//! Service orders domain module (the order ledger).
//!
//! A service order owns its service and product lines and a set of totals that
//! are always derived from those lines. Stock side-effects of product lines are
//! orchestrated by the application layer; this crate stays pure.

pub mod line;
pub mod number;
pub mod order;

pub use line::{LineId, LineStatus, ProductLine, ServiceLine, Totals, compute_totals};
pub use number::format_order_number;
pub use order::{
    AddProductLine, AddServiceLine, OpenServiceOrder, ServiceOrder, ServiceOrderId,
    ServiceOrderStatus, UpdateOrderDetails, UpdateServiceLine,
};
