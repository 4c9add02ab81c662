//! Service catalog domain module.
//!
//! Catalog entries describe the work the shop sells: a price and an estimated
//! duration. Scheduling reads the duration; service orders copy the price.

pub mod service;

pub use service::{RegisterService, Service, ServiceId, UpdateService};
