//! Infrastructure layer: document storage, counters, audit trail,
//! configuration and the application services that drive the domain crates.

pub mod audit;
pub mod config;
pub mod error;
pub mod services;
pub mod store;

pub use audit::{AuditEntry, AuditTrail};
pub use config::{AppConfig, ConfigError};
pub use error::{ServiceError, ServiceResult};
pub use services::{OperationContext, Services};
