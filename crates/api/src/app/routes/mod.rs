use axum::{Router, routing::get};

pub mod appointments;
pub mod audit;
pub mod clients;
pub mod common;
pub mod finance;
pub mod invoices;
pub mod products;
pub mod service_orders;
pub mod services;
pub mod staff;
pub mod suppliers;
pub mod system;
pub mod vehicles;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/clients", clients::router())
        .nest("/vehicles", vehicles::router())
        .nest("/staff", staff::router())
        .nest("/suppliers", suppliers::router())
        .nest("/services", services::router())
        .nest("/products", products::router())
        .nest("/appointments", appointments::router())
        .nest("/service-orders", service_orders::router())
        .nest("/invoices", invoices::router())
        .nest("/finance", finance::router())
        .nest("/audit", audit::router())
        .nest("/system", system::router())
}
