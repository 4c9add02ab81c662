//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: storage backend selection and service construction
//! - `routes/`: HTTP routes + handlers (one file per business area)
//! - `dto.rs`: request DTOs and their mapping to service inputs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use wrenchbook_infra::{AppConfig, Services};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Secret used when `JWT_SECRET` is unset. Never use it outside development.
pub const DEV_JWT_SECRET: &str = "dev-secret";

/// Build the full HTTP router from process configuration.
pub async fn build_app(config: AppConfig) -> anyhow::Result<Router> {
    let jwt_secret = config.jwt_secret.clone().unwrap_or_else(|| {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
        DEV_JWT_SECRET.to_string()
    });
    let services = services::build_services(&config).await?;
    Ok(router(services, jwt_secret))
}

/// Router over already-built services.
pub fn router(services: Arc<Services>, jwt_secret: String) -> Router {
    let jwt = Arc::new(wrenchbook_auth::Hs256JwtValidator::new(jwt_secret.into_bytes()));
    let auth_state = middleware::AuthState { jwt };

    // Protected routes: require a valid bearer token.
    let protected = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
}
