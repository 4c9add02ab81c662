use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;

use wrenchbook_infra::Services;

use crate::app::routes::common::{authorized, ok};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new().route("/statistics", get(statistics))
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(principal): Extension<PrincipalContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "user_id": principal.user_id().to_string(),
        "roles": principal.roles().iter().map(|r| r.as_str()).collect::<Vec<_>>(),
    }))
}

/// Dashboard counters as of now.
pub async fn statistics(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    if let Err(res) = authorized(&principal, "system.read", ()) {
        return res;
    }
    ok(services.stats.statistics(Utc::now()).await)
}
