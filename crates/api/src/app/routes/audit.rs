use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Query},
    response::Response,
    routing::get,
};

use wrenchbook_infra::Services;

use crate::app::dto;
use crate::app::routes::common::{authorized, ok};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new().route("/", get(list_audit))
}

pub async fn list_audit(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::AuditQuery>,
) -> Response {
    if let Err(res) = authorized(&principal, "audit.read", ()) {
        return res;
    }
    ok(services
        .audit
        .list(query.entity_id)
        .await
        .map_err(Into::into))
}
