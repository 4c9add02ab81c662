//! Service catalog routes (labour the shop sells), not to be confused with
//! the application `Services` container.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    response::Response,
    routing::{get, post},
};
use chrono::Utc;

use wrenchbook_catalog::ServiceId;
use wrenchbook_infra::Services;

use crate::app::dto;
use crate::app::errors::parse_id;
use crate::app::routes::common::{authorized, created, ok, op_context};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_service).get(list_services))
        .route("/:id", get(get_service).patch(update_service))
        .route("/:id/deactivate", post(deactivate_service))
}

pub async fn create_service(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateServiceRequest>,
) -> Response {
    let cmd = match authorized(&principal, "services.write", body.into_command(Utc::now())) {
        Ok(cmd) => cmd,
        Err(res) => return res,
    };
    created(services.catalog.create(&op_context(&principal), cmd).await)
}

pub async fn list_services(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::SearchQuery>,
) -> Response {
    if let Err(res) = authorized(&principal, "services.read", ()) {
        return res;
    }
    ok(services.catalog.list(query.search.as_deref()).await)
}

pub async fn get_service(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id::<ServiceId>(&id, "service")
        .and_then(|id| authorized(&principal, "services.read", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    ok(services.catalog.get(id).await)
}

pub async fn update_service(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateServiceRequest>,
) -> Response {
    let id = match parse_id::<ServiceId>(&id, "service")
        .and_then(|id| authorized(&principal, "services.write", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    ok(services
        .catalog
        .update(&op_context(&principal), id, body.into())
        .await)
}

pub async fn deactivate_service(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id::<ServiceId>(&id, "service")
        .and_then(|id| authorized(&principal, "services.write", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    ok(services.catalog.deactivate(&op_context(&principal), id).await)
}
