use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    response::Response,
    routing::{get, post},
};
use chrono::Utc;

use wrenchbook_infra::Services;
use wrenchbook_parties::ClientId;

use crate::app::dto;
use crate::app::errors::parse_id;
use crate::app::routes::common::{authorized, created, ok, op_context};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_client).get(list_clients))
        .route("/:id", get(get_client).patch(update_client))
        .route("/:id/deactivate", post(deactivate_client))
        .route("/:id/vehicles", get(client_vehicles))
        .route("/:id/service-orders", get(client_orders))
}

pub async fn create_client(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateClientRequest>,
) -> Response {
    let cmd = match authorized(&principal, "clients.write", body.into_command(Utc::now())) {
        Ok(cmd) => cmd,
        Err(res) => return res,
    };
    created(services.parties.create_client(&op_context(&principal), cmd).await)
}

pub async fn list_clients(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::SearchQuery>,
) -> Response {
    if let Err(res) = authorized(&principal, "clients.read", ()) {
        return res;
    }
    ok(services.parties.list_clients(query.search.as_deref()).await)
}

pub async fn get_client(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id::<ClientId>(&id, "client")
        .and_then(|id| authorized(&principal, "clients.read", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    ok(services.parties.get_client(id).await)
}

pub async fn update_client(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateClientRequest>,
) -> Response {
    let id = match parse_id::<ClientId>(&id, "client")
        .and_then(|id| authorized(&principal, "clients.write", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    ok(services
        .parties
        .update_client(&op_context(&principal), id, body.into())
        .await)
}

pub async fn deactivate_client(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id::<ClientId>(&id, "client")
        .and_then(|id| authorized(&principal, "clients.write", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    ok(services.parties.deactivate_client(&op_context(&principal), id).await)
}

pub async fn client_vehicles(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id::<ClientId>(&id, "client")
        .and_then(|id| authorized(&principal, "vehicles.read", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    ok(services.parties.list_vehicles_by_client(id).await)
}

pub async fn client_orders(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id::<ClientId>(&id, "client")
        .and_then(|id| authorized(&principal, "orders.read", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    ok(services.orders.list_by_client(id).await)
}
