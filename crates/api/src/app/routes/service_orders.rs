use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    response::Response,
    routing::{delete, get, post},
};

use wrenchbook_infra::Services;
use wrenchbook_service_orders::{LineId, ServiceOrderId};

use crate::app::dto;
use crate::app::errors::parse_id;
use crate::app::routes::common::{authorized, created, ok, op_context};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(open_order).get(list_orders))
        .route("/:id", get(get_order).patch(update_details))
        .route("/:id/status", post(change_status))
        .route("/:id/services", post(add_service_line))
        .route(
            "/:id/services/:line_id",
            delete(remove_service_line).patch(update_service_line),
        )
        .route("/:id/products", post(add_product_line))
        .route("/:id/products/:line_id", delete(remove_product_line))
}

fn parse_order_and_line(
    principal: &PrincipalContext,
    id: &str,
    line_id: &str,
) -> Result<(ServiceOrderId, LineId), Response> {
    let order = parse_id::<ServiceOrderId>(id, "service order")?;
    let line = parse_id::<LineId>(line_id, "line")?;
    authorized(principal, "orders.write", (order, line))
}

pub async fn open_order(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::OpenOrderRequest>,
) -> Response {
    let input = match authorized(&principal, "orders.write", body.into()) {
        Ok(input) => input,
        Err(res) => return res,
    };
    created(services.orders.open(&op_context(&principal), input).await)
}

/// Filters: `client_id`, `vehicle_id` and `number` each select a dedicated
/// lookup; otherwise `status` and the `from`/`to` opening-date range apply.
pub async fn list_orders(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::OrderListQuery>,
) -> Response {
    if let Err(res) = authorized(&principal, "orders.read", ()) {
        return res;
    }
    let result = if let Some(client_id) = query.client_id {
        services.orders.list_by_client(client_id).await
    } else if let Some(vehicle_id) = query.vehicle_id {
        services.orders.list_by_vehicle(vehicle_id).await
    } else if let Some(number) = query.number.as_deref() {
        services.orders.search_by_number(number).await
    } else {
        services.orders.list(query.as_query()).await
    };
    ok(result)
}

pub async fn get_order(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id::<ServiceOrderId>(&id, "service order")
        .and_then(|id| authorized(&principal, "orders.read", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    ok(services.orders.get(id).await)
}

pub async fn update_details(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateOrderDetailsRequest>,
) -> Response {
    let id = match parse_id::<ServiceOrderId>(&id, "service order")
        .and_then(|id| authorized(&principal, "orders.write", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    ok(services
        .orders
        .update_details(&op_context(&principal), id, body.into())
        .await)
}

pub async fn change_status(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::ChangeStatusRequest>,
) -> Response {
    let id = match parse_id::<ServiceOrderId>(&id, "service order")
        .and_then(|id| authorized(&principal, "orders.write", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    ok(services
        .orders
        .change_status(&op_context(&principal), id, body.status)
        .await)
}

pub async fn add_service_line(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::AddServiceLineRequest>,
) -> Response {
    let id = match parse_id::<ServiceOrderId>(&id, "service order")
        .and_then(|id| authorized(&principal, "orders.write", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    created(services
        .orders
        .add_service_line(&op_context(&principal), id, body.into())
        .await)
}

pub async fn remove_service_line(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((id, line_id)): Path<(String, String)>,
) -> Response {
    let (id, line_id) = match parse_order_and_line(&principal, &id, &line_id) {
        Ok(ids) => ids,
        Err(res) => return res,
    };
    ok(services
        .orders
        .remove_service_line(&op_context(&principal), id, line_id)
        .await)
}

pub async fn update_service_line(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((id, line_id)): Path<(String, String)>,
    Json(body): Json<dto::UpdateServiceLineRequest>,
) -> Response {
    let (id, line_id) = match parse_order_and_line(&principal, &id, &line_id) {
        Ok(ids) => ids,
        Err(res) => return res,
    };
    ok(services
        .orders
        .update_service_line(&op_context(&principal), id, line_id, body.into())
        .await)
}

/// Adding a product line takes the quantity out of stock.
pub async fn add_product_line(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::AddProductLineRequest>,
) -> Response {
    let id = match parse_id::<ServiceOrderId>(&id, "service order")
        .and_then(|id| authorized(&principal, "orders.write", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    created(services
        .orders
        .add_product_line(&op_context(&principal), id, body.into())
        .await)
}

/// Removing a product line puts the quantity back into stock.
pub async fn remove_product_line(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((id, line_id)): Path<(String, String)>,
) -> Response {
    let (id, line_id) = match parse_order_and_line(&principal, &id, &line_id) {
        Ok(ids) => ids,
        Err(res) => return res,
    };
    ok(services
        .orders
        .remove_product_line(&op_context(&principal), id, line_id)
        .await)
}
