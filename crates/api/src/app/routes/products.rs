use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    response::Response,
    routing::{get, post},
};
use chrono::Utc;
use serde_json::json;

use wrenchbook_infra::Services;
use wrenchbook_inventory::{MovementDirection, ProductId};

use crate::app::dto;
use crate::app::errors::{self, parse_id};
use crate::app::routes::common::{authorized, created, ok, op_context};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_product).get(list_products))
        .route("/low-stock", get(low_stock))
        .route("/:id", get(get_product).patch(update_product))
        .route("/:id/deactivate", post(deactivate_product))
        .route("/:id/movements", get(list_movements).post(move_stock))
}

/// Register a product. A positive `initial_stock` is booked as an opening
/// inbound movement right after the product is saved.
pub async fn create_product(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateProductRequest>,
) -> Response {
    let (cmd, initial_stock) =
        match authorized(&principal, "products.write", body.into_command(Utc::now())) {
            Ok(parts) => parts,
            Err(res) => return res,
        };
    let ctx = op_context(&principal);

    let product = match services.stock.create_product(&ctx, cmd).await {
        Ok(p) => p,
        Err(e) => return errors::service_error_to_response(e),
    };
    if initial_stock == 0 {
        return created(Ok(product));
    }
    created(
        services
            .stock
            .move_stock(
                &ctx,
                product.id_typed(),
                MovementDirection::In,
                initial_stock,
                "Opening stock",
            )
            .await
            .map(|(product, _)| product),
    )
}

pub async fn list_products(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::SearchQuery>,
) -> Response {
    if let Err(res) = authorized(&principal, "products.read", ()) {
        return res;
    }
    ok(services.stock.search_products(query.search.as_deref()).await)
}

pub async fn low_stock(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    if let Err(res) = authorized(&principal, "stock.read", ()) {
        return res;
    }
    ok(services.stock.low_stock().await)
}

pub async fn get_product(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id::<ProductId>(&id, "product")
        .and_then(|id| authorized(&principal, "products.read", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    ok(services.stock.get_product(id).await)
}

pub async fn update_product(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateProductRequest>,
) -> Response {
    let id = match parse_id::<ProductId>(&id, "product")
        .and_then(|id| authorized(&principal, "products.write", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    ok(services
        .stock
        .update_product(&op_context(&principal), id, body.into())
        .await)
}

pub async fn deactivate_product(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id::<ProductId>(&id, "product")
        .and_then(|id| authorized(&principal, "products.write", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    ok(services
        .stock
        .deactivate_product(&op_context(&principal), id)
        .await)
}

pub async fn list_movements(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id::<ProductId>(&id, "product")
        .and_then(|id| authorized(&principal, "stock.read", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    ok(services.stock.movements(id).await)
}

pub async fn move_stock(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::StockMovementRequest>,
) -> Response {
    let id = match parse_id::<ProductId>(&id, "product")
        .and_then(|id| authorized(&principal, "stock.write", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    created(
        services
            .stock
            .move_stock(
                &op_context(&principal),
                id,
                body.direction,
                body.quantity,
                &body.reason,
            )
            .await
            .map(|(product, movement)| json!({ "product": product, "movement": movement })),
    )
}
