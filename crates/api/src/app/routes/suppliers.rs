use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    response::Response,
    routing::{get, post},
};
use chrono::Utc;

use wrenchbook_infra::Services;
use wrenchbook_parties::SupplierId;

use crate::app::dto;
use crate::app::errors::parse_id;
use crate::app::routes::common::{authorized, created, ok, op_context};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_supplier).get(list_suppliers))
        .route("/:id", get(get_supplier))
        .route("/:id/products", get(supplier_products))
}

pub async fn create_supplier(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateSupplierRequest>,
) -> Response {
    let cmd = match authorized(&principal, "suppliers.write", body.into_command(Utc::now())) {
        Ok(cmd) => cmd,
        Err(res) => return res,
    };
    created(services.parties.create_supplier(&op_context(&principal), cmd).await)
}

pub async fn list_suppliers(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::SearchQuery>,
) -> Response {
    if let Err(res) = authorized(&principal, "suppliers.read", ()) {
        return res;
    }
    ok(services.parties.list_suppliers(query.search.as_deref()).await)
}

pub async fn get_supplier(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id::<SupplierId>(&id, "supplier")
        .and_then(|id| authorized(&principal, "suppliers.read", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    ok(services.parties.get_supplier(id).await)
}

pub async fn supplier_products(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id::<SupplierId>(&id, "supplier")
        .and_then(|id| authorized(&principal, "products.read", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    ok(services.stock.products_by_supplier(id).await)
}
