use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    response::Response,
    routing::{get, post},
};

use wrenchbook_infra::Services;
use wrenchbook_invoicing::InvoiceId;

use crate::app::dto;
use crate::app::errors::parse_id;
use crate::app::routes::common::{authorized, created, ok, op_context};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(issue_invoice).get(list_invoices))
        .route("/:id", get(get_invoice))
        .route("/:id/cancel", post(cancel_invoice))
}

pub async fn issue_invoice(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::IssueInvoiceRequest>,
) -> Response {
    let body = match authorized(&principal, "invoices.write", body) {
        Ok(body) => body,
        Err(res) => return res,
    };
    created(services
        .invoices
        .issue(&op_context(&principal), body.service_order_id, body.notes)
        .await)
}

/// `?service_order_id=` answers with the order's invoice, not a list.
pub async fn list_invoices(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::InvoiceListQuery>,
) -> Response {
    if let Err(res) = authorized(&principal, "invoices.read", ()) {
        return res;
    }
    match query.service_order_id {
        Some(order_id) => ok(services.invoices.get_by_order(order_id).await),
        None => ok(services.invoices.list(query.client_id).await),
    }
}

pub async fn get_invoice(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id::<InvoiceId>(&id, "invoice")
        .and_then(|id| authorized(&principal, "invoices.read", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    ok(services.invoices.get(id).await)
}

pub async fn cancel_invoice(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::CancelRequest>,
) -> Response {
    let id = match parse_id::<InvoiceId>(&id, "invoice")
        .and_then(|id| authorized(&principal, "invoices.write", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    ok(services
        .invoices
        .cancel(&op_context(&principal), id, &body.reason)
        .await)
}
