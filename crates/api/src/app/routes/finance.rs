use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    response::Response,
    routing::{get, post},
};
use chrono::Utc;

use wrenchbook_accounting::FinancialEntryId;
use wrenchbook_infra::Services;

use crate::app::dto;
use crate::app::errors::parse_id;
use crate::app::routes::common::{authorized, created, ok, op_context};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/entries", post(create_entry).get(list_entries))
        .route("/entries/:id", get(get_entry).patch(update_entry))
        .route("/entries/:id/payment", post(register_payment))
        .route("/entries/:id/cancel", post(cancel_entry))
        .route("/summary", get(summary))
}

pub async fn create_entry(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateEntryRequest>,
) -> Response {
    let cmd = match authorized(&principal, "finance.write", body.into_command(Utc::now())) {
        Ok(cmd) => cmd,
        Err(res) => return res,
    };
    created(services.finance.create(&op_context(&principal), cmd).await)
}

pub async fn list_entries(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::EntryListQuery>,
) -> Response {
    if let Err(res) = authorized(&principal, "finance.read", ()) {
        return res;
    }
    ok(services
        .finance
        .list(query.into(), Utc::now().date_naive())
        .await)
}

pub async fn get_entry(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id::<FinancialEntryId>(&id, "financial entry")
        .and_then(|id| authorized(&principal, "finance.read", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    ok(services.finance.get(id, Utc::now().date_naive()).await)
}

pub async fn update_entry(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateEntryRequest>,
) -> Response {
    let id = match parse_id::<FinancialEntryId>(&id, "financial entry")
        .and_then(|id| authorized(&principal, "finance.write", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    ok(services
        .finance
        .update(&op_context(&principal), id, body.into())
        .await)
}

pub async fn register_payment(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::PaymentRequest>,
) -> Response {
    let id = match parse_id::<FinancialEntryId>(&id, "financial entry")
        .and_then(|id| authorized(&principal, "finance.write", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    ok(services
        .finance
        .register_payment(&op_context(&principal), id, body.into())
        .await)
}

pub async fn cancel_entry(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id::<FinancialEntryId>(&id, "financial entry")
        .and_then(|id| authorized(&principal, "finance.write", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    ok(services.finance.cancel(&op_context(&principal), id).await)
}

/// Cash-basis totals of paid entries within `[from, to]`.
pub async fn summary(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::SummaryQuery>,
) -> Response {
    if let Err(res) = authorized(&principal, "finance.read", ()) {
        return res;
    }
    ok(services.finance.summary(query.from, query.to).await)
}
