use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    response::Response,
    routing::{get, post},
};
use chrono::Utc;

use wrenchbook_infra::Services;
use wrenchbook_parties::StaffId;

use crate::app::dto;
use crate::app::errors::parse_id;
use crate::app::routes::common::{authorized, created, ok, op_context};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_staff).get(list_staff))
        .route("/:id", get(get_staff))
        .route("/:id/deactivate", post(deactivate_staff))
}

pub async fn create_staff(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateStaffRequest>,
) -> Response {
    let cmd = match authorized(&principal, "staff.write", body.into_command(Utc::now())) {
        Ok(cmd) => cmd,
        Err(res) => return res,
    };
    created(services.parties.create_staff(&op_context(&principal), cmd).await)
}

pub async fn list_staff(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    if let Err(res) = authorized(&principal, "staff.read", ()) {
        return res;
    }
    ok(services.parties.list_staff().await)
}

pub async fn get_staff(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id::<StaffId>(&id, "staff")
        .and_then(|id| authorized(&principal, "staff.read", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    ok(services.parties.get_staff(id).await)
}

pub async fn deactivate_staff(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id::<StaffId>(&id, "staff")
        .and_then(|id| authorized(&principal, "staff.write", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    ok(services.parties.deactivate_staff(&op_context(&principal), id).await)
}
