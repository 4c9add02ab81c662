use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    response::Response,
    routing::{get, post},
};
use serde_json::json;

use wrenchbook_infra::Services;
use wrenchbook_scheduling::AppointmentId;

use crate::app::dto;
use crate::app::errors::parse_id;
use crate::app::routes::common::{authorized, created, ok, op_context};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_appointment).get(list_appointments))
        .route("/availability", get(availability))
        .route("/:id", get(get_appointment).patch(update_appointment))
        .route("/:id/confirm", post(confirm_appointment))
        .route("/:id/complete", post(complete_appointment))
        .route("/:id/cancel", post(cancel_appointment))
}

/// Free start times for a day, optionally sized for a catalog service.
pub async fn availability(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::AvailabilityQuery>,
) -> Response {
    if let Err(res) = authorized(&principal, "appointments.read", ()) {
        return res;
    }
    ok(services
        .appointments
        .availability(query.date, query.service)
        .await
        .map(|slots| json!({ "date": query.date, "slots": slots })))
}

pub async fn create_appointment(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateAppointmentRequest>,
) -> Response {
    let input = match authorized(&principal, "appointments.write", body.into()) {
        Ok(input) => input,
        Err(res) => return res,
    };
    created(services.appointments.create(&op_context(&principal), input).await)
}

/// A client or vehicle filter takes precedence over the day/status filters.
pub async fn list_appointments(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::AppointmentListQuery>,
) -> Response {
    if let Err(res) = authorized(&principal, "appointments.read", ()) {
        return res;
    }
    let result = match (query.client_id, query.vehicle_id) {
        (Some(client_id), _) => services.appointments.list_by_client(client_id).await,
        (None, Some(vehicle_id)) => services.appointments.list_by_vehicle(vehicle_id).await,
        (None, None) => services.appointments.list(query.date, query.status).await,
    };
    ok(result)
}

pub async fn get_appointment(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id::<AppointmentId>(&id, "appointment")
        .and_then(|id| authorized(&principal, "appointments.read", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    ok(services.appointments.get(id).await)
}

pub async fn update_appointment(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateAppointmentRequest>,
) -> Response {
    let id = match parse_id::<AppointmentId>(&id, "appointment")
        .and_then(|id| authorized(&principal, "appointments.write", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    ok(services
        .appointments
        .update(&op_context(&principal), id, body.into())
        .await)
}

pub async fn confirm_appointment(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id::<AppointmentId>(&id, "appointment")
        .and_then(|id| authorized(&principal, "appointments.write", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    ok(services.appointments.confirm(&op_context(&principal), id).await)
}

pub async fn complete_appointment(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id::<AppointmentId>(&id, "appointment")
        .and_then(|id| authorized(&principal, "appointments.write", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    ok(services.appointments.complete(&op_context(&principal), id).await)
}

pub async fn cancel_appointment(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::CancelRequest>,
) -> Response {
    let id = match parse_id::<AppointmentId>(&id, "appointment")
        .and_then(|id| authorized(&principal, "appointments.write", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    ok(services
        .appointments
        .cancel(&op_context(&principal), id, &body.reason)
        .await)
}
