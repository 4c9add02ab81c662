use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;

use wrenchbook_infra::Services;
use wrenchbook_parties::VehicleId;

use crate::app::dto;
use crate::app::errors::{self, parse_id};
use crate::app::routes::common::{authorized, created, ok, op_context};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_vehicle).get(list_vehicles))
        .route(
            "/:id",
            get(get_vehicle).patch(update_vehicle).delete(delete_vehicle),
        )
        .route("/:id/maintenance", post(add_maintenance))
        .route("/:id/service-orders", get(vehicle_orders))
        .route("/:id/appointments", get(vehicle_appointments))
}

pub async fn create_vehicle(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateVehicleRequest>,
) -> Response {
    let cmd = match authorized(&principal, "vehicles.write", body.into_command(Utc::now())) {
        Ok(cmd) => cmd,
        Err(res) => return res,
    };
    created(services.parties.create_vehicle(&op_context(&principal), cmd).await)
}

/// `?plate=` looks a single vehicle up; `?client_id=` lists a client's fleet.
pub async fn list_vehicles(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::VehicleQuery>,
) -> Response {
    if let Err(res) = authorized(&principal, "vehicles.read", ()) {
        return res;
    }
    match (query.plate, query.client_id) {
        (Some(plate), _) => ok(services
            .parties
            .find_vehicle_by_plate(&plate)
            .await
            .map(|v| vec![v])),
        (None, Some(client_id)) => ok(services.parties.list_vehicles_by_client(client_id).await),
        (None, None) => errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "either plate or client_id is required",
        ),
    }
}

pub async fn get_vehicle(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id::<VehicleId>(&id, "vehicle")
        .and_then(|id| authorized(&principal, "vehicles.read", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    ok(services.parties.get_vehicle(id).await)
}

pub async fn update_vehicle(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateVehicleRequest>,
) -> Response {
    let id = match parse_id::<VehicleId>(&id, "vehicle")
        .and_then(|id| authorized(&principal, "vehicles.write", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    ok(services
        .parties
        .update_vehicle(&op_context(&principal), id, body.into())
        .await)
}

pub async fn delete_vehicle(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id::<VehicleId>(&id, "vehicle")
        .and_then(|id| authorized(&principal, "vehicles.write", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    match services.parties.delete_vehicle(&op_context(&principal), id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn add_maintenance(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::MaintenanceRequest>,
) -> Response {
    let id = match parse_id::<VehicleId>(&id, "vehicle")
        .and_then(|id| authorized(&principal, "vehicles.write", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    ok(services
        .parties
        .add_maintenance(&op_context(&principal), id, body.into())
        .await)
}

pub async fn vehicle_orders(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id::<VehicleId>(&id, "vehicle")
        .and_then(|id| authorized(&principal, "orders.read", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    ok(services.orders.list_by_vehicle(id).await)
}

pub async fn vehicle_appointments(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id::<VehicleId>(&id, "vehicle")
        .and_then(|id| authorized(&principal, "appointments.read", id))
    {
        Ok(id) => id,
        Err(res) => return res,
    };
    ok(services.appointments.list_by_vehicle(id).await)
}
