use std::str::FromStr;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use wrenchbook_core::DomainError;
use wrenchbook_infra::ServiceError;

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Map a service failure to an HTTP response.
///
/// Domain failures are the caller's problem (400/404) and carry their
/// message. Storage failures are logged and answered with a generic 500.
pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::Store(e) => {
            tracing::error!(error = %e, "storage failure while handling request");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "internal server error",
            )
        }
    }
}

fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let code = err.kind();
    let message = err.to_string();
    match err {
        DomainError::NotFound(_) => json_error(StatusCode::NOT_FOUND, code, message),
        DomainError::Conflict { conflicting, .. } => (
            StatusCode::BAD_REQUEST,
            axum::Json(json!({
                "error": code,
                "message": message,
                "conflicting": conflicting,
            })),
        )
            .into_response(),
        DomainError::InsufficientStock {
            requested,
            available,
        } => (
            StatusCode::BAD_REQUEST,
            axum::Json(json!({
                "error": code,
                "message": message,
                "requested": requested,
                "available": available,
            })),
        )
            .into_response(),
        DomainError::Validation(_)
        | DomainError::InvalidId(_)
        | DomainError::InvalidStateTransition(_) => {
            json_error(StatusCode::BAD_REQUEST, code, message)
        }
    }
}

/// Parse a path/query identifier, answering 400 `invalid_id` on failure.
pub fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, axum::response::Response> {
    raw.parse().map_err(|_| {
        json_error(
            StatusCode::BAD_REQUEST,
            "invalid_id",
            format!("invalid {what} id"),
        )
    })
}
