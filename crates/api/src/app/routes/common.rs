use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use wrenchbook_auth::{CommandAuthorization, Permission};
use wrenchbook_infra::services::OperationContext;
use wrenchbook_infra::ServiceResult;

use crate::app::errors;
use crate::context::PrincipalContext;

/// Small helper wrapper to associate required permissions with a command.
pub struct CmdAuth<C> {
    pub inner: C,
    pub required: Vec<Permission>,
}

impl<C> CommandAuthorization for CmdAuth<C> {
    fn required_permissions(&self) -> &[Permission] {
        &self.required
    }
}

/// Authorize `inner` for the request principal, handing the payload back on success.
pub fn authorized<C>(
    principal: &PrincipalContext,
    permission: &'static str,
    inner: C,
) -> Result<C, Response> {
    let cmd_auth = CmdAuth {
        inner,
        required: vec![Permission::new(permission)],
    };
    match crate::authz::authorize_command(principal, &cmd_auth) {
        Ok(()) => Ok(cmd_auth.inner),
        Err(e) => Err(errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string())),
    }
}

/// Operation context stamped with the acting user.
pub fn op_context(principal: &PrincipalContext) -> OperationContext {
    OperationContext::now(Some(principal.user_id()))
}

pub fn respond<T: Serialize>(status: StatusCode, result: ServiceResult<T>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub fn ok<T: Serialize>(result: ServiceResult<T>) -> Response {
    respond(StatusCode::OK, result)
}

pub fn created<T: Serialize>(result: ServiceResult<T>) -> Response {
    respond(StatusCode::CREATED, result)
}
