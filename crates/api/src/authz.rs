//! API-side authorization guard for commands.
//!
//! Permissions are checked at the request boundary, before any service call,
//! so the services and domain crates stay auth-agnostic.

use wrenchbook_auth::{AuthzError, CommandAuthorization, Principal, authorize};

use crate::context::PrincipalContext;

/// Check every permission `command` requires against the request principal.
pub fn authorize_command<C: CommandAuthorization>(
    principal: &PrincipalContext,
    command: &C,
) -> Result<(), AuthzError> {
    let principal = Principal::from_roles(principal.user_id(), principal.roles().to_vec());

    for perm in command.required_permissions() {
        authorize(&principal, perm)?;
    }

    Ok(())
}
