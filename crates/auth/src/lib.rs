//! `wrenchbook-auth`: authentication and authorization boundary.
//!
//! Decoupled from HTTP and storage: the API layer extracts a bearer token,
//! hands it to a [`JwtValidator`] and checks [`Permission`]s on the resulting
//! [`Principal`].

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{AuthzError, CommandAuthorization, authorize};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use permissions::Permission;
pub use principal::Principal;
pub use roles::{Role, permissions_for_roles};
