use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Permission;

/// Role identifier used for RBAC.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const ADMIN: &'static str = "admin";
    pub const MANAGER: &'static str = "manager";
    pub const ATTENDANT: &'static str = "attendant";
    pub const MECHANIC: &'static str = "mechanic";

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

const ATTENDANT_PERMISSIONS: &[&str] = &[
    "clients.*",
    "vehicles.*",
    "appointments.*",
    "orders.*",
    "invoices.*",
    "services.read",
    "products.read",
    "suppliers.read",
    "staff.read",
];

const MECHANIC_PERMISSIONS: &[&str] = &[
    "orders.read",
    "orders.write",
    "appointments.read",
    "clients.read",
    "vehicles.read",
    "services.read",
    "products.read",
    "stock.read",
];

/// Static role -> permission policy.
///
/// Unknown roles grant nothing.
pub fn permissions_for_roles(roles: &[Role]) -> Vec<Permission> {
    let mut out: Vec<Permission> = Vec::new();
    for role in roles {
        let granted: &[&'static str] = match role.as_str() {
            Role::ADMIN | Role::MANAGER => &["*"],
            Role::ATTENDANT => ATTENDANT_PERMISSIONS,
            Role::MECHANIC => MECHANIC_PERMISSIONS,
            _ => &[],
        };
        for name in granted {
            let perm = Permission::new(*name);
            if !out.contains(&perm) {
                out.push(perm);
            }
        }
    }
    out
}
