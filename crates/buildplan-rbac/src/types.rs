use serde::{Deserialize, Serialize};

use crate::permissions::{self, PermissionSet, RawPermissions};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub description: String,
    pub is_system: bool,
    /// Unconditional access to ordinary screens. Only seeded system roles carry it.
    pub super_admin: bool,
    pub permissions: PermissionSet,
    pub version: u64,
    pub created_at: String,
    pub updated_at: String,
}

impl Role {
    pub fn has_permission(&self, module: &str, action: &str) -> bool {
        permissions::has_permission(&self.permissions, module, action)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub role_id: String,
}

/// The authenticated caller together with its resolved role.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user: User,
    pub role: Role,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: RawPermissions,
}

/// Partial update. `permissions`, when present, replaces the whole map.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRoleRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub permissions: Option<RawPermissions>,
    pub expected_version: Option<u64>,
}
