pub mod memory;
pub mod seed;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::sync::{Mutex, MutexGuard};

use crate::error::{RbacError, Result};
use crate::types::{Role, User};

/// Storage for role definitions. Implementations keep insertion order and
/// enforce the version check on `update_role`; validation belongs to the
/// authority. Both backends keep user assignments next to the roles, so
/// `delete_role` can check and move them in the same step.
pub trait RoleStore: Send + Sync {
    fn insert_role(&self, role: &Role) -> Result<()>;
    fn get_role(&self, id: &str) -> Result<Role>;
    fn list_roles(&self) -> Result<Vec<Role>>;
    /// Replace the stored role. The stored version must be `role.version - 1`.
    fn update_role(&self, role: &Role) -> Result<()>;
    /// Delete a custom role. Users still holding it are moved to
    /// `reassign_to` when given; otherwise they refuse the delete with
    /// `RoleInUse`. Nothing changes on failure. Returns how many users moved.
    fn delete_role(&self, id: &str, reassign_to: Option<&str>) -> Result<usize>;
}

/// Read/write view of the users that reference roles.
pub trait UserDirectory: Send + Sync {
    fn add_user(&self, name: &str, role_id: &str) -> Result<User>;
    fn get_user(&self, id: &str) -> Result<User>;
    fn list_users(&self) -> Result<Vec<User>>;
    fn assign_role(&self, user_id: &str, role_id: &str) -> Result<User>;
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| RbacError::Internal("store lock poisoned".into()))
}

pub(crate) fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}
