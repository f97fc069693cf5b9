pub mod authority;
pub mod config;
pub mod error;
pub mod matrix;
pub mod permissions;
pub mod store;
pub mod types;

pub use authority::RoleAuthority;
pub use config::{Backend, BuildplanConfig, DeletionPolicy, RbacSettings};
pub use error::{RbacError, Result};
pub use matrix::{ActionSummary, Cell, MatrixRow, PermissionMatrix, Selection};
pub use permissions::{
    Action, ModuleId, PermissionModule, PermissionSet, RawPermissions, has_permission,
    is_valid_action, list_modules,
};
pub use store::{MemoryStore, RoleStore, SqliteStore, UserDirectory};
pub use types::*;
