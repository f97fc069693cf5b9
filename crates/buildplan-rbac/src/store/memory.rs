use std::sync::Mutex;

use super::{RoleStore, UserDirectory, lock};
use crate::error::{RbacError, Result};
use crate::types::{Role, User};

/// Process-local store. State lives only as long as the value and is rebuilt
/// from the seed on every start.
#[derive(Default)]
pub struct MemoryStore {
    roles: Mutex<Vec<Role>>,
    users: Mutex<Vec<User>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn role_not_found(id: &str) -> RbacError {
    RbacError::NotFound(format!("role '{id}'"))
}

fn user_not_found(id: &str) -> RbacError {
    RbacError::NotFound(format!("user '{id}'"))
}

impl RoleStore for MemoryStore {
    fn insert_role(&self, role: &Role) -> Result<()> {
        let mut roles = lock(&self.roles)?;
        if roles.iter().any(|r| r.id == role.id) {
            return Err(RbacError::Validation(format!("role id '{}' already exists", role.id)));
        }
        if roles.iter().any(|r| r.name.eq_ignore_ascii_case(&role.name)) {
            return Err(RbacError::Validation(format!("role '{}' already exists", role.name)));
        }
        roles.push(role.clone());
        Ok(())
    }

    fn get_role(&self, id: &str) -> Result<Role> {
        lock(&self.roles)?
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| role_not_found(id))
    }

    fn list_roles(&self) -> Result<Vec<Role>> {
        Ok(lock(&self.roles)?.clone())
    }

    fn update_role(&self, role: &Role) -> Result<()> {
        let mut roles = lock(&self.roles)?;
        let stored = roles
            .iter_mut()
            .find(|r| r.id == role.id)
            .ok_or_else(|| role_not_found(&role.id))?;
        let expected = role.version.saturating_sub(1);
        if stored.version != expected {
            return Err(RbacError::VersionConflict {
                expected,
                actual: stored.version,
            });
        }
        *stored = role.clone();
        Ok(())
    }

    fn delete_role(&self, id: &str, reassign_to: Option<&str>) -> Result<usize> {
        let mut roles = lock(&self.roles)?;
        let mut users = lock(&self.users)?;
        let idx = roles
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| role_not_found(id))?;
        if roles[idx].is_system {
            return Err(RbacError::ImmutableRole(id.to_string()));
        }

        let holders = users.iter().filter(|u| u.role_id == id).count();
        if holders > 0 {
            let to = match reassign_to {
                Some(to) if to == id => {
                    return Err(RbacError::Validation(format!(
                        "cannot move users of role '{id}' onto itself"
                    )));
                }
                Some(to) if roles.iter().any(|r| r.id == to) => to,
                Some(to) => return Err(role_not_found(to)),
                None => {
                    return Err(RbacError::RoleInUse {
                        role_id: id.to_string(),
                        users: holders,
                    });
                }
            };
            for user in users.iter_mut().filter(|u| u.role_id == id) {
                user.role_id = to.to_string();
            }
        }
        roles.remove(idx);
        Ok(holders)
    }
}

impl UserDirectory for MemoryStore {
    fn add_user(&self, name: &str, role_id: &str) -> Result<User> {
        let roles = lock(&self.roles)?;
        if !roles.iter().any(|r| r.id == role_id) {
            return Err(role_not_found(role_id));
        }
        let user = User {
            id: uuid::Uuid::now_v7().to_string(),
            name: name.to_string(),
            role_id: role_id.to_string(),
        };
        lock(&self.users)?.push(user.clone());
        Ok(user)
    }

    fn get_user(&self, id: &str) -> Result<User> {
        lock(&self.users)?
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| user_not_found(id))
    }

    fn list_users(&self) -> Result<Vec<User>> {
        Ok(lock(&self.users)?.clone())
    }

    fn assign_role(&self, user_id: &str, role_id: &str) -> Result<User> {
        let roles = lock(&self.roles)?;
        if !roles.iter().any(|r| r.id == role_id) {
            return Err(role_not_found(role_id));
        }
        let mut users = lock(&self.users)?;
        let user = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| user_not_found(user_id))?;
        user.role_id = role_id.to_string();
        Ok(user.clone())
    }
}
