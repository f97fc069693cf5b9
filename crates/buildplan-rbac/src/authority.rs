//! Role repository and access authority.
//!
//! `RoleAuthority` is the single gate every screen goes through: it owns role
//! validation, system-role protection, the deletion policy and the access
//! checks. Storage is reached only through [`RoleStore`] and [`UserDirectory`].

use std::sync::Arc;

use crate::config::{DeletionPolicy, RbacSettings};
use crate::error::{RbacError, Result};
use crate::matrix::PermissionMatrix;
use crate::permissions::{self, Action, ModuleId, PermissionModule, PermissionSet};
use crate::store::{RoleStore, UserDirectory, now};
use crate::types::{Actor, CreateRoleRequest, Role, UpdateRoleRequest, User};

pub struct RoleAuthority {
    store: Arc<dyn RoleStore>,
    directory: Arc<dyn UserDirectory>,
    deletion_policy: DeletionPolicy,
    fallback_role: String,
}

impl RoleAuthority {
    pub fn new(
        store: Arc<dyn RoleStore>,
        directory: Arc<dyn UserDirectory>,
        settings: &RbacSettings,
    ) -> Self {
        Self {
            store,
            directory,
            deletion_policy: settings.deletion_policy,
            fallback_role: settings.fallback_role.clone(),
        }
    }

    /// Build an authority and run `seed` against its store. The reassign
    /// policy's fallback role must exist once seeding is done and must not
    /// carry the super-admin capability.
    pub fn bootstrap<F>(
        store: Arc<dyn RoleStore>,
        directory: Arc<dyn UserDirectory>,
        settings: &RbacSettings,
        seed: F,
    ) -> Result<Self>
    where
        F: FnOnce(&dyn RoleStore) -> Result<()>,
    {
        seed(store.as_ref())?;
        let authority = Self::new(store, directory, settings);
        if authority.deletion_policy == DeletionPolicy::Reassign {
            let fallback = authority.get_role(&authority.fallback_role).map_err(|_| {
                RbacError::Config(format!(
                    "fallback role '{}' does not exist",
                    authority.fallback_role
                ))
            })?;
            if fallback.super_admin {
                return Err(RbacError::Config(format!(
                    "fallback role '{}' must not be an administrator role",
                    fallback.id
                )));
            }
        }
        Ok(authority)
    }

    // ── Schema ─────────────────────────────────────────────────

    pub fn list_modules(&self) -> &'static [PermissionModule] {
        permissions::list_modules()
    }

    // ── Roles ──────────────────────────────────────────────────

    pub fn list_roles(&self) -> Result<Vec<Role>> {
        self.store.list_roles()
    }

    pub fn get_role(&self, id: &str) -> Result<Role> {
        self.store.get_role(id)
    }

    /// Never fails: unknown modules, actions and undeclared pairs read as denied.
    pub fn has_permission(role: &Role, module: &str, action: &str) -> bool {
        role.has_permission(module, action)
    }

    pub fn create_custom_role(&self, req: CreateRoleRequest) -> Result<Role> {
        let name = self.validate_name(&req.name, None)?;
        let permissions = PermissionSet::validate(&req.permissions)?;
        let ts = now();
        let role = Role {
            id: uuid::Uuid::now_v7().to_string(),
            name,
            description: req.description.unwrap_or_default(),
            is_system: false,
            super_admin: false,
            permissions,
            version: 1,
            created_at: ts.clone(),
            updated_at: ts,
        };
        self.store.insert_role(&role)?;
        tracing::info!(role = %role.id, name = %role.name, "created custom role");
        Ok(role)
    }

    /// Apply `req` to a custom role. A supplied permission map replaces the
    /// stored one entirely. Nothing is written unless every check passes.
    pub fn update_role(&self, id: &str, req: UpdateRoleRequest) -> Result<Role> {
        let current = self.store.get_role(id)?;
        if current.is_system {
            tracing::warn!(role = %id, "refused update of system role");
            return Err(RbacError::ImmutableRole(id.to_string()));
        }
        if let Some(expected) = req.expected_version {
            if expected != current.version {
                return Err(RbacError::VersionConflict {
                    expected,
                    actual: current.version,
                });
            }
        }

        let mut next = current.clone();
        if let Some(ref name) = req.name {
            next.name = self.validate_name(name, Some(id))?;
        }
        if let Some(description) = req.description {
            next.description = description;
        }
        if let Some(ref raw) = req.permissions {
            next.permissions = PermissionSet::validate(raw)?;
        }
        next.version = current.version + 1;
        next.updated_at = now();

        self.store.update_role(&next)?;
        tracing::info!(role = %id, version = next.version, "updated role");
        Ok(next)
    }

    /// Delete a custom role. The in-use check and any reassignment run in
    /// the same store step as the delete.
    pub fn delete_role(&self, id: &str) -> Result<()> {
        let role = self.store.get_role(id)?;
        if role.is_system {
            tracing::warn!(role = %id, "refused deletion of system role");
            return Err(RbacError::ImmutableRole(id.to_string()));
        }

        let reassign_to = match self.deletion_policy {
            DeletionPolicy::Block => None,
            DeletionPolicy::Reassign => {
                if self.fallback_role == id {
                    return Err(RbacError::Validation(format!(
                        "role '{id}' is the fallback role and cannot be deleted"
                    )));
                }
                self.store.get_role(&self.fallback_role)?;
                Some(self.fallback_role.as_str())
            }
        };

        let moved = self.store.delete_role(id, reassign_to).inspect_err(|e| {
            if let RbacError::RoleInUse { users, .. } = e {
                tracing::warn!(role = %id, users = *users, "refused deletion of role in use");
            }
        })?;
        if moved > 0 {
            tracing::info!(role = %id, to = %self.fallback_role, moved, "reassigned users");
        }
        tracing::info!(role = %id, "deleted role");
        Ok(())
    }

    /// Derived on every call from the current user set.
    pub fn users_count_by_role(&self, role_id: &str) -> Result<usize> {
        Ok(self
            .directory
            .list_users()?
            .iter()
            .filter(|u| u.role_id == role_id)
            .count())
    }

    /// Fresh projection over the current roles.
    pub fn matrix(&self) -> Result<PermissionMatrix> {
        Ok(PermissionMatrix::new(self.store.list_roles()?))
    }

    // ── Users ──────────────────────────────────────────────────

    pub fn list_users(&self) -> Result<Vec<User>> {
        self.directory.list_users()
    }

    /// Add a user on behalf of `actor`. Handing out a super-admin role takes
    /// administrator access.
    pub fn add_user(&self, actor: &Actor, name: &str, role_id: &str) -> Result<User> {
        Self::authorize(actor, ModuleId::Users, Action::Create)?;
        let role = self.store.get_role(role_id)?;
        Self::guard_privileged(actor, &role)?;
        self.insert_user(name, &role)
    }

    /// Move a user onto `role_id` on behalf of `actor`. Granting or revoking a
    /// super-admin role takes administrator access.
    pub fn assign_role(&self, actor: &Actor, user_id: &str, role_id: &str) -> Result<User> {
        Self::authorize(actor, ModuleId::Users, Action::Edit)?;
        let role = self.store.get_role(role_id)?;
        let current = self.resolve_actor(user_id)?.role;
        Self::guard_privileged(actor, &role)?;
        Self::guard_privileged(actor, &current)?;
        let user = self.directory.assign_role(user_id, role_id)?;
        tracing::info!(user = %user_id, role = %role_id, by = %actor.user.id, "assigned role");
        Ok(user)
    }

    /// Create the first holder of a super-admin role. Refused once any user
    /// holds one; later administrators are added by an existing one.
    pub fn enroll_administrator(&self, name: &str) -> Result<User> {
        let roles = self.store.list_roles()?;
        let admin_roles: Vec<&Role> = roles.iter().filter(|r| r.super_admin).collect();
        let role = admin_roles
            .first()
            .copied()
            .ok_or_else(|| RbacError::NotFound("administrator role".into()))?;
        let enrolled = self
            .directory
            .list_users()?
            .iter()
            .any(|u| admin_roles.iter().any(|r| r.id == u.role_id));
        if enrolled {
            tracing::warn!("refused administrator enrollment: one already exists");
            return Err(RbacError::Forbidden(
                "an administrator already exists; add further ones as that user".into(),
            ));
        }
        self.insert_user(name, role)
    }

    fn insert_user(&self, name: &str, role: &Role) -> Result<User> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RbacError::Validation("user name is required".into()));
        }
        let user = self.directory.add_user(name, &role.id)?;
        tracing::info!(user = %user.id, role = %role.id, "added user");
        Ok(user)
    }

    // ── Access ─────────────────────────────────────────────────

    pub fn resolve_actor(&self, user_id: &str) -> Result<Actor> {
        let user = self.directory.get_user(user_id)?;
        let role = self.store.get_role(&user.role_id)?;
        Ok(Actor { user, role })
    }

    /// Gate for ordinary module screens.
    pub fn can_access(actor: &Actor, module: &str, action: &str) -> bool {
        let allowed = actor.role.super_admin || actor.role.has_permission(module, action);
        tracing::debug!(user = %actor.user.id, module, action, allowed, "access check");
        allowed
    }

    /// Gate for admin-only screens (role management, permission matrix): the
    /// capability and the explicit grant must both hold.
    pub fn can_administer(actor: &Actor, module: &str, action: &str) -> bool {
        actor.role.super_admin && actor.role.has_permission(module, action)
    }

    pub fn authorize(actor: &Actor, module: ModuleId, action: Action) -> Result<()> {
        if Self::can_access(actor, module.as_str(), action.as_str()) {
            Ok(())
        } else {
            Err(RbacError::Forbidden(format!("missing permission: {module}.{action}")))
        }
    }

    pub fn authorize_admin(actor: &Actor, module: ModuleId, action: Action) -> Result<()> {
        if Self::can_administer(actor, module.as_str(), action.as_str()) {
            Ok(())
        } else {
            Err(RbacError::Forbidden(format!(
                "administrator access required for {module}.{action}"
            )))
        }
    }

    fn guard_privileged(actor: &Actor, role: &Role) -> Result<()> {
        if role.super_admin {
            Self::authorize_admin(actor, ModuleId::Roles, Action::Edit)?;
        }
        Ok(())
    }

    /// Non-empty, free of surrounding whitespace and unique among role names
    /// (case-insensitive), ignoring the role being renamed.
    fn validate_name(&self, name: &str, except: Option<&str>) -> Result<String> {
        if name.trim().is_empty() {
            return Err(RbacError::Validation("role name is required".into()));
        }
        if name.trim() != name {
            return Err(RbacError::Validation(format!(
                "role name '{name}' has leading or trailing whitespace"
            )));
        }
        let taken = self
            .store
            .list_roles()?
            .iter()
            .any(|r| Some(r.id.as_str()) != except && r.name.eq_ignore_ascii_case(name));
        if taken {
            return Err(RbacError::Validation(format!("role name '{name}' is already taken")));
        }
        Ok(name.to_string())
    }
}
