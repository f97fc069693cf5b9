use crate::error::{RbacError, Result};
use crate::permissions::{Action, ModuleId, PermissionSet};
use crate::store::{RoleStore, now};
use crate::types::Role;

pub const ADMINISTRATOR: &str = "administrator";
pub const FOREMAN: &str = "foreman";
pub const EMPLOYEE: &str = "employee";

const FOREMAN_GRANTS: &[(ModuleId, Action)] = &[
    (ModuleId::Dashboard, Action::View),
    (ModuleId::Projects, Action::View),
    (ModuleId::Projects, Action::Create),
    (ModuleId::Projects, Action::Edit),
    (ModuleId::Tasks, Action::View),
    (ModuleId::Tasks, Action::Create),
    (ModuleId::Tasks, Action::Edit),
    (ModuleId::Tasks, Action::Delete),
    (ModuleId::Schedule, Action::View),
    (ModuleId::Schedule, Action::Edit),
    (ModuleId::Materials, Action::View),
    (ModuleId::Materials, Action::Create),
    (ModuleId::Materials, Action::Edit),
    (ModuleId::Employees, Action::View),
    (ModuleId::Reports, Action::View),
];

const EMPLOYEE_GRANTS: &[(ModuleId, Action)] = &[(ModuleId::Projects, Action::View)];

/// The built-in roles, in the order they are listed.
pub fn system_roles() -> Vec<Role> {
    let ts = now();
    let role = |id: &str,
                name: &str,
                description: &str,
                super_admin: bool,
                permissions: PermissionSet| Role {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        is_system: true,
        super_admin,
        permissions,
        version: 1,
        created_at: ts.clone(),
        updated_at: ts.clone(),
    };
    vec![
        role(
            ADMINISTRATOR,
            "Administrator",
            "Full access to every module and to role management",
            true,
            PermissionSet::full(),
        ),
        role(
            FOREMAN,
            "Foreman",
            "Runs projects on site: tasks, schedule and materials",
            false,
            PermissionSet::from_grants(FOREMAN_GRANTS.iter().copied()),
        ),
        role(
            EMPLOYEE,
            "Employee",
            "Read-only access to assigned projects",
            false,
            PermissionSet::from_grants(EMPLOYEE_GRANTS.iter().copied()),
        ),
    ]
}

/// Insert any missing system role. Roles already present are left untouched,
/// so seeding a persistent store twice is harmless.
pub fn seed_system_roles(store: &dyn RoleStore) -> Result<()> {
    for role in system_roles() {
        match store.get_role(&role.id) {
            Ok(_) => {}
            Err(RbacError::NotFound(_)) => {
                store.insert_role(&role)?;
                tracing::info!(role = %role.id, "seeded system role");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn seeds_three_system_roles() {
        let store = MemoryStore::new();
        seed_system_roles(&store).unwrap();
        let roles = store.list_roles().unwrap();
        let ids: Vec<&str> = roles.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![ADMINISTRATOR, FOREMAN, EMPLOYEE]);
        assert!(roles.iter().all(|r| r.is_system));
        assert!(roles[0].super_admin);
        assert!(!roles[1].super_admin && !roles[2].super_admin);
    }

    #[test]
    fn seeding_twice_is_idempotent() {
        let store = MemoryStore::new();
        seed_system_roles(&store).unwrap();
        seed_system_roles(&store).unwrap();
        assert_eq!(store.list_roles().unwrap().len(), 3);
    }

    #[test]
    fn employee_sees_projects_only() {
        let employee = system_roles().remove(2);
        assert!(employee.has_permission("projects", "view"));
        assert!(!employee.has_permission("projects", "delete"));
        assert_eq!(employee.permissions.grants().count(), 1);
    }
}
