/// Role authority behaviour exercised against both store backends.
///
/// Run:
///   cargo test -p buildplan-rbac --test authority_scenarios
use std::collections::BTreeMap;
use std::sync::Arc;

use buildplan_rbac::store::seed::{self, ADMINISTRATOR, EMPLOYEE};
use buildplan_rbac::{
    Action, Actor, CreateRoleRequest, DeletionPolicy, MemoryStore, ModuleId, PermissionMatrix,
    RawPermissions, RbacError, RbacSettings, RoleAuthority, Selection, SqliteStore,
    UpdateRoleRequest, list_modules,
};

fn raw(module: &str, action: &str) -> RawPermissions {
    let mut actions = BTreeMap::new();
    actions.insert(action.to_string(), true);
    let mut map = RawPermissions::new();
    map.insert(module.to_string(), actions);
    map
}

fn memory_authority(settings: &RbacSettings) -> RoleAuthority {
    let store = Arc::new(MemoryStore::new());
    RoleAuthority::bootstrap(store.clone(), store, settings, seed::seed_system_roles).unwrap()
}

fn sqlite_authority(settings: &RbacSettings) -> RoleAuthority {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    RoleAuthority::bootstrap(store.clone(), store, settings, seed::seed_system_roles).unwrap()
}

fn each_backend_with(settings: RbacSettings, check: impl Fn(RoleAuthority)) {
    check(memory_authority(&settings));
    check(sqlite_authority(&settings));
}

fn each_backend(check: impl Fn(RoleAuthority)) {
    each_backend_with(RbacSettings::in_memory(), check);
}

fn reassigning() -> RbacSettings {
    let mut settings = RbacSettings::in_memory();
    settings.deletion_policy = DeletionPolicy::Reassign;
    settings
}

fn root(auth: &RoleAuthority) -> Actor {
    let user = auth.enroll_administrator("Root").unwrap();
    auth.resolve_actor(&user.id).unwrap()
}

#[test]
fn system_roles_reject_update_and_delete() {
    each_backend(|auth| {
        for role in auth.list_roles().unwrap().into_iter().filter(|r| r.is_system) {
            let update = auth.update_role(
                &role.id,
                UpdateRoleRequest {
                    name: Some("Renamed".into()),
                    ..Default::default()
                },
            );
            assert!(matches!(update, Err(RbacError::ImmutableRole(_))));
            assert!(matches!(auth.delete_role(&role.id), Err(RbacError::ImmutableRole(_))));
        }
    });
}

#[test]
fn unregistered_pairs_are_never_granted() {
    each_backend(|auth| {
        let pairs = [
            ("invoices", "view"),
            ("projects", "approve"),
            ("dashboard", "delete"),
            ("reports", "edit"),
            ("", ""),
        ];
        for role in auth.list_roles().unwrap() {
            for (module, action) in pairs {
                assert!(!RoleAuthority::has_permission(&role, module, action));
            }
        }
    });
}

#[test]
fn created_role_reads_back_exactly() {
    each_backend(|auth| {
        let mut permissions = raw("users", "view");
        permissions
            .get_mut("users")
            .unwrap()
            .insert("delete".to_string(), false);
        let created = auth
            .create_custom_role(CreateRoleRequest {
                name: "Site Manager".into(),
                description: Some("Runs one site".into()),
                permissions: permissions.clone(),
            })
            .unwrap();

        let loaded = auth.get_role(&created.id).unwrap();
        assert!(!loaded.is_system);
        assert_eq!(loaded.name, "Site Manager");
        assert_eq!(loaded.description, "Runs one site");
        assert_eq!(loaded.permissions.to_raw(), permissions);
    });
}

#[test]
fn list_roles_is_stable_without_mutation() {
    each_backend(|auth| {
        auth.create_custom_role(CreateRoleRequest {
            name: "Electrician".into(),
            ..Default::default()
        })
        .unwrap();
        let first = auth.list_roles().unwrap();
        let second = auth.list_roles().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.last().unwrap().name, "Electrician");
    });
}

#[test]
fn matrix_summaries_are_bounded() {
    each_backend(|auth| {
        let matrix = auth.matrix().unwrap();
        for row in matrix.rows(&Selection::All, &Selection::All) {
            let module = list_modules().iter().find(|m| m.id == row.module).unwrap();
            assert!(row.summary.active <= row.summary.total);
            assert_eq!(row.summary.total, module.actions.len());
        }
    });
}

#[test]
fn seeded_employee_can_only_view_projects() {
    each_backend(|auth| {
        let admin = auth.get_role(ADMINISTRATOR).unwrap();
        for module in list_modules() {
            for action in module.actions {
                assert!(RoleAuthority::has_permission(&admin, module.id.as_str(), action.as_str()));
            }
        }

        let employee = auth.get_role(EMPLOYEE).unwrap();
        assert!(RoleAuthority::has_permission(&employee, "projects", "view"));
        assert!(!RoleAuthority::has_permission(&employee, "projects", "delete"));
    });
}

#[test]
fn custom_role_deletable_while_admin_is_not() {
    each_backend(|auth| {
        let custom = auth
            .create_custom_role(CreateRoleRequest {
                name: "Foreman2".into(),
                permissions: raw("users", "view"),
                ..Default::default()
            })
            .unwrap();

        assert!(matches!(
            auth.delete_role(ADMINISTRATOR),
            Err(RbacError::ImmutableRole(_))
        ));

        auth.delete_role(&custom.id).unwrap();
        assert!(auth.list_roles().unwrap().iter().all(|r| r.id != custom.id));
        assert!(matches!(auth.get_role(&custom.id), Err(RbacError::NotFound(_))));
    });
}

#[test]
fn invalid_update_leaves_role_unchanged() {
    each_backend(|auth| {
        let custom = auth
            .create_custom_role(CreateRoleRequest {
                name: "Plasterer".into(),
                permissions: raw("tasks", "view"),
                ..Default::default()
            })
            .unwrap();

        let err = auth
            .update_role(
                &custom.id,
                UpdateRoleRequest {
                    name: Some("Plasterer Lead".into()),
                    permissions: Some(raw("invalidModule", "view")),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, RbacError::InvalidPermission { .. }));
        assert_eq!(auth.get_role(&custom.id).unwrap(), custom);
    });
}

#[test]
fn matrix_reflects_latest_state() {
    each_backend(|auth| {
        let custom = auth
            .create_custom_role(CreateRoleRequest {
                name: "Roofer".into(),
                ..Default::default()
            })
            .unwrap();
        auth.update_role(
            &custom.id,
            UpdateRoleRequest {
                permissions: Some(raw("schedule", "edit")),
                ..Default::default()
            },
        )
        .unwrap();

        let matrix = auth.matrix().unwrap();
        let role = matrix
            .filter_roles(&Selection::Only(custom.id.clone()))
            .pop()
            .unwrap();
        let schedule_only: Selection<ModuleId> = "schedule".parse().unwrap();
        let schedule = PermissionMatrix::filter_modules(&schedule_only)[0];
        let summary = PermissionMatrix::summarize(role, schedule);
        assert_eq!((summary.active, summary.total), (1, 2));
    });
}

#[test]
fn padded_names_are_rejected_not_trimmed() {
    each_backend(|auth| {
        let err = auth
            .create_custom_role(CreateRoleRequest {
                name: " Tiler ".into(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, RbacError::Validation(_)));
        assert!(auth.list_roles().unwrap().iter().all(|r| r.name.trim() != "Tiler"));
    });
}

#[test]
fn block_policy_keeps_role_and_users() {
    each_backend(|auth| {
        let root = root(&auth);
        let custom = auth
            .create_custom_role(CreateRoleRequest {
                name: "Tiler".into(),
                ..Default::default()
            })
            .unwrap();
        let ana = auth.add_user(&root, "Ana", &custom.id).unwrap();

        let err = auth.delete_role(&custom.id).unwrap_err();
        assert!(matches!(err, RbacError::RoleInUse { users: 1, .. }));
        assert_eq!(auth.get_role(&custom.id).unwrap(), custom);
        assert_eq!(auth.resolve_actor(&ana.id).unwrap().role.id, custom.id);
    });
}

#[test]
fn reassign_policy_moves_users_and_deletes() {
    each_backend_with(reassigning(), |auth| {
        let root = root(&auth);
        let custom = auth
            .create_custom_role(CreateRoleRequest {
                name: "Tiler".into(),
                ..Default::default()
            })
            .unwrap();
        let ana = auth.add_user(&root, "Ana", &custom.id).unwrap();
        let bo = auth.add_user(&root, "Bo", &custom.id).unwrap();

        auth.delete_role(&custom.id).unwrap();
        assert!(matches!(auth.get_role(&custom.id), Err(RbacError::NotFound(_))));
        for user in [&ana, &bo] {
            assert_eq!(auth.resolve_actor(&user.id).unwrap().role.id, EMPLOYEE);
        }
        assert_eq!(auth.users_count_by_role(&custom.id).unwrap(), 0);
        assert_eq!(auth.users_count_by_role(EMPLOYEE).unwrap(), 2);
    });
}

#[test]
fn unused_role_deletes_under_either_policy() {
    for settings in [RbacSettings::in_memory(), reassigning()] {
        each_backend_with(settings, |auth| {
            let custom = auth
                .create_custom_role(CreateRoleRequest {
                    name: "Glazier".into(),
                    ..Default::default()
                })
                .unwrap();
            auth.delete_role(&custom.id).unwrap();
            assert_eq!(auth.users_count_by_role(EMPLOYEE).unwrap(), 0);
        });
    }
}

#[test]
fn users_edit_grant_does_not_reach_administrator() {
    each_backend(|auth| {
        let root = root(&auth);
        let mut permissions = raw("users", "edit");
        permissions
            .get_mut("users")
            .unwrap()
            .insert("create".to_string(), true);
        let clerk_role = auth
            .create_custom_role(CreateRoleRequest {
                name: "Clerk".into(),
                permissions,
                ..Default::default()
            })
            .unwrap();
        let clerk = auth.add_user(&root, "Clerk", &clerk_role.id).unwrap();
        let actor = auth.resolve_actor(&clerk.id).unwrap();
        assert!(RoleAuthority::authorize(&actor, ModuleId::Users, Action::Edit).is_ok());

        assert!(matches!(
            auth.assign_role(&actor, &clerk.id, ADMINISTRATOR),
            Err(RbacError::Forbidden(_))
        ));
        assert!(matches!(
            auth.add_user(&actor, "Shadow", ADMINISTRATOR),
            Err(RbacError::Forbidden(_))
        ));
        assert!(matches!(
            auth.enroll_administrator("Shadow"),
            Err(RbacError::Forbidden(_))
        ));

        let after = auth.resolve_actor(&clerk.id).unwrap();
        assert!(!after.role.super_admin);
        assert!(RoleAuthority::authorize_admin(&after, ModuleId::Roles, Action::Delete).is_err());
        assert_eq!(auth.users_count_by_role(ADMINISTRATOR).unwrap(), 1);
    });
}
