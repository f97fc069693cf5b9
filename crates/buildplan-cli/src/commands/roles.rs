use anyhow::{Result, bail};
use std::path::Path;

use buildplan_rbac::{
    Action, CreateRoleRequest, ModuleId, RawPermissions, Role, RoleAuthority, UpdateRoleRequest,
};

use super::{open_authority, require_actor};

/// Build a full permission map from `--grant module:action` pairs or a JSON
/// object. `None` when neither was given.
pub fn parse_permissions(grants: &[String], json: Option<&str>) -> Result<Option<RawPermissions>> {
    if let Some(json) = json {
        return Ok(Some(serde_json::from_str(json)?));
    }
    if grants.is_empty() {
        return Ok(None);
    }
    let mut map = RawPermissions::new();
    for grant in grants {
        let Some((module, action)) = grant.split_once(':') else {
            bail!("invalid grant '{grant}': expected <module>:<action>");
        };
        map.entry(module.to_string())
            .or_default()
            .insert(action.to_string(), true);
    }
    Ok(Some(map))
}

pub fn list(base_dir: &Path, actor: &Option<String>) -> Result<()> {
    let authority = open_authority(base_dir)?;
    let actor = require_actor(&authority, actor)?;
    RoleAuthority::authorize(&actor, ModuleId::Roles, Action::View)?;

    let roles = authority.list_roles()?;
    println!(
        "{:<38} {:<20} {:<8} {:>6} {:>8}",
        "ID", "NAME", "SYSTEM", "USERS", "VERSION"
    );
    println!("{}", "-".repeat(84));
    for r in &roles {
        println!(
            "{:<38} {:<20} {:<8} {:>6} {:>8}",
            r.id,
            r.name,
            if r.is_system { "yes" } else { "no" },
            authority.users_count_by_role(&r.id)?,
            r.version,
        );
    }
    Ok(())
}

pub fn show(base_dir: &Path, actor: &Option<String>, id: &str, json: bool) -> Result<()> {
    let authority = open_authority(base_dir)?;
    let actor = require_actor(&authority, actor)?;
    RoleAuthority::authorize(&actor, ModuleId::Roles, Action::View)?;

    let role = authority.get_role(id)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&role)?);
        return Ok(());
    }
    print_role(&role, authority.users_count_by_role(&role.id)?);
    Ok(())
}

pub fn create(
    base_dir: &Path,
    actor: &Option<String>,
    name: &str,
    description: Option<String>,
    grants: &[String],
    json: Option<&str>,
) -> Result<()> {
    let authority = open_authority(base_dir)?;
    let actor = require_actor(&authority, actor)?;
    RoleAuthority::authorize_admin(&actor, ModuleId::Roles, Action::Create)?;

    let role = authority.create_custom_role(CreateRoleRequest {
        name: name.to_string(),
        description,
        permissions: parse_permissions(grants, json)?.unwrap_or_default(),
    })?;
    println!("Created role '{}' ({})", role.name, role.id);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn update(
    base_dir: &Path,
    actor: &Option<String>,
    id: &str,
    name: Option<String>,
    description: Option<String>,
    grants: &[String],
    json: Option<&str>,
    expected_version: Option<u64>,
) -> Result<()> {
    let authority = open_authority(base_dir)?;
    let actor = require_actor(&authority, actor)?;
    RoleAuthority::authorize_admin(&actor, ModuleId::Roles, Action::Edit)?;

    let role = authority.update_role(
        id,
        UpdateRoleRequest {
            name,
            description,
            permissions: parse_permissions(grants, json)?,
            expected_version,
        },
    )?;
    println!("Updated role '{}' (version {})", role.name, role.version);
    Ok(())
}

pub fn delete(base_dir: &Path, actor: &Option<String>, id: &str) -> Result<()> {
    let authority = open_authority(base_dir)?;
    let actor = require_actor(&authority, actor)?;
    RoleAuthority::authorize_admin(&actor, ModuleId::Roles, Action::Delete)?;

    let role = authority.get_role(id)?;
    authority.delete_role(id)?;
    println!("Deleted role '{}'", role.name);
    Ok(())
}

fn print_role(role: &Role, users: usize) {
    println!("Role:");
    println!("  ID:           {}", role.id);
    println!("  Name:         {}", role.name);
    if !role.description.is_empty() {
        println!("  Description:  {}", role.description);
    }
    println!("  System:       {}", role.is_system);
    println!("  Super admin:  {}", role.super_admin);
    println!("  Users:        {users}");
    println!("  Version:      {}", role.version);
    println!("  Updated:      {}", role.updated_at);

    let grants: Vec<String> = role
        .permissions
        .grants()
        .map(|(module, action)| format!("{module}:{action}"))
        .collect();
    if grants.is_empty() {
        println!("\n  No permissions granted.");
    } else {
        println!("\n  Granted:");
        for g in &grants {
            println!("    - {g}");
        }
    }
}
