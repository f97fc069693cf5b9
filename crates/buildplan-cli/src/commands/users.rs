use anyhow::Result;
use std::path::Path;

use buildplan_rbac::{Action, ModuleId, RoleAuthority};

use super::{open_authority, require_actor};

pub fn list(base_dir: &Path, actor: &Option<String>) -> Result<()> {
    let authority = open_authority(base_dir)?;
    let actor = require_actor(&authority, actor)?;
    RoleAuthority::authorize(&actor, ModuleId::Users, Action::View)?;

    let users = authority.list_users()?;
    if users.is_empty() {
        println!("No users found.");
        return Ok(());
    }

    println!("{:<38} {:<24} ROLE", "ID", "NAME");
    println!("{}", "-".repeat(80));
    for u in &users {
        println!("{:<38} {:<24} {}", u.id, u.name, u.role_id);
    }
    Ok(())
}

pub fn add(base_dir: &Path, actor: &Option<String>, name: &str, role_id: &str) -> Result<()> {
    let authority = open_authority(base_dir)?;
    let actor = require_actor(&authority, actor)?;

    let user = authority.add_user(&actor, name, role_id)?;
    println!("Added user '{}' ({}) as {}", user.name, user.id, user.role_id);
    Ok(())
}

pub fn assign(base_dir: &Path, actor: &Option<String>, user_id: &str, role_id: &str) -> Result<()> {
    let authority = open_authority(base_dir)?;
    let actor = require_actor(&authority, actor)?;

    let user = authority.assign_role(&actor, user_id, role_id)?;
    println!("User '{}' now holds role {}", user.name, user.role_id);
    Ok(())
}
