use anyhow::Result;
use std::path::Path;

use buildplan_rbac::{Action, ModuleId, RoleAuthority, is_valid_action};

use super::{open_authority, require_actor};

/// Answer whether `role_id` grants `module.action`. Unknown names answer "no".
pub fn run(
    base_dir: &Path,
    actor: &Option<String>,
    role_id: &str,
    module: &str,
    action: &str,
) -> Result<()> {
    let authority = open_authority(base_dir)?;
    let actor = require_actor(&authority, actor)?;
    RoleAuthority::authorize(&actor, ModuleId::Roles, Action::View)?;

    let role = authority.get_role(role_id)?;
    let granted = RoleAuthority::has_permission(&role, module, action);
    if !is_valid_action(module, action) {
        println!("{module}.{action} is not a registered permission");
    }
    println!("{}: {module}.{action} -> {}", role.name, if granted { "granted" } else { "denied" });
    Ok(())
}
