use anyhow::Result;
use std::path::Path;

use buildplan_rbac::{Action, Cell, MatrixRow, ModuleId, RoleAuthority, Selection};

use super::{open_authority, require_actor};

pub fn run(
    base_dir: &Path,
    actor: &Option<String>,
    roles: &Selection<String>,
    modules: &Selection<ModuleId>,
    json: bool,
) -> Result<()> {
    let authority = open_authority(base_dir)?;
    let actor = require_actor(&authority, actor)?;
    RoleAuthority::authorize_admin(&actor, ModuleId::Roles, Action::View)?;

    let rows = authority.matrix()?.rows(roles, modules);
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    if rows.is_empty() {
        println!("No roles match the filter.");
        return Ok(());
    }

    print!("{:<20} {:<12}", "ROLE", "MODULE");
    for action in Action::ALL {
        print!(" {:^8}", action.as_str().to_uppercase());
    }
    println!(" {:>7}", "ACTIVE");
    println!("{}", "-".repeat(76));

    for row in &rows {
        println!("{}", format_row(row));
    }
    Ok(())
}

fn format_row(row: &MatrixRow) -> String {
    let mut line = format!("{:<20} {:<12}", row.role_name, row.module);
    for (_, cell) in &row.cells {
        let mark = match cell {
            Cell::Granted => "x",
            Cell::Denied => ".",
            Cell::NotApplicable => "",
        };
        line.push_str(&format!(" {mark:^8}"));
    }
    line.push_str(&format!(" {:>7}", format!("{}/{}", row.summary.active, row.summary.total)));
    line
}
