use anyhow::Result;
use std::path::Path;

use buildplan_rbac::{Backend, BuildplanConfig};

pub fn run(base_dir: &Path, admin_name: Option<&str>) -> Result<()> {
    println!("Initializing buildplan in {}", base_dir.display());

    std::fs::create_dir_all(base_dir)?;

    let config_path = BuildplanConfig::default_path(base_dir);
    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
    } else {
        let config = BuildplanConfig::default_config(base_dir);
        config.save(&config_path)?;
        println!("Created config: {}", config_path.display());
    }

    let config = BuildplanConfig::load(&config_path)?;

    // Opening the authority creates the database and seeds system roles.
    let authority = super::open_authority(base_dir)?;
    if config.rbac.backend == Backend::Sqlite {
        println!("Initialized database: {}", config.rbac.db_path);
    }
    println!("System roles: {}", authority.list_roles()?.len());

    if let Some(name) = admin_name {
        let user = authority.enroll_administrator(name)?;
        println!("Created administrator '{}' with id {}", user.name, user.id);
        println!("\nRun commands as this user with `--actor {}`.", user.id);
    } else {
        println!("\nNo administrator created. Re-run with `--admin <name>` to add one.");
    }

    Ok(())
}
