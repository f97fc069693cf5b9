use anyhow::Result;
use std::path::Path;

use buildplan_rbac::{BuildplanConfig, DeletionPolicy};

pub fn run(base_dir: &Path) -> Result<()> {
    let config_path = BuildplanConfig::default_path(base_dir);
    let config = BuildplanConfig::load(&config_path)?;

    println!("Config: {}", config_path.display());
    println!();
    println!("  Backend:          {:?}", config.rbac.backend);
    println!("  DB path:          {}", config.rbac.db_path);
    println!("  Deletion policy:  {:?}", config.rbac.deletion_policy);
    if config.rbac.deletion_policy == DeletionPolicy::Reassign {
        println!("  Fallback role:    {}", config.rbac.fallback_role);
    }

    Ok(())
}
