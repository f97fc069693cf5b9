pub mod check;
pub mod config;
pub mod init;
pub mod matrix;
pub mod modules;
pub mod roles;
pub mod users;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};

use buildplan_rbac::store::seed;
use buildplan_rbac::{Actor, Backend, BuildplanConfig, RoleAuthority, SqliteStore};

/// Load config, open the configured backend and seed the system roles. Each
/// invocation is a fresh process, so only the sqlite backend is served here.
pub fn open_authority(base_dir: &Path) -> Result<RoleAuthority> {
    let config_path = BuildplanConfig::default_path(base_dir);
    let config = BuildplanConfig::load(&config_path)?;
    let settings = &config.rbac;
    tracing::debug!(backend = ?settings.backend, "opening role store");

    let authority = match settings.backend {
        Backend::Sqlite => {
            let store = Arc::new(SqliteStore::open(Path::new(&settings.db_path))?);
            RoleAuthority::bootstrap(store.clone(), store, settings, seed::seed_system_roles)?
        }
        Backend::Memory => bail!(
            "the memory backend keeps no roles or users between commands; \
             set `backend = \"sqlite\"` under [rbac] in {}",
            config_path.display()
        ),
    };
    Ok(authority)
}

/// Resolve `--actor` / `BUILDPLAN_ACTOR` to a user and role.
pub fn require_actor(authority: &RoleAuthority, actor: &Option<String>) -> Result<Actor> {
    let user_id = actor
        .as_deref()
        .context("an actor is required: pass --actor <user-id> or set BUILDPLAN_ACTOR")?;
    Ok(authority.resolve_actor(user_id)?)
}
