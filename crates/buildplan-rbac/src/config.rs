use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RbacError, Result};
use crate::store::seed::EMPLOYEE;

/// Top-level configuration stored as TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildplanConfig {
    pub rbac: RbacSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RbacSettings {
    /// Where roles and user assignments live.
    #[serde(default)]
    pub backend: Backend,
    /// Path to the SQLite database (sqlite backend only).
    #[serde(default)]
    pub db_path: String,
    /// What happens when a role that users still hold is deleted.
    #[serde(default)]
    pub deletion_policy: DeletionPolicy,
    /// Role that users are moved to under the `reassign` policy.
    #[serde(default = "default_fallback_role")]
    pub fallback_role: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletionPolicy {
    /// Refuse with `RoleInUse`.
    #[default]
    Block,
    /// Move the users to `fallback_role`, then delete.
    Reassign,
}

fn default_fallback_role() -> String {
    EMPLOYEE.to_string()
}

impl RbacSettings {
    /// In-memory settings with the default policy, for tests and embedding.
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory,
            db_path: String::new(),
            deletion_policy: DeletionPolicy::default(),
            fallback_role: default_fallback_role(),
        }
    }

    /// Reject settings that cannot open a store.
    pub fn check(&self) -> Result<()> {
        if self.backend == Backend::Sqlite && self.db_path.trim().is_empty() {
            return Err(RbacError::Config(
                "rbac.db_path is required for the sqlite backend".into(),
            ));
        }
        if self.fallback_role.trim().is_empty() {
            return Err(RbacError::Config("rbac.fallback_role must not be empty".into()));
        }
        Ok(())
    }
}

impl BuildplanConfig {
    /// Read and check `buildplan.toml`. A missing file is reported as
    /// `ConfigNotFound` so the CLI can point at `buildplan init`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RbacError::ConfigNotFound(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let config: Self =
            toml::from_str(&content).map_err(|e| RbacError::TomlDe(e.to_string()))?;
        config.rbac.check()?;
        Ok(config)
    }

    /// Check, then write as pretty TOML, creating the base dir if needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.rbac.check()?;
        let content =
            toml::to_string_pretty(self).map_err(|e| RbacError::TomlSer(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Default config for `buildplan init`.
    pub fn default_config(base_dir: &Path) -> Self {
        Self {
            rbac: RbacSettings {
                backend: Backend::Sqlite,
                db_path: base_dir.join("buildplan.db").display().to_string(),
                deletion_policy: DeletionPolicy::Block,
                fallback_role: default_fallback_role(),
            },
        }
    }

    /// `<base_dir>/buildplan.toml`
    pub fn default_path(base_dir: &Path) -> PathBuf {
        base_dir.join("buildplan.toml")
    }

    /// `~/.buildplan`
    pub fn default_base_dir() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|h| h.join(".buildplan"))
            .ok_or_else(|| RbacError::Config("Cannot determine home directory".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn roundtrip_config() {
        let tmp = TempDir::new().unwrap();
        let path = BuildplanConfig::default_path(tmp.path());
        let config = BuildplanConfig::default_config(tmp.path());
        config.save(&path).unwrap();
        let loaded = BuildplanConfig::load(&path).unwrap();
        assert_eq!(loaded.rbac.backend, Backend::Sqlite);
        assert_eq!(loaded.rbac.deletion_policy, DeletionPolicy::Block);
        assert_eq!(loaded.rbac.fallback_role, "employee");
    }

    #[test]
    fn load_nonexistent_returns_error() {
        let result = BuildplanConfig::load(Path::new("/nonexistent/buildplan.toml"));
        assert!(matches!(result, Err(RbacError::ConfigNotFound(_))));
    }

    #[test]
    fn optional_fields_fall_back_to_defaults() {
        let config: BuildplanConfig = toml::from_str(
            r#"
            [rbac]
            db_path = "/tmp/rbac.db"
            deletion_policy = "reassign"
            "#,
        )
        .unwrap();
        assert_eq!(config.rbac.backend, Backend::Sqlite);
        assert_eq!(config.rbac.deletion_policy, DeletionPolicy::Reassign);
        assert_eq!(config.rbac.fallback_role, "employee");
    }

    #[test]
    fn memory_backend_needs_no_db_path() {
        let config: BuildplanConfig = toml::from_str(
            r#"
            [rbac]
            backend = "memory"
            "#,
        )
        .unwrap();
        assert_eq!(config.rbac.backend, Backend::Memory);
        assert!(config.rbac.db_path.is_empty());
        config.rbac.check().unwrap();
    }

    #[test]
    fn sqlite_without_db_path_is_rejected_on_load() {
        let tmp = TempDir::new().unwrap();
        let path = BuildplanConfig::default_path(tmp.path());
        std::fs::write(&path, "[rbac]\nbackend = \"sqlite\"\n").unwrap();
        assert!(matches!(BuildplanConfig::load(&path), Err(RbacError::Config(_))));
    }
}
