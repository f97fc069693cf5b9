use thiserror::Error;

#[derive(Debug, Error)]
pub enum RbacError {
    // Input
    #[error("validation error: {0}")]
    Validation(String),

    #[error("invalid permission: module '{module}' has no action '{action}'")]
    InvalidPermission { module: String, action: String },

    // Roles
    #[error("not found: {0}")]
    NotFound(String),

    #[error("role '{0}' is a system role and cannot be changed")]
    ImmutableRole(String),

    #[error("role '{role_id}' is still assigned to {users} user(s)")]
    RoleInUse { role_id: String, users: usize },

    #[error("version conflict: expected {expected}, found {actual}")]
    VersionConflict { expected: u64, actual: u64 },

    // Access
    #[error("forbidden: {0}")]
    Forbidden(String),

    // Storage
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Config
    #[error("configuration error: {0}")]
    Config(String),

    #[error("configuration file not found at {0}; run `buildplan init` first")]
    ConfigNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(String),

    #[error("TOML serialization error: {0}")]
    TomlSer(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, RbacError>;
