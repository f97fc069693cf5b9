use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};

use super::{RoleStore, UserDirectory, lock};
use crate::error::{RbacError, Result};
use crate::permissions::{PermissionSet, RawPermissions};
use crate::types::{Role, User};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Result<Self> {
        conn.execute_batch(MIGRATE_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Self::new(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Self::new(conn)
    }
}

const MIGRATE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS roles (
    id TEXT PRIMARY KEY,
    name TEXT UNIQUE NOT NULL COLLATE NOCASE,
    description TEXT NOT NULL DEFAULT '',
    is_system INTEGER NOT NULL DEFAULT 0,
    super_admin INTEGER NOT NULL DEFAULT 0,
    permissions TEXT NOT NULL DEFAULT '{}',
    version INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    role_id TEXT NOT NULL REFERENCES roles(id)
);

CREATE INDEX IF NOT EXISTS idx_users_role ON users(role_id);
"#;

const ROLE_COLUMNS: &str =
    "id, name, description, is_system, super_admin, permissions, version, created_at, updated_at";

/// Columns as stored; the permission JSON is validated on the way out.
struct RoleRow {
    id: String,
    name: String,
    description: String,
    is_system: bool,
    super_admin: bool,
    permissions: String,
    version: i64,
    created_at: String,
    updated_at: String,
}

impl RoleRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            is_system: row.get::<_, i32>(3)? != 0,
            super_admin: row.get::<_, i32>(4)? != 0,
            permissions: row.get(5)?,
            version: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn into_role(self) -> Result<Role> {
        let raw: RawPermissions = serde_json::from_str(&self.permissions)?;
        Ok(Role {
            id: self.id,
            name: self.name,
            description: self.description,
            is_system: self.is_system,
            super_admin: self.super_admin,
            permissions: PermissionSet::validate(&raw)?,
            version: self.version as u64,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        role_id: row.get(2)?,
    })
}

/// SQLITE_CONSTRAINT_UNIQUE or SQLITE_CONSTRAINT_PRIMARYKEY.
fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == 2067 || err.extended_code == 1555
    )
}

fn query_role(conn: &Connection, id: &str) -> Result<Role> {
    let sql = format!("SELECT {ROLE_COLUMNS} FROM roles WHERE id = ?1");
    conn.query_row(&sql, [id], RoleRow::read)
        .optional()?
        .ok_or_else(|| RbacError::NotFound(format!("role '{id}'")))?
        .into_role()
}

impl RoleStore for SqliteStore {
    fn insert_role(&self, role: &Role) -> Result<()> {
        let conn = lock(&self.conn)?;
        let permissions = serde_json::to_string(&role.permissions.to_raw())?;
        let sql = format!(
            "INSERT INTO roles ({ROLE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
        );
        conn.execute(
            &sql,
            params![
                role.id,
                role.name,
                role.description,
                role.is_system as i32,
                role.super_admin as i32,
                permissions,
                role.version as i64,
                role.created_at,
                role.updated_at,
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                return RbacError::Validation(format!("role '{}' already exists", role.name));
            }
            RbacError::Database(e)
        })?;
        Ok(())
    }

    fn get_role(&self, id: &str) -> Result<Role> {
        let conn = lock(&self.conn)?;
        query_role(&conn, id)
    }

    fn list_roles(&self) -> Result<Vec<Role>> {
        let conn = lock(&self.conn)?;
        let sql = format!("SELECT {ROLE_COLUMNS} FROM roles ORDER BY rowid");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], RoleRow::read)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().map(RoleRow::into_role).collect()
    }

    fn update_role(&self, role: &Role) -> Result<()> {
        let conn = lock(&self.conn)?;
        let expected = role.version.saturating_sub(1);
        let permissions = serde_json::to_string(&role.permissions.to_raw())?;
        let changed = conn
            .execute(
                "UPDATE roles
                 SET name = ?1, description = ?2, permissions = ?3, version = ?4, updated_at = ?5
                 WHERE id = ?6 AND version = ?7",
                params![
                    role.name,
                    role.description,
                    permissions,
                    role.version as i64,
                    role.updated_at,
                    role.id,
                    expected as i64,
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    return RbacError::Validation(format!("role '{}' already exists", role.name));
                }
                RbacError::Database(e)
            })?;
        if changed == 0 {
            // Either gone or raced by another writer.
            let actual = query_role(&conn, &role.id)?.version;
            return Err(RbacError::VersionConflict { expected, actual });
        }
        Ok(())
    }

    fn delete_role(&self, id: &str, reassign_to: Option<&str>) -> Result<usize> {
        let mut conn = lock(&self.conn)?;
        // Immediate: take the write lock before counting so no other
        // connection can assign the role between the count and the delete.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let is_system: bool = tx
            .query_row("SELECT is_system FROM roles WHERE id = ?1", [id], |row| {
                row.get::<_, i32>(0)
            })
            .optional()?
            .map(|v| v != 0)
            .ok_or_else(|| RbacError::NotFound(format!("role '{id}'")))?;
        if is_system {
            return Err(RbacError::ImmutableRole(id.to_string()));
        }

        let holders: i64 = tx.query_row(
            "SELECT COUNT(*) FROM users WHERE role_id = ?1",
            [id],
            |row| row.get(0),
        )?;
        let moved = match reassign_to {
            _ if holders == 0 => 0,
            None => {
                return Err(RbacError::RoleInUse {
                    role_id: id.to_string(),
                    users: holders as usize,
                });
            }
            Some(to) if to == id => {
                return Err(RbacError::Validation(format!(
                    "cannot move users of role '{id}' onto itself"
                )));
            }
            Some(to) => {
                query_role(&tx, to)?;
                tx.execute(
                    "UPDATE users SET role_id = ?1 WHERE role_id = ?2",
                    params![to, id],
                )?
            }
        };
        tx.execute("DELETE FROM roles WHERE id = ?1", [id])?;
        tx.commit()?;
        Ok(moved)
    }
}

impl UserDirectory for SqliteStore {
    fn add_user(&self, name: &str, role_id: &str) -> Result<User> {
        let conn = lock(&self.conn)?;
        let id = uuid::Uuid::now_v7().to_string();
        conn.execute(
            "INSERT INTO users (id, name, role_id) VALUES (?1, ?2, ?3)",
            params![id, name, role_id],
        )?;
        Ok(User {
            id,
            name: name.to_string(),
            role_id: role_id.to_string(),
        })
    }

    fn get_user(&self, id: &str) -> Result<User> {
        let conn = lock(&self.conn)?;
        conn.query_row(
            "SELECT id, name, role_id FROM users WHERE id = ?1",
            [id],
            user_from_row,
        )
        .optional()?
        .ok_or_else(|| RbacError::NotFound(format!("user '{id}'")))
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare("SELECT id, name, role_id FROM users ORDER BY rowid")?;
        let users = stmt
            .query_map([], user_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }

    fn assign_role(&self, user_id: &str, role_id: &str) -> Result<User> {
        {
            let conn = lock(&self.conn)?;
            let changed = conn.execute(
                "UPDATE users SET role_id = ?1 WHERE id = ?2",
                params![role_id, user_id],
            )?;
            if changed == 0 {
                return Err(RbacError::NotFound(format!("user '{user_id}'")));
            }
        }
        self.get_user(user_id)
    }
}
