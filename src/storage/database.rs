// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded identity database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: user id → serialized User
//! - `username_index`: username → user id
//! - `content_types`: content type id → serialized ContentType
//! - `content_name_index`: content name → content type id
//! - `permissions`: permission id → serialized Permission
//! - `permission_index`: (content type id, action code) → permission id
//! - `grants`: (user id, permission id) → serialized Grant
//! - `sequences`: sequence name → last issued id

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition, WriteTransaction,
};

use super::records::{permission_name, ContentType, Grant, NewUser, Permission, User};
use super::store::{GrantLookup, IdentityStore};
use crate::auth::permissions::Action;

// =============================================================================
// Table Definitions
// =============================================================================

const USERS: TableDefinition<i64, &[u8]> = TableDefinition::new("users");

/// Index: username → user id. Deactivated users keep their entry.
const USERNAME_INDEX: TableDefinition<&str, i64> = TableDefinition::new("username_index");

const CONTENT_TYPES: TableDefinition<i64, &[u8]> = TableDefinition::new("content_types");

const CONTENT_NAME_INDEX: TableDefinition<&str, i64> = TableDefinition::new("content_name_index");

const PERMISSIONS: TableDefinition<i64, &[u8]> = TableDefinition::new("permissions");

/// Index: (content_type_id, action code) → permission id.
const PERMISSION_INDEX: TableDefinition<(i64, u8), i64> = TableDefinition::new("permission_index");

const GRANTS: TableDefinition<(i64, i64), &[u8]> = TableDefinition::new("grants");

const SEQUENCES: TableDefinition<&str, i64> = TableDefinition::new("sequences");

const USER_SEQUENCE: &str = "users";
const CONTENT_TYPE_SEQUENCE: &str = "content_types";
const PERMISSION_SEQUENCE: &str = "permissions";

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Transaction helpers
// =============================================================================

fn next_id(txn: &WriteTransaction, sequence: &str) -> StoreResult<i64> {
    let mut table = txn.open_table(SEQUENCES)?;
    let next = table.get(sequence)?.map(|v| v.value()).unwrap_or(0) + 1;
    table.insert(sequence, next)?;
    Ok(next)
}

fn load_permission(txn: &WriteTransaction, permission_id: i64) -> StoreResult<Permission> {
    let table = txn.open_table(PERMISSIONS)?;
    let bytes = table
        .get(permission_id)?
        .map(|v| v.value().to_vec())
        .ok_or_else(|| StoreError::NotFound(format!("Permission {permission_id}")))?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn load_user(txn: &WriteTransaction, user_id: i64) -> StoreResult<User> {
    let table = txn.open_table(USERS)?;
    let bytes = table
        .get(user_id)?
        .map(|v| v.value().to_vec())
        .ok_or_else(|| StoreError::NotFound(format!("User {user_id}")))?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Insert a grant or flip an existing one. `created_at` survives updates.
fn put_grant(
    txn: &WriteTransaction,
    user_id: i64,
    permission_id: i64,
    active: bool,
    now: DateTime<Utc>,
) -> StoreResult<Grant> {
    let mut table = txn.open_table(GRANTS)?;
    let existing = table
        .get((user_id, permission_id))?
        .map(|v| v.value().to_vec());

    let grant = match existing {
        Some(bytes) => {
            let mut grant: Grant = serde_json::from_slice(&bytes)?;
            grant.active = active;
            grant.updated_at = now;
            grant
        }
        None => Grant {
            user_id,
            permission_id,
            active,
            created_at: now,
            updated_at: now,
        },
    };

    let json = serde_json::to_vec(&grant)?;
    table.insert((user_id, permission_id), json.as_slice())?;
    Ok(grant)
}

fn permissions_in(txn: &WriteTransaction, content_type_id: i64) -> StoreResult<Vec<Permission>> {
    let ids: Vec<i64> = {
        let index = txn.open_table(PERMISSION_INDEX)?;
        let mut ids = Vec::new();
        for entry in index.range((content_type_id, u8::MIN)..=(content_type_id, u8::MAX))? {
            let (_, value) = entry?;
            ids.push(value.value());
        }
        ids
    };
    ids.into_iter().map(|id| load_permission(txn, id)).collect()
}

fn write_permissions(
    txn: &WriteTransaction,
    content_type: &ContentType,
    existing: Option<&[Permission]>,
) -> StoreResult<Vec<Permission>> {
    let mut permissions = Vec::with_capacity(Action::ALL.len());
    for action in Action::ALL {
        let id = match existing.and_then(|perms| perms.iter().find(|p| p.action == action)) {
            Some(p) => p.id,
            None => next_id(txn, PERMISSION_SEQUENCE)?,
        };
        permissions.push(Permission {
            id,
            name: permission_name(&content_type.content_name, action),
            content_type_id: content_type.id,
            action,
        });
    }

    let mut table = txn.open_table(PERMISSIONS)?;
    let mut index = txn.open_table(PERMISSION_INDEX)?;
    for permission in &permissions {
        let json = serde_json::to_vec(permission)?;
        table.insert(permission.id, json.as_slice())?;
        index.insert((content_type.id, permission.action.code()), permission.id)?;
    }
    Ok(permissions)
}

// =============================================================================
// IdentityDatabase
// =============================================================================

/// Embedded ACID identity database.
pub struct IdentityDatabase {
    db: Database,
}

impl IdentityDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::initialize(Database::create(path)?)
    }

    /// Open a database that lives only in memory.
    pub fn in_memory() -> StoreResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::initialize(db)
    }

    fn initialize(db: Database) -> StoreResult<Self> {
        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USERNAME_INDEX)?;
            let _ = write_txn.open_table(CONTENT_TYPES)?;
            let _ = write_txn.open_table(CONTENT_NAME_INDEX)?;
            let _ = write_txn.open_table(PERMISSIONS)?;
            let _ = write_txn.open_table(PERMISSION_INDEX)?;
            let _ = write_txn.open_table(GRANTS)?;
            let _ = write_txn.open_table(SEQUENCES)?;
        }
        write_txn.commit()?;
        Ok(Self { db })
    }

    /// Cheap read used by the readiness probe.
    pub fn ping(&self) -> StoreResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(USERS)?;
        Ok(())
    }

    // =========================================================================
    // Users
    // =========================================================================

    pub fn user_count(&self) -> StoreResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        Ok(table.len()?)
    }

    /// Create a user together with active grants for `permission_ids`.
    ///
    /// Either everything commits or nothing does.
    pub fn create_user(&self, new_user: NewUser, permission_ids: &[i64]) -> StoreResult<User> {
        let now = Utc::now();
        let write_txn = self.db.begin_write()?;
        let user = {
            {
                let index = write_txn.open_table(USERNAME_INDEX)?;
                if index.get(new_user.username.as_str())?.is_some() {
                    return Err(StoreError::Conflict(format!(
                        "Username '{}' already exists",
                        new_user.username
                    )));
                }
            }
            for permission_id in permission_ids {
                load_permission(&write_txn, *permission_id)?;
            }

            let user = User {
                id: next_id(&write_txn, USER_SEQUENCE)?,
                username: new_user.username,
                password_hash: new_user.password_hash,
                is_superuser: new_user.is_superuser,
                last_login: None,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            };

            let json = serde_json::to_vec(&user)?;
            write_txn.open_table(USERS)?.insert(user.id, json.as_slice())?;
            write_txn
                .open_table(USERNAME_INDEX)?
                .insert(user.username.as_str(), user.id)?;

            for permission_id in permission_ids {
                put_grant(&write_txn, user.id, *permission_id, true, now)?;
            }
            user
        };
        write_txn.commit()?;
        Ok(user)
    }

    /// All users, ordered by id.
    pub fn list_users(&self) -> StoreResult<Vec<User>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        let mut users = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            users.push(serde_json::from_slice(value.value())?);
        }
        Ok(users)
    }

    fn update_user<F>(&self, user_id: i64, apply: F) -> StoreResult<User>
    where
        F: FnOnce(&mut User),
    {
        let write_txn = self.db.begin_write()?;
        let user = {
            let mut user = load_user(&write_txn, user_id)?;
            apply(&mut user);
            user.updated_at = Utc::now();
            let json = serde_json::to_vec(&user)?;
            write_txn.open_table(USERS)?.insert(user.id, json.as_slice())?;
            user
        };
        write_txn.commit()?;
        Ok(user)
    }

    pub fn set_password_hash(&self, user_id: i64, password_hash: String) -> StoreResult<User> {
        self.update_user(user_id, |user| user.password_hash = password_hash)
    }

    /// Deactivation stamps `deleted_at`; activation clears it.
    pub fn set_user_active(&self, user_id: i64, active: bool) -> StoreResult<User> {
        let now = Utc::now();
        self.update_user(user_id, |user| {
            user.deleted_at = if active { None } else { Some(now) };
        })
    }

    // =========================================================================
    // Content types and permissions
    // =========================================================================

    /// Create a content type and its four permissions in one transaction.
    pub fn create_content_type(
        &self,
        content_name: &str,
        icon: Option<String>,
    ) -> StoreResult<(ContentType, Vec<Permission>)> {
        let write_txn = self.db.begin_write()?;
        let created = {
            {
                let index = write_txn.open_table(CONTENT_NAME_INDEX)?;
                if index.get(content_name)?.is_some() {
                    return Err(StoreError::Conflict(format!(
                        "Content type '{content_name}' already exists"
                    )));
                }
            }

            let content_type = ContentType {
                id: next_id(&write_txn, CONTENT_TYPE_SEQUENCE)?,
                content_name: content_name.to_string(),
                icon,
            };
            let json = serde_json::to_vec(&content_type)?;
            write_txn
                .open_table(CONTENT_TYPES)?
                .insert(content_type.id, json.as_slice())?;
            write_txn
                .open_table(CONTENT_NAME_INDEX)?
                .insert(content_name, content_type.id)?;

            let permissions = write_permissions(&write_txn, &content_type, None)?;
            (content_type, permissions)
        };
        write_txn.commit()?;
        Ok(created)
    }

    /// Rename and/or re-icon a content type. A rename re-derives permission names.
    pub fn update_content_type(
        &self,
        content_type_id: i64,
        content_name: Option<&str>,
        icon: Option<String>,
    ) -> StoreResult<(ContentType, Vec<Permission>)> {
        let write_txn = self.db.begin_write()?;
        let updated = {
            let mut content_type: ContentType = {
                let table = write_txn.open_table(CONTENT_TYPES)?;
                let bytes = table
                    .get(content_type_id)?
                    .map(|v| v.value().to_vec())
                    .ok_or_else(|| StoreError::NotFound(format!("Content type {content_type_id}")))?;
                serde_json::from_slice(&bytes)?
            };

            let renamed = match content_name {
                Some(name) if name != content_type.content_name => {
                    let mut index = write_txn.open_table(CONTENT_NAME_INDEX)?;
                    if index.get(name)?.is_some() {
                        return Err(StoreError::Conflict(format!("Content type '{name}' already exists")));
                    }
                    index.remove(content_type.content_name.as_str())?;
                    index.insert(name, content_type.id)?;
                    content_type.content_name = name.to_string();
                    true
                }
                _ => false,
            };
            if icon.is_some() {
                content_type.icon = icon;
            }

            let json = serde_json::to_vec(&content_type)?;
            write_txn
                .open_table(CONTENT_TYPES)?
                .insert(content_type.id, json.as_slice())?;

            let existing = permissions_in(&write_txn, content_type.id)?;
            let permissions = if renamed {
                write_permissions(&write_txn, &content_type, Some(existing.as_slice()))?
            } else {
                existing
            };
            (content_type, permissions)
        };
        write_txn.commit()?;
        Ok(updated)
    }

    pub fn get_content_type(&self, content_type_id: i64) -> StoreResult<ContentType> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CONTENT_TYPES)?;
        match table.get(content_type_id)? {
            Some(value) => Ok(serde_json::from_slice(value.value())?),
            None => Err(StoreError::NotFound(format!("Content type {content_type_id}"))),
        }
    }

    pub fn list_content_types(&self) -> StoreResult<Vec<ContentType>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CONTENT_TYPES)?;
        let mut content_types = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            content_types.push(serde_json::from_slice(value.value())?);
        }
        Ok(content_types)
    }

    /// Permissions of one content type, in action order.
    pub fn permissions_for(&self, content_type_id: i64) -> StoreResult<Vec<Permission>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(PERMISSION_INDEX)?;
        let table = read_txn.open_table(PERMISSIONS)?;
        let mut permissions = Vec::new();
        for entry in index.range((content_type_id, u8::MIN)..=(content_type_id, u8::MAX))? {
            let (_, id) = entry?;
            if let Some(value) = table.get(id.value())? {
                permissions.push(serde_json::from_slice(value.value())?);
            }
        }
        Ok(permissions)
    }

    pub fn list_permissions(&self) -> StoreResult<Vec<Permission>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PERMISSIONS)?;
        let mut permissions = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            permissions.push(serde_json::from_slice(value.value())?);
        }
        Ok(permissions)
    }

    // =========================================================================
    // Grants
    // =========================================================================

    /// Permissions currently granted (active) to a user.
    pub fn active_permissions(&self, user_id: i64) -> StoreResult<Vec<Permission>> {
        let read_txn = self.db.begin_read()?;
        let grants = read_txn.open_table(GRANTS)?;
        let table = read_txn.open_table(PERMISSIONS)?;
        let mut permissions = Vec::new();
        for entry in grants.range((user_id, i64::MIN)..=(user_id, i64::MAX))? {
            let (key, value) = entry?;
            let grant: Grant = serde_json::from_slice(value.value())?;
            if !grant.active {
                continue;
            }
            let (_, permission_id) = key.value();
            if let Some(permission) = table.get(permission_id)? {
                permissions.push(serde_json::from_slice(permission.value())?);
            }
        }
        Ok(permissions)
    }

    /// Activate `active_ids` (inserting missing grants) and deactivate
    /// `inactive_ids`, all in one transaction.
    pub fn update_grants(&self, user_id: i64, active_ids: &[i64], inactive_ids: &[i64]) -> StoreResult<()> {
        let now = Utc::now();
        let write_txn = self.db.begin_write()?;
        {
            load_user(&write_txn, user_id)?;
            for permission_id in active_ids.iter().chain(inactive_ids) {
                load_permission(&write_txn, *permission_id)?;
            }
            for permission_id in active_ids {
                put_grant(&write_txn, user_id, *permission_id, true, now)?;
            }
            for permission_id in inactive_ids {
                let exists = write_txn
                    .open_table(GRANTS)?
                    .get((user_id, *permission_id))?
                    .is_some();
                if exists {
                    put_grant(&write_txn, user_id, *permission_id, false, now)?;
                }
            }
        }
        write_txn.commit()?;
        Ok(())
    }
}

impl IdentityStore for IdentityDatabase {
    fn find_user_by_username(&self, username: &str) -> StoreResult<User> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(USERNAME_INDEX)?;
        let table = read_txn.open_table(USERS)?;
        let not_found = || StoreError::NotFound(format!("User '{username}'"));

        let user_id = index.get(username)?.map(|v| v.value()).ok_or_else(not_found)?;
        let user: User = match table.get(user_id)? {
            Some(value) => serde_json::from_slice(value.value())?,
            None => return Err(not_found()),
        };
        if !user.is_active() {
            return Err(not_found());
        }
        Ok(user)
    }

    fn find_user_by_id(&self, id: i64) -> StoreResult<User> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        match table.get(id)? {
            Some(value) => Ok(serde_json::from_slice(value.value())?),
            None => Err(StoreError::NotFound(format!("User {id}"))),
        }
    }

    fn save_user(&self, user: &User) -> StoreResult<()> {
        let json = serde_json::to_vec(user)?;
        let write_txn = self.db.begin_write()?;
        {
            let previous = load_user(&write_txn, user.id)?;
            if previous.username != user.username {
                let mut index = write_txn.open_table(USERNAME_INDEX)?;
                if index.get(user.username.as_str())?.is_some() {
                    return Err(StoreError::Conflict(format!(
                        "Username '{}' already exists",
                        user.username
                    )));
                }
                index.remove(previous.username.as_str())?;
                index.insert(user.username.as_str(), user.id)?;
            }
            write_txn.open_table(USERS)?.insert(user.id, json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn record_login(&self, user_id: i64, at: DateTime<Utc>) -> StoreResult<User> {
        let write_txn = self.db.begin_write()?;
        let user = {
            let mut user = load_user(&write_txn, user_id)?;
            if !user.is_active() {
                return Err(StoreError::NotFound(format!("User {user_id}")));
            }
            user.last_login = Some(at);
            let json = serde_json::to_vec(&user)?;
            write_txn.open_table(USERS)?.insert(user.id, json.as_slice())?;
            user
        };
        write_txn.commit()?;
        Ok(user)
    }

    fn find_permission(&self, content_type_id: i64, action: Action) -> StoreResult<i64> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(PERMISSION_INDEX)?;
        index
            .get((content_type_id, action.code()))?
            .map(|v| v.value())
            .ok_or_else(|| {
                StoreError::NotFound(format!(
                    "Permission {} on content type {content_type_id}",
                    action.as_str()
                ))
            })
    }

    fn find_grant(&self, user_id: i64, permission_id: i64) -> StoreResult<Grant> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(GRANTS)?;
        match table.get((user_id, permission_id))? {
            Some(value) => Ok(serde_json::from_slice(value.value())?),
            None => Err(StoreError::NotFound(format!(
                "Grant of permission {permission_id} to user {user_id}"
            ))),
        }
    }

    fn upsert_grant(&self, user_id: i64, permission_id: i64, active: bool) -> StoreResult<Grant> {
        let write_txn = self.db.begin_write()?;
        let grant = {
            load_user(&write_txn, user_id)?;
            load_permission(&write_txn, permission_id)?;
            put_grant(&write_txn, user_id, permission_id, active, Utc::now())?
        };
        write_txn.commit()?;
        Ok(grant)
    }

    fn lookup_grant(&self, user_id: i64, content_type_id: i64, action: Action) -> StoreResult<GrantLookup> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(PERMISSION_INDEX)?;
        let grants = read_txn.open_table(GRANTS)?;

        let Some(permission_id) = index.get((content_type_id, action.code()))?.map(|v| v.value()) else {
            return Ok(GrantLookup::NoPermission);
        };
        match grants.get((user_id, permission_id))? {
            Some(value) => Ok(GrantLookup::Found(serde_json::from_slice(value.value())?)),
            None => Ok(GrantLookup::NoGrant { permission_id }),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
