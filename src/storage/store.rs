// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The narrow store boundary consumed by the session and permission core.

use chrono::{DateTime, Utc};

use super::records::{Grant, User};
use super::{StoreError, StoreResult};
use crate::auth::permissions::Action;

/// Outcome of resolving a grant for `(user, content type, action)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantLookup {
    /// No permission row exists for the content type and action
    NoPermission,
    /// The permission exists but the user has no grant row for it
    NoGrant { permission_id: i64 },
    Found(Grant),
}

/// Persistence operations the core depends on.
///
/// Lookups report absence as [`StoreError::NotFound`].
pub trait IdentityStore: Send + Sync {
    /// Active (non-deactivated) accounts only.
    fn find_user_by_username(&self, username: &str) -> StoreResult<User>;

    /// Includes deactivated accounts.
    fn find_user_by_id(&self, id: i64) -> StoreResult<User>;

    fn save_user(&self, user: &User) -> StoreResult<()>;

    /// Stamp `last_login` and nothing else, in one write.
    ///
    /// A user deactivated since they were read reports [`StoreError::NotFound`].
    fn record_login(&self, user_id: i64, at: DateTime<Utc>) -> StoreResult<User>;

    fn find_permission(&self, content_type_id: i64, action: Action) -> StoreResult<i64>;

    fn find_grant(&self, user_id: i64, permission_id: i64) -> StoreResult<Grant>;

    fn upsert_grant(&self, user_id: i64, permission_id: i64, active: bool) -> StoreResult<Grant>;

    /// Resolve permission and grant together.
    ///
    /// Implementations backed by a transactional store should override this
    /// to read both rows from one snapshot.
    fn lookup_grant(&self, user_id: i64, content_type_id: i64, action: Action) -> StoreResult<GrantLookup> {
        let permission_id = match self.find_permission(content_type_id, action) {
            Ok(id) => id,
            Err(StoreError::NotFound(_)) => return Ok(GrantLookup::NoPermission),
            Err(e) => return Err(e),
        };
        match self.find_grant(user_id, permission_id) {
            Ok(grant) => Ok(GrantLookup::Found(grant)),
            Err(StoreError::NotFound(_)) => Ok(GrantLookup::NoGrant { permission_id }),
            Err(e) => Err(e),
        }
    }
}
