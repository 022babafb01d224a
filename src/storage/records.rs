// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persisted record types.
//!
//! Records are stored as JSON values in redb tables keyed by their numeric id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::permissions::Action;

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    /// Argon2id PHC string
    pub password_hash: String,
    pub is_superuser: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set when the account is deactivated
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Input for user creation. The id and timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub is_superuser: bool,
}

/// A resource type against which permissions are defined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentType {
    pub id: i64,
    pub content_name: String,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: i64,
    pub name: String,
    pub content_type_id: i64,
    pub action: Action,
}

/// `"{content_name}.{action}"`, e.g. `invoice.read`.
pub fn permission_name(content_name: &str, action: Action) -> String {
    format!("{content_name}.{}", action.as_str())
}

/// One user's access to one permission. Toggled, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub user_id: i64,
    pub permission_id: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_names_follow_content_name() {
        assert_eq!(permission_name("invoice", Action::Read), "invoice.read");
        assert_eq!(permission_name("invoice", Action::Delete), "invoice.delete");
    }

    #[test]
    fn deactivated_user_is_inactive() {
        let now = Utc::now();
        let mut user = User {
            id: 1,
            username: "alice".into(),
            password_hash: String::new(),
            is_superuser: false,
            last_login: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        assert!(user.is_active());
        user.deleted_at = Some(now);
        assert!(!user.is_active());
    }
}
