// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity claims carried by session tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Which secret signs (and verifies) a token.
///
/// The kind is never written into the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// The subject a token is minted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub is_superuser: bool,
}

/// Claims decoded from a verified token.
///
/// Rebuilt on every decode and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ClaimSet {
    pub user_id: i64,
    pub is_superuser: bool,
    pub expires_at: DateTime<Utc>,
}

impl ClaimSet {
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.user_id,
            is_superuser: self.is_superuser,
        }
    }

    /// Returns whether this caller may act on the given user's records.
    pub fn is_self_or_superuser(&self, user_id: i64) -> bool {
        self.is_superuser || self.user_id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(user_id: i64, is_superuser: bool) -> ClaimSet {
        ClaimSet {
            user_id,
            is_superuser,
            expires_at: Utc::now(),
        }
    }

    #[test]
    fn self_access_is_allowed() {
        assert!(claims(7, false).is_self_or_superuser(7));
        assert!(!claims(7, false).is_self_or_superuser(8));
    }

    #[test]
    fn superuser_may_act_on_anyone() {
        assert!(claims(1, true).is_self_or_superuser(42));
    }

    #[test]
    fn identity_drops_expiry() {
        let identity = claims(3, true).identity();
        assert_eq!(identity, Identity { user_id: 3, is_superuser: true });
    }
}
