// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Permission resolution.
//!
//! A decision is a function of the caller's claims and the grant table:
//!
//! 1. Superusers are authorized without touching the store.
//! 2. A content type without a permission row for the action is `NotFound`.
//! 3. Without an active grant for that permission the caller is `Forbidden`.

use axum::http::Method;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::claims::ClaimSet;
use super::error::AuthError;
use crate::storage::{GrantLookup, IdentityStore, StoreResult};

/// CRUD action on a content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Create, Action::Read, Action::Update, Action::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }

    /// Stable storage code, used in the permission index key.
    pub fn code(&self) -> u8 {
        match self {
            Action::Create => 0,
            Action::Read => 1,
            Action::Update => 2,
            Action::Delete => 3,
        }
    }

    pub fn from_method(method: &Method) -> Result<Self, AuthError> {
        match *method {
            Method::POST => Ok(Action::Create),
            Method::GET => Ok(Action::Read),
            Method::PUT | Method::PATCH => Ok(Action::Update),
            Method::DELETE => Ok(Action::Delete),
            _ => Err(AuthError::UnsupportedMethod(method.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// No permission is defined for the content type and action
    NotFound,
    /// The permission exists but is not actively granted
    Forbidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Authorized,
    Denied(Denial),
}

/// Decide whether `claims` may perform `action` on `content_type_id`.
///
/// Reads at most once from the store and never writes.
pub fn authorize<S>(store: &S, claims: &ClaimSet, content_type_id: i64, action: Action) -> StoreResult<Decision>
where
    S: IdentityStore + ?Sized,
{
    if claims.is_superuser {
        return Ok(Decision::Authorized);
    }

    let decision = match store.lookup_grant(claims.user_id, content_type_id, action)? {
        GrantLookup::NoPermission => Decision::Denied(Denial::NotFound),
        GrantLookup::NoGrant { .. } => Decision::Denied(Denial::Forbidden),
        GrantLookup::Found(grant) if grant.active => Decision::Authorized,
        GrantLookup::Found(_) => Decision::Denied(Denial::Forbidden),
    };
    Ok(decision)
}

/// Transport-facing check: map the method, resolve, and fold denials into errors.
pub fn authorize_method<S>(store: &S, claims: &ClaimSet, content_type_id: i64, method: &Method) -> Result<(), AuthError>
where
    S: IdentityStore + ?Sized,
{
    let action = Action::from_method(method)?;
    let decision = authorize(store, claims, content_type_id, action).map_err(AuthError::internal)?;

    match decision {
        Decision::Authorized => Ok(()),
        Decision::Denied(denial) => {
            tracing::warn!(
                target: "audit",
                user_id = claims.user_id,
                content_type_id,
                action = action.as_str(),
                ?denial,
                "Permission denied"
            );
            Err(match denial {
                Denial::NotFound => AuthError::PermissionNotFound,
                Denial::Forbidden => AuthError::PermissionDenied,
            })
        }
    }
}
