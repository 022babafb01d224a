// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Refresh coordination: a new access token from a valid refresh token.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::claims::{Identity, TokenKind};
use super::codec::{TokenCodec, TokenError, TokenGrant};
use super::error::AuthError;
use crate::storage::{IdentityStore, StoreError};

#[derive(Debug, Clone)]
pub struct Refreshed {
    pub access: TokenGrant,
    /// Present only when refresh-token rotation is enabled.
    pub refresh: Option<TokenGrant>,
}

pub struct RefreshCoordinator<'a, S: ?Sized> {
    store: &'a S,
    codec: &'a TokenCodec,
    rotate: bool,
}

impl<'a, S> RefreshCoordinator<'a, S>
where
    S: IdentityStore + ?Sized,
{
    pub fn new(store: &'a S, codec: &'a TokenCodec, rotate: bool) -> Self {
        Self { store, codec, rotate }
    }

    pub fn refresh(&self, refresh_token: Option<&str>) -> Result<Refreshed, AuthError> {
        self.refresh_at(refresh_token, Utc::now())
    }

    /// The user is re-read so the new token reflects current superuser state
    /// and deactivated accounts are refused.
    pub fn refresh_at(&self, refresh_token: Option<&str>, now: DateTime<Utc>) -> Result<Refreshed, AuthError> {
        let token = refresh_token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::RefreshTokenMissing)?;

        let claims = self
            .codec
            .decode_at(token, TokenKind::Refresh, now)
            .map_err(|e| {
                warn!(target: "audit", reason = %e, "Refresh refused");
                match e {
                    TokenError::Expired => AuthError::RefreshTokenExpired,
                    TokenError::Invalid => AuthError::InvalidRefreshToken,
                }
            })?;

        let user = match self.store.find_user_by_id(claims.user_id) {
            Ok(user) if user.is_active() => user,
            Ok(_) | Err(StoreError::NotFound(_)) => {
                warn!(target: "audit", user_id = claims.user_id, "Refresh refused: account unavailable");
                return Err(AuthError::AccountUnavailable);
            }
            Err(e) => return Err(AuthError::internal(e)),
        };

        let identity = Identity {
            user_id: user.id,
            is_superuser: user.is_superuser,
        };
        let access = self.codec.encode_at(identity, TokenKind::Access, now)?;
        let refresh = if self.rotate {
            Some(self.codec.encode_at(identity, TokenKind::Refresh, now)?)
        } else {
            None
        };

        info!(target: "audit", user_id = user.id, rotated = self.rotate, "Access token refreshed");
        Ok(Refreshed { access, refresh })
    }
}
