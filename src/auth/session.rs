// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session issuance (login).

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::claims::{Identity, TokenKind};
use super::codec::{TokenCodec, TokenGrant};
use super::csrf::generate_csrf_token;
use super::error::AuthError;
use super::password::{verify_password, DUMMY_PASSWORD_HASH};
use crate::storage::{IdentityStore, StoreError};

/// Everything a successful login hands back to the transport.
#[derive(Debug, Clone)]
pub struct Session {
    pub access: TokenGrant,
    pub refresh: TokenGrant,
    pub csrf_token: String,
}

type Verifier = fn(&str, &str) -> Result<bool, AuthError>;

/// Verifies credentials and mints a token pair.
///
/// Password verification is CPU-bound; call from a blocking thread.
pub struct SessionIssuer<'a, S: ?Sized> {
    store: &'a S,
    codec: &'a TokenCodec,
    verify: Verifier,
}

impl<'a, S> SessionIssuer<'a, S>
where
    S: IdentityStore + ?Sized,
{
    pub fn new(store: &'a S, codec: &'a TokenCodec) -> Self {
        Self {
            store,
            codec,
            verify: verify_password,
        }
    }

    #[cfg(test)]
    fn with_verifier(mut self, verify: Verifier) -> Self {
        self.verify = verify;
        self
    }

    pub fn login(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        self.login_at(username, password, Utc::now())
    }

    pub fn login_at(&self, username: &str, password: &str, now: DateTime<Utc>) -> Result<Session, AuthError> {
        let found = match self.store.find_user_by_username(username) {
            Ok(user) => Some(user),
            Err(StoreError::NotFound(_)) => None,
            Err(e) => return Err(AuthError::internal(e)),
        };

        // Unknown accounts still cost one Argon2 verification.
        let stored_hash = found
            .as_ref()
            .map_or(DUMMY_PASSWORD_HASH, |user| user.password_hash.as_str());
        let matches = (self.verify)(password, stored_hash)?;

        let user = match found {
            Some(user) if matches => user,
            Some(user) => {
                warn!(target: "audit", user_id = user.id, "Login failed: wrong password");
                return Err(AuthError::InvalidCredentials);
            }
            None => {
                warn!(target: "audit", username, "Login failed: unknown or inactive account");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let user = match self.store.record_login(user.id, now) {
            Ok(user) => user,
            Err(StoreError::NotFound(_)) => {
                warn!(target: "audit", user_id = user.id, "Login failed: account deactivated during login");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(AuthError::internal(e)),
        };

        let identity = Identity {
            user_id: user.id,
            is_superuser: user.is_superuser,
        };
        let session = Session {
            access: self.codec.encode_at(identity, TokenKind::Access, now)?,
            refresh: self.codec.encode_at(identity, TokenKind::Refresh, now)?,
            csrf_token: generate_csrf_token()?,
        };

        info!(target: "audit", user_id = user.id, is_superuser = user.is_superuser, "Login succeeded");
        Ok(session)
    }
}
