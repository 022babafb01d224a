// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token codec.
//!
//! Access and refresh tokens are HMAC-signed JWTs with independent secrets
//! and lifetimes. A token's kind is decided only by which secret verifies
//! it, so a refresh token presented as an access token (or the reverse)
//! fails as `Invalid`.
//!
//! Expiry is checked here rather than by `jsonwebtoken` so that:
//! - `Expired` is only reported once the signature has verified;
//! - the boundary is exact (`now >= exp`), with no leeway.

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::claims::{ClaimSet, Identity, TokenKind};
use super::error::AuthError;
use crate::config::AuthConfig;

/// Decode failure, as seen by callers.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("token invalid")]
    Invalid,
}

/// A freshly minted token with the claims it carries.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub token: String,
    pub claims: ClaimSet,
}

/// Wire payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireClaims {
    user_id: i64,
    #[serde(rename = "super", default)]
    is_superuser: bool,
    #[serde(default)]
    iat: i64,
    exp: i64,
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKeys {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

pub struct TokenCodec {
    algorithm: Algorithm,
    access: SigningKeys,
    refresh: SigningKeys,
    access_ttl: TimeDelta,
    refresh_ttl: TimeDelta,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.algorithm)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            algorithm: config.algorithm,
            access: SigningKeys::from_secret(&config.access_secret),
            refresh: SigningKeys::from_secret(&config.refresh_secret),
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
        }
    }

    pub fn ttl(&self, kind: TokenKind) -> TimeDelta {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        }
    }

    fn keys(&self, kind: TokenKind) -> &SigningKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    pub fn encode(&self, identity: Identity, kind: TokenKind) -> Result<TokenGrant, AuthError> {
        self.encode_at(identity, kind, Utc::now())
    }

    /// Sign `identity` with `exp = issued_at + ttl(kind)`.
    pub fn encode_at(
        &self,
        identity: Identity,
        kind: TokenKind,
        issued_at: DateTime<Utc>,
    ) -> Result<TokenGrant, AuthError> {
        let expires = issued_at
            .checked_add_signed(self.ttl(kind))
            .ok_or_else(|| AuthError::internal("token expiry overflows"))?;
        let wire = WireClaims {
            user_id: identity.user_id,
            is_superuser: identity.is_superuser,
            iat: issued_at.timestamp(),
            exp: expires.timestamp(),
        };

        let token = encode(&Header::new(self.algorithm), &wire, &self.keys(kind).encoding)
            .map_err(|e| AuthError::internal(format!("failed to sign {} token: {e}", kind.as_str())))?;

        let expires_at = DateTime::from_timestamp(wire.exp, 0)
            .ok_or_else(|| AuthError::internal("token expiry out of range"))?;

        Ok(TokenGrant {
            token,
            claims: ClaimSet {
                user_id: identity.user_id,
                is_superuser: identity.is_superuser,
                expires_at,
            },
        })
    }

    pub fn decode(&self, token: &str, kind: TokenKind) -> Result<ClaimSet, TokenError> {
        self.decode_at(token, kind, Utc::now())
    }

    /// Verify `token` against the secret for `kind` as of `now`.
    pub fn decode_at(&self, token: &str, kind: TokenKind, now: DateTime<Utc>) -> Result<ClaimSet, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        let data = decode::<WireClaims>(token, &self.keys(kind).decoding, &validation).map_err(|e| {
            debug!(kind = kind.as_str(), reason = ?e.kind(), "Token rejected");
            TokenError::Invalid
        })?;
        let wire = data.claims;

        if now.timestamp() >= wire.exp {
            return Err(TokenError::Expired);
        }

        let expires_at = DateTime::from_timestamp(wire.exp, 0).ok_or(TokenError::Invalid)?;
        Ok(ClaimSet {
            user_id: wire.user_id,
            is_superuser: wire.is_superuser,
            expires_at,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    pub(crate) const ACCESS_SECRET: &str = "test-access-secret-0123456789abcdef";
    pub(crate) const REFRESH_SECRET: &str = "test-refresh-secret-0123456789abcdef";

    pub(crate) fn test_auth_config() -> AuthConfig {
        AuthConfig {
            access_secret: ACCESS_SECRET.to_string(),
            refresh_secret: REFRESH_SECRET.to_string(),
            algorithm: Algorithm::HS256,
            access_ttl: TimeDelta::minutes(15),
            refresh_ttl: TimeDelta::hours(168),
            rotate_refresh_tokens: false,
        }
    }

    fn codec() -> TokenCodec {
        TokenCodec::new(&test_auth_config())
    }

    fn alice() -> Identity {
        Identity {
            user_id: 42,
            is_superuser: false,
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn access_token_round_trips_before_expiry() {
        let codec = codec();
        let issued = at(1_700_000_000);
        let grant = codec.encode_at(alice(), TokenKind::Access, issued).unwrap();

        let claims = codec
            .decode_at(&grant.token, TokenKind::Access, issued + TimeDelta::minutes(14))
            .unwrap();
        assert_eq!(claims.user_id, 42);
        assert!(!claims.is_superuser);
        assert_eq!(claims.expires_at, issued + TimeDelta::minutes(15));
        assert_eq!(claims, grant.claims);
    }

    #[test]
    fn expiry_boundary_is_exact() {
        let codec = codec();
        let issued = at(1_700_000_000);
        let grant = codec.encode_at(alice(), TokenKind::Access, issued).unwrap();
        let exp = issued + TimeDelta::minutes(15);

        assert!(codec
            .decode_at(&grant.token, TokenKind::Access, exp - TimeDelta::seconds(1))
            .is_ok());
        assert_eq!(
            codec.decode_at(&grant.token, TokenKind::Access, exp),
            Err(TokenError::Expired)
        );
        assert_eq!(
            codec.decode_at(&grant.token, TokenKind::Access, exp + TimeDelta::hours(1)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn refresh_token_outlives_access_token() {
        let codec = codec();
        let issued = at(1_700_000_000);
        let grant = codec.encode_at(alice(), TokenKind::Refresh, issued).unwrap();

        let later = issued + TimeDelta::hours(24);
        assert!(codec.decode_at(&grant.token, TokenKind::Refresh, later).is_ok());
    }

    #[test]
    fn tokens_do_not_cross_kinds() {
        let codec = codec();
        let access = codec.encode(alice(), TokenKind::Access).unwrap();
        let refresh = codec.encode(alice(), TokenKind::Refresh).unwrap();

        assert_eq!(
            codec.decode(&access.token, TokenKind::Refresh),
            Err(TokenError::Invalid)
        );
        assert_eq!(
            codec.decode(&refresh.token, TokenKind::Access),
            Err(TokenError::Invalid)
        );
    }

    #[test]
    fn expired_token_signed_with_wrong_secret_is_invalid() {
        let codec = codec();
        let issued = at(1_600_000_000);
        let refresh = codec.encode_at(alice(), TokenKind::Refresh, issued).unwrap();

        // Long past expiry, but the signature check comes first.
        assert_eq!(
            codec.decode(&refresh.token, TokenKind::Access),
            Err(TokenError::Invalid)
        );
    }

    #[test]
    fn tampered_payload_is_invalid() {
        let codec = codec();
        let grant = codec.encode(alice(), TokenKind::Access).unwrap();
        let parts: Vec<&str> = grant.token.split('.').collect();

        let forged = URL_SAFE_NO_PAD.encode(br#"{"user_id":1,"super":true,"iat":0,"exp":9999999999}"#);
        let tampered = format!("{}.{}.{}", parts[0], forged, parts[2]);

        assert_eq!(
            codec.decode(&tampered, TokenKind::Access),
            Err(TokenError::Invalid)
        );
    }

    #[test]
    fn garbage_is_invalid() {
        let codec = codec();
        assert_eq!(codec.decode("", TokenKind::Access), Err(TokenError::Invalid));
        assert_eq!(
            codec.decode("not.a.token", TokenKind::Access),
            Err(TokenError::Invalid)
        );
    }

    #[test]
    fn missing_user_id_is_invalid() {
        let codec = codec();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &serde_json::json!({ "exp": 9_999_999_999i64 }),
            &EncodingKey::from_secret(ACCESS_SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(codec.decode(&token, TokenKind::Access), Err(TokenError::Invalid));
    }

    #[test]
    fn missing_exp_is_invalid() {
        let codec = codec();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &serde_json::json!({ "user_id": 42 }),
            &EncodingKey::from_secret(ACCESS_SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(codec.decode(&token, TokenKind::Access), Err(TokenError::Invalid));
    }

    #[test]
    fn algorithm_mismatch_is_invalid() {
        let codec = codec();
        let token = encode(
            &Header::new(Algorithm::HS512),
            &serde_json::json!({ "user_id": 42, "exp": 9_999_999_999i64 }),
            &EncodingKey::from_secret(ACCESS_SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(codec.decode(&token, TokenKind::Access), Err(TokenError::Invalid));
    }

    #[test]
    fn superuser_flag_survives_round_trip() {
        let codec = codec();
        let admin = Identity {
            user_id: 1,
            is_superuser: true,
        };
        let grant = codec.encode(admin, TokenKind::Access).unwrap();
        let claims = codec.decode(&grant.token, TokenKind::Access).unwrap();
        assert!(claims.is_superuser);
    }
}
