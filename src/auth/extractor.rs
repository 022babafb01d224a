// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request authentication.
//!
//! Use the `Auth` extractor in handlers to require a session:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(claims): Auth) -> impl IntoResponse {
//!     // claims is ClaimSet
//! }
//! ```
//!
//! A request is authenticated when:
//! - the `access_token` cookie is present;
//! - the `X-CSRF-Token` header equals the `csrf_token` cookie;
//! - the access token verifies against the access secret and is unexpired.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};

use super::claims::{ClaimSet, TokenKind};
use super::codec::{TokenCodec, TokenError};
use super::cookie::{get_cookie, ACCESS_COOKIE_NAME, CSRF_COOKIE_NAME};
use super::csrf::{check_double_submit, CSRF_HEADER};
use super::error::AuthError;
use crate::state::AppState;

/// Authenticate from already-extracted credentials.
pub fn authenticate(
    codec: &TokenCodec,
    access_cookie: Option<&str>,
    csrf_cookie: Option<&str>,
    csrf_header: Option<&str>,
) -> Result<ClaimSet, AuthError> {
    let token = access_cookie
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::AccessTokenMissing)?;

    check_double_submit(csrf_cookie, csrf_header)?;

    codec.decode(token, TokenKind::Access).map_err(|e| match e {
        TokenError::Expired => AuthError::AccessTokenExpired,
        TokenError::Invalid => AuthError::InvalidToken,
    })
}

/// Authenticate from request headers (cookies plus the CSRF header).
pub fn authenticate_headers(codec: &TokenCodec, headers: &HeaderMap) -> Result<ClaimSet, AuthError> {
    let csrf_header = headers.get(CSRF_HEADER).and_then(|v| v.to_str().ok());
    authenticate(
        codec,
        get_cookie(headers, ACCESS_COOKIE_NAME),
        get_cookie(headers, CSRF_COOKIE_NAME),
        csrf_header,
    )
}

/// Extractor for authenticated callers.
///
/// Reuses the claim set stored by [`require_session`](super::middleware::require_session)
/// when the route sits behind it.
pub struct Auth(pub ClaimSet);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // First check if middleware already authenticated the request
        if let Some(claims) = parts.extensions.get::<ClaimSet>().cloned() {
            return Ok(Auth(claims));
        }

        let claims = authenticate_headers(&state.codec, &parts.headers)?;
        Ok(Auth(claims))
    }
}

/// Extractor that requires a superuser session.
pub struct AdminOnly(pub ClaimSet);

impl FromRequestParts<AppState> for AdminOnly {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Auth(claims) = Auth::from_request_parts(parts, state).await?;

        if !claims.is_superuser {
            return Err(AuthError::SuperuserRequired);
        }

        Ok(AdminOnly(claims))
    }
}
