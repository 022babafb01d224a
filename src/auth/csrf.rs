// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! CSRF double-submit tokens.
//!
//! A token is issued once per login as a script-readable cookie. Every
//! authenticated request must echo it in the `X-CSRF-Token` header.

use base64ct::{Base64UrlUnpadded, Encoding};
use ring::rand::{SecureRandom, SystemRandom};

use super::error::AuthError;

pub const CSRF_HEADER: &str = "x-csrf-token";

const CSRF_TOKEN_BYTES: usize = 32;

/// Generate a fresh anti-forgery token.
pub fn generate_csrf_token() -> Result<String, AuthError> {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; CSRF_TOKEN_BYTES];
    rng.fill(&mut bytes)
        .map_err(|_| AuthError::internal("system random source unavailable"))?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// Both values must be present, non-empty and identical.
pub fn check_double_submit(cookie: Option<&str>, header: Option<&str>) -> Result<(), AuthError> {
    match (cookie, header) {
        (Some(cookie), Some(header)) if !cookie.is_empty() && cookie == header => Ok(()),
        _ => Err(AuthError::InvalidCsrfToken),
    }
}
