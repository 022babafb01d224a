// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential verification with Argon2id.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use ring::rand::{SecureRandom, SystemRandom};

use super::error::AuthError;

/// Minimum length accepted for a user-chosen password.
pub const MIN_PASSWORD_LENGTH: usize = 8;

const SALT_BYTES: usize = 16;
const TEMPORARY_PASSWORD_LENGTH: usize = 16;
const TEMPORARY_PASSWORD_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz23456789";

/// A well-formed hash no password matches, carrying the default Argon2id
/// cost parameters. Unknown accounts are verified against it so every
/// failed login pays for one verification.
pub const DUMMY_PASSWORD_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$Y0ea1poJCyWCd+yPum+ZQQ$4O6LtQaF4F+g9H7QQgOulT/f0FX1vSiS6hhlBCVPjDo";

/// Hash a password into a PHC string with a fresh random salt.
pub fn hash_password(plain: &str) -> Result<String, AuthError> {
    let mut salt_bytes = [0u8; SALT_BYTES];
    SystemRandom::new()
        .fill(&mut salt_bytes)
        .map_err(|_| AuthError::internal("system random source unavailable"))?;
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AuthError::internal(format!("salt encoding failed: {e}")))?;
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::internal(format!("password hashing failed: {e}")))
}

/// Check `plain` against a stored PHC hash.
///
/// A mismatch is `Ok(false)`. An unparseable stored hash is a system fault.
pub fn verify_password(plain: &str, stored_hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| AuthError::internal(format!("stored password hash is unreadable: {e}")))?;

    match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::internal(format!("password verification failed: {e}"))),
    }
}

/// Generate a one-time password handed out by an administrative reset.
pub fn generate_temporary_password() -> Result<String, AuthError> {
    let rng = SystemRandom::new();
    let alphabet_len = TEMPORARY_PASSWORD_ALPHABET.len();
    // Bytes at or above the largest multiple of the alphabet size are
    // rejected so every character is equally likely.
    let limit = 256 - 256 % alphabet_len;
    let mut password = String::with_capacity(TEMPORARY_PASSWORD_LENGTH);
    let mut bytes = [0u8; TEMPORARY_PASSWORD_LENGTH];

    while password.len() < TEMPORARY_PASSWORD_LENGTH {
        rng.fill(&mut bytes)
            .map_err(|_| AuthError::internal("system random source unavailable"))?;
        for b in bytes.iter().map(|b| *b as usize).filter(|b| *b < limit) {
            if password.len() == TEMPORARY_PASSWORD_LENGTH {
                break;
            }
            password.push(TEMPORARY_PASSWORD_ALPHABET[b % alphabet_len] as char);
        }
    }
    Ok(password)
}
