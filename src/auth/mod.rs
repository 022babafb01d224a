// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Cookie-bound sessions and per-request permission checks.
//!
//! ## Session Flow
//!
//! 1. `POST /auth/login` verifies the password and sets three cookies:
//!    - `access_token` (HttpOnly, short-lived, access secret)
//!    - `refresh_token` (HttpOnly, long-lived, refresh secret)
//!    - `csrf_token` (readable by script)
//! 2. Every authenticated request carries the cookies and echoes the CSRF
//!    token in `X-CSRF-Token`.
//! 3. When the access token expires the client calls `POST /auth/refresh`.
//!
//! ## Security
//!
//! - Secrets come from the environment; there are no defaults
//! - Tokens are stateless; deactivation stops refresh, not issued access tokens
//! - Expiry is exact (no clock skew leeway)

pub mod claims;
pub mod codec;
pub mod cookie;
pub mod csrf;
pub mod error;
pub mod extractor;
pub mod middleware;
pub mod password;
pub mod permissions;
pub mod refresh;
pub mod session;

pub use claims::{ClaimSet, Identity, TokenKind};
pub use codec::{TokenCodec, TokenError, TokenGrant};
pub use error::{AuthError, ErrorKind};
pub use extractor::{authenticate, AdminOnly, Auth};
pub use middleware::require_session;
pub use permissions::{authorize, authorize_method, Action, Decision, Denial};
pub use refresh::{RefreshCoordinator, Refreshed};
pub use session::{Session, SessionIssuer};
