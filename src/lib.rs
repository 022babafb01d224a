// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Authz - Session & Permission Service
//!
//! Issues cookie-bound access/refresh sessions and decides, per request,
//! whether a user may perform an action on a content type.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Sessions, tokens, CSRF and permission resolution
//! - `config` - Environment configuration
//! - `storage` - Users, content types, permissions and grants (redb)

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod state;
pub mod storage;
