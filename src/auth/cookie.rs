// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session cookie parsing and `Set-Cookie` construction.

use axum::http::{header::COOKIE, HeaderMap};
use chrono::TimeDelta;

use crate::config::CookieConfig;

pub const ACCESS_COOKIE_NAME: &str = "access_token";
pub const REFRESH_COOKIE_NAME: &str = "refresh_token";
pub const CSRF_COOKIE_NAME: &str = "csrf_token";

/// Find a cookie value across every `Cookie` header of a request.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// Build a `Set-Cookie` value scoped to the whole site.
pub fn build_set_cookie(
    name: &str,
    value: &str,
    max_age: TimeDelta,
    http_only: bool,
    config: &CookieConfig,
) -> String {
    let mut cookie = format!(
        "{name}={value}; Path=/; Max-Age={}; SameSite={}",
        max_age.num_seconds().max(0),
        config.same_site.as_str()
    );
    if http_only {
        cookie.push_str("; HttpOnly");
    }
    if config.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Build a `Set-Cookie` value that removes the cookie.
pub fn build_clear_cookie(name: &str, http_only: bool, config: &CookieConfig) -> String {
    build_set_cookie(name, "", TimeDelta::zero(), http_only, config)
}
