// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! All configuration is read from the environment once at startup and
//! validated into [`AppConfig`]. Signing secrets have no default value: the
//! server refuses to start without them.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `ACCESS_TOKEN_SECRET` | HMAC secret for access tokens | Required |
//! | `REFRESH_TOKEN_SECRET` | HMAC secret for refresh tokens (must differ) | Required |
//! | `JWT_ALGORITHM` | `HS256`, `HS384` or `HS512` | `HS256` |
//! | `ACCESS_TOKEN_TTL_MINUTES` | Access token lifetime | `15` |
//! | `REFRESH_TOKEN_TTL_HOURS` | Refresh token lifetime | `168` |
//! | `REFRESH_TOKEN_ROTATION` | Re-issue the refresh token on refresh | `false` |
//! | `COOKIE_SECURE` | Set the `Secure` cookie attribute | `true` |
//! | `COOKIE_SAME_SITE` | `strict`, `lax` or `none` | `strict` |
//! | `DATA_DIR` | Directory holding the identity database | `./data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `CORS_ALLOWED_ORIGINS` | Comma-separated origins allowed with credentials | Unset |
//! | `BOOTSTRAP_ADMIN_USERNAME` | Superuser created on an empty database | Unset |
//! | `BOOTSTRAP_ADMIN_PASSWORD` | Password for the bootstrap superuser | Unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::fmt;
use std::path::PathBuf;

use chrono::TimeDelta;
use jsonwebtoken::Algorithm;
use thiserror::Error;

pub const ACCESS_TOKEN_SECRET_ENV: &str = "ACCESS_TOKEN_SECRET";
pub const REFRESH_TOKEN_SECRET_ENV: &str = "REFRESH_TOKEN_SECRET";
pub const JWT_ALGORITHM_ENV: &str = "JWT_ALGORITHM";
pub const ACCESS_TOKEN_TTL_ENV: &str = "ACCESS_TOKEN_TTL_MINUTES";
pub const REFRESH_TOKEN_TTL_ENV: &str = "REFRESH_TOKEN_TTL_HOURS";
pub const REFRESH_TOKEN_ROTATION_ENV: &str = "REFRESH_TOKEN_ROTATION";
pub const COOKIE_SECURE_ENV: &str = "COOKIE_SECURE";
pub const COOKIE_SAME_SITE_ENV: &str = "COOKIE_SAME_SITE";

/// Environment variable name for the directory holding `identity.redb`.
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const CORS_ALLOWED_ORIGINS_ENV: &str = "CORS_ALLOWED_ORIGINS";
pub const BOOTSTRAP_ADMIN_USERNAME_ENV: &str = "BOOTSTRAP_ADMIN_USERNAME";
pub const BOOTSTRAP_ADMIN_PASSWORD_ENV: &str = "BOOTSTRAP_ADMIN_PASSWORD";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Minimum accepted length (in bytes) of an HMAC signing secret.
pub const MIN_SECRET_LENGTH: usize = 32;

const DEFAULT_ACCESS_TTL_MINUTES: i64 = 15;
const DEFAULT_REFRESH_TTL_HOURS: i64 = 168;
const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            name,
            reason: reason.into(),
        }
    }
}

/// Token signing configuration.
#[derive(Clone)]
pub struct AuthConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    /// HMAC-SHA family only.
    pub algorithm: Algorithm,
    pub access_ttl: TimeDelta,
    pub refresh_ttl: TimeDelta,
    /// When set, `/auth/refresh` also returns a fresh refresh token.
    pub rotate_refresh_tokens: bool,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("rotate_refresh_tokens", &self.rotate_refresh_tokens)
            .finish()
    }
}

/// `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    #[default]
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Cookie security flags applied to every cookie the server sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookieConfig {
    pub secure: bool,
    pub same_site: SameSite,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            secure: true,
            same_site: SameSite::Strict,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Credentials for the superuser seeded into an empty database.
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub cors_allowed_origins: Vec<String>,
    pub bootstrap_admin: Option<BootstrapAdmin>,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub auth: AuthConfig,
    pub cookies: CookieConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let access_secret = get(ACCESS_TOKEN_SECRET_ENV).ok_or(ConfigError::Missing(ACCESS_TOKEN_SECRET_ENV))?;
        let refresh_secret =
            get(REFRESH_TOKEN_SECRET_ENV).ok_or(ConfigError::Missing(REFRESH_TOKEN_SECRET_ENV))?;
        validate_secret(ACCESS_TOKEN_SECRET_ENV, &access_secret)?;
        validate_secret(REFRESH_TOKEN_SECRET_ENV, &refresh_secret)?;
        if access_secret == refresh_secret {
            return Err(ConfigError::invalid(
                REFRESH_TOKEN_SECRET_ENV,
                "must differ from the access token secret",
            ));
        }

        let algorithm = match get(JWT_ALGORITHM_ENV) {
            Some(value) => parse_algorithm(&value)?,
            None => Algorithm::HS256,
        };

        let access_minutes = parse_positive(ACCESS_TOKEN_TTL_ENV, get(ACCESS_TOKEN_TTL_ENV), DEFAULT_ACCESS_TTL_MINUTES)?;
        let refresh_hours = parse_positive(REFRESH_TOKEN_TTL_ENV, get(REFRESH_TOKEN_TTL_ENV), DEFAULT_REFRESH_TTL_HOURS)?;
        let access_ttl = TimeDelta::try_minutes(access_minutes)
            .ok_or_else(|| ConfigError::invalid(ACCESS_TOKEN_TTL_ENV, "out of range"))?;
        let refresh_ttl = TimeDelta::try_hours(refresh_hours)
            .ok_or_else(|| ConfigError::invalid(REFRESH_TOKEN_TTL_ENV, "out of range"))?;
        if refresh_ttl <= access_ttl {
            return Err(ConfigError::invalid(
                REFRESH_TOKEN_TTL_ENV,
                "refresh lifetime must exceed the access lifetime",
            ));
        }

        let auth = AuthConfig {
            access_secret,
            refresh_secret,
            algorithm,
            access_ttl,
            refresh_ttl,
            rotate_refresh_tokens: parse_bool(REFRESH_TOKEN_ROTATION_ENV, get(REFRESH_TOKEN_ROTATION_ENV), false)?,
        };

        let same_site = match get(COOKIE_SAME_SITE_ENV).as_deref().map(str::to_ascii_lowercase) {
            None => SameSite::Strict,
            Some(v) if v == "strict" => SameSite::Strict,
            Some(v) if v == "lax" => SameSite::Lax,
            Some(v) if v == "none" => SameSite::None,
            Some(v) => return Err(ConfigError::invalid(COOKIE_SAME_SITE_ENV, format!("unknown value '{v}'"))),
        };
        let cookies = CookieConfig {
            secure: parse_bool(COOKIE_SECURE_ENV, get(COOKIE_SECURE_ENV), true)?,
            same_site,
        };
        // Browsers drop SameSite=None cookies that are not Secure.
        if cookies.same_site == SameSite::None && !cookies.secure {
            return Err(ConfigError::invalid(COOKIE_SAME_SITE_ENV, "'none' requires COOKIE_SECURE=true"));
        }

        let port = match get(PORT_ENV) {
            Some(v) => v
                .parse::<u16>()
                .map_err(|e| ConfigError::invalid(PORT_ENV, e.to_string()))?,
            None => DEFAULT_PORT,
        };

        let bootstrap_admin = match (get(BOOTSTRAP_ADMIN_USERNAME_ENV), get(BOOTSTRAP_ADMIN_PASSWORD_ENV)) {
            (Some(username), Some(password)) => Some(BootstrapAdmin { username, password }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(BOOTSTRAP_ADMIN_PASSWORD_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(BOOTSTRAP_ADMIN_USERNAME_ENV)),
        };

        let log_format = match get(LOG_FORMAT_ENV).as_deref() {
            Some("json") => LogFormat::Json,
            Some("pretty") | None => LogFormat::Pretty,
            Some(other) => return Err(ConfigError::invalid(LOG_FORMAT_ENV, format!("unknown value '{other}'"))),
        };

        let server = ServerConfig {
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            data_dir: PathBuf::from(get(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())),
            cors_allowed_origins: get(CORS_ALLOWED_ORIGINS_ENV)
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|o| !o.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            bootstrap_admin,
            log_format,
        };

        Ok(Self { auth, cookies, server })
    }
}

fn validate_secret(name: &'static str, secret: &str) -> Result<(), ConfigError> {
    if secret.len() < MIN_SECRET_LENGTH {
        return Err(ConfigError::invalid(
            name,
            format!("must be at least {MIN_SECRET_LENGTH} bytes"),
        ));
    }
    Ok(())
}

fn parse_algorithm(value: &str) -> Result<Algorithm, ConfigError> {
    match value.to_ascii_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => Err(ConfigError::invalid(
            JWT_ALGORITHM_ENV,
            format!("'{other}' is not an HMAC-SHA algorithm"),
        )),
    }
}

fn parse_positive(name: &'static str, value: Option<String>, default: i64) -> Result<i64, ConfigError> {
    let Some(value) = value else {
        return Ok(default);
    };
    let parsed = value
        .parse::<i64>()
        .map_err(|e| ConfigError::invalid(name, e.to_string()))?;
    if parsed <= 0 {
        return Err(ConfigError::invalid(name, "must be positive"));
    }
    Ok(parsed)
}

fn parse_bool(name: &'static str, value: Option<String>, default: bool) -> Result<bool, ConfigError> {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(ConfigError::invalid(name, format!("'{other}' is not a boolean"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const ACCESS: &str = "access-secret-access-secret-access-secret";
    const REFRESH: &str = "refresh-secret-refresh-secret-refresh-secret";

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| map.get(name).cloned())
    }

    fn load_with(extra: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let mut vars = vec![(ACCESS_TOKEN_SECRET_ENV, ACCESS), (REFRESH_TOKEN_SECRET_ENV, REFRESH)];
        vars.extend_from_slice(extra);
        load(&vars)
    }

    #[test]
    fn secrets_are_required() {
        let err = load(&[]).unwrap_err();
        assert_eq!(err, ConfigError::Missing(ACCESS_TOKEN_SECRET_ENV));

        let err = load(&[(ACCESS_TOKEN_SECRET_ENV, ACCESS)]).unwrap_err();
        assert_eq!(err, ConfigError::Missing(REFRESH_TOKEN_SECRET_ENV));
    }

    #[test]
    fn defaults_apply_when_only_secrets_are_set() {
        let config = load_with(&[]).unwrap();
        assert_eq!(config.auth.algorithm, Algorithm::HS256);
        assert_eq!(config.auth.access_ttl, TimeDelta::minutes(15));
        assert_eq!(config.auth.refresh_ttl, TimeDelta::hours(168));
        assert!(!config.auth.rotate_refresh_tokens);
        assert_eq!(config.cookies, CookieConfig::default());
        assert_eq!(config.server.port, 8080);
        assert!(config.server.bootstrap_admin.is_none());
        assert!(config.server.cors_allowed_origins.is_empty());
    }

    #[test]
    fn short_or_identical_secrets_are_rejected() {
        let err = load(&[(ACCESS_TOKEN_SECRET_ENV, "short"), (REFRESH_TOKEN_SECRET_ENV, REFRESH)]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: ACCESS_TOKEN_SECRET_ENV, .. }));

        let err = load(&[(ACCESS_TOKEN_SECRET_ENV, ACCESS), (REFRESH_TOKEN_SECRET_ENV, ACCESS)]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: REFRESH_TOKEN_SECRET_ENV, .. }));
    }

    #[test]
    fn non_hmac_algorithms_are_rejected() {
        let err = load_with(&[(JWT_ALGORITHM_ENV, "RS256")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: JWT_ALGORITHM_ENV, .. }));

        let config = load_with(&[(JWT_ALGORITHM_ENV, "hs512")]).unwrap();
        assert_eq!(config.auth.algorithm, Algorithm::HS512);
    }

    #[test]
    fn refresh_must_outlive_access() {
        let err = load_with(&[
            (ACCESS_TOKEN_TTL_ENV, "120"),
            (REFRESH_TOKEN_TTL_ENV, "1"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: REFRESH_TOKEN_TTL_ENV, .. }));
    }

    #[test]
    fn same_site_none_requires_secure() {
        let err = load_with(&[
            (COOKIE_SAME_SITE_ENV, "none"),
            (COOKIE_SECURE_ENV, "false"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: COOKIE_SAME_SITE_ENV, .. }));

        let config = load_with(&[(COOKIE_SAME_SITE_ENV, "Lax")]).unwrap();
        assert_eq!(config.cookies.same_site, SameSite::Lax);
    }

    #[test]
    fn bootstrap_admin_needs_both_values() {
        let err = load_with(&[(BOOTSTRAP_ADMIN_USERNAME_ENV, "root")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing(BOOTSTRAP_ADMIN_PASSWORD_ENV));
    }

    #[test]
    fn cors_origins_are_split_and_trimmed() {
        let config = load_with(&[(
            CORS_ALLOWED_ORIGINS_ENV,
            "https://a.example, https://b.example,,",
        )])
        .unwrap();
        assert_eq!(
            config.server.cors_allowed_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = load_with(&[]).unwrap();
        let rendered = format!("{:?}", config.auth);
        assert!(!rendered.contains(ACCESS));
        assert!(!rendered.contains(REFRESH));
        assert!(rendered.contains("<redacted>"));
    }
}
