// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication and authorization errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Coarse failure category shared by every auth operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthorized,
    Forbidden,
    NotFound,
    BadRequest,
    Internal,
}

impl ErrorKind {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Authentication error type.
///
/// An expired access token is reported apart from an invalid one; signature
/// failures carry no further detail.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown user, deactivated user or wrong password
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("access token missing")]
    AccessTokenMissing,

    #[error("invalid csrf token")]
    InvalidCsrfToken,

    #[error("access token expired; refresh")]
    AccessTokenExpired,

    #[error("invalid token")]
    InvalidToken,

    #[error("refresh token missing")]
    RefreshTokenMissing,

    #[error("refresh token expired; log in again")]
    RefreshTokenExpired,

    #[error("invalid refresh token")]
    InvalidRefreshToken,

    /// Refresh for a user that no longer exists or was deactivated
    #[error("account unavailable")]
    AccountUnavailable,

    /// A cookie required by a payload inspection endpoint is absent
    #[error("{0} cookie missing")]
    CookieMissing(&'static str),

    #[error("superuser privileges required")]
    SuperuserRequired,

    /// No permission row exists for the resource type and action
    #[error("permission not found")]
    PermissionNotFound,

    #[error("permission denied")]
    PermissionDenied,

    #[error("method {0} does not map to an action")]
    UnsupportedMethod(String),

    /// Detail is logged, never rendered
    #[error("internal authentication error")]
    Internal(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        AuthError::Internal(detail.to_string())
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::AccessTokenMissing => "access_token_missing",
            AuthError::InvalidCsrfToken => "invalid_csrf_token",
            AuthError::AccessTokenExpired => "access_token_expired",
            AuthError::InvalidToken => "invalid_token",
            AuthError::RefreshTokenMissing => "refresh_token_missing",
            AuthError::RefreshTokenExpired => "refresh_token_expired",
            AuthError::InvalidRefreshToken => "invalid_refresh_token",
            AuthError::AccountUnavailable => "account_unavailable",
            AuthError::CookieMissing(_) => "cookie_missing",
            AuthError::SuperuserRequired => "superuser_required",
            AuthError::PermissionNotFound => "permission_not_found",
            AuthError::PermissionDenied => "permission_denied",
            AuthError::UnsupportedMethod(_) => "unsupported_method",
            AuthError::Internal(_) => "internal_error",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidCredentials | AuthError::AccessTokenExpired | AuthError::InvalidToken => {
                ErrorKind::Unauthorized
            }
            AuthError::AccessTokenMissing
            | AuthError::InvalidCsrfToken
            | AuthError::RefreshTokenMissing
            | AuthError::RefreshTokenExpired
            | AuthError::InvalidRefreshToken
            | AuthError::AccountUnavailable
            | AuthError::SuperuserRequired
            | AuthError::PermissionDenied => ErrorKind::Forbidden,
            AuthError::PermissionNotFound => ErrorKind::NotFound,
            AuthError::CookieMissing(_) | AuthError::UnsupportedMethod(_) => ErrorKind::BadRequest,
            AuthError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.kind().status_code()
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let AuthError::Internal(detail) = &self {
            tracing::error!(error = %detail, "Internal authentication failure");
        }
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn expired_access_token_returns_401() {
        let response = AuthError::AccessTokenExpired.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error_code"], "access_token_expired");
        assert_eq!(body["error"], "access token expired; refresh");
    }

    #[tokio::test]
    async fn refresh_failures_are_forbidden() {
        for err in [
            AuthError::RefreshTokenMissing,
            AuthError::RefreshTokenExpired,
            AuthError::InvalidRefreshToken,
            AuthError::AccountUnavailable,
        ] {
            assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
        }
    }

    #[tokio::test]
    async fn internal_detail_is_not_rendered() {
        let response = AuthError::internal("stored hash is corrupt").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert!(!text.contains("corrupt"));
    }

    #[test]
    fn permission_outcomes_map_to_distinct_kinds() {
        assert_eq!(AuthError::PermissionNotFound.kind(), ErrorKind::NotFound);
        assert_eq!(AuthError::PermissionDenied.kind(), ErrorKind::Forbidden);
        assert_eq!(
            AuthError::UnsupportedMethod("OPTIONS".into()).kind(),
            ErrorKind::BadRequest
        );
    }
}
