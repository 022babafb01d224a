// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the REST API. Storage records never leave
//! the server directly: users in particular are always projected through
//! [`UserResponse`], which omits the password hash.
//!
//! ## Model Categories
//!
//! - **Sessions**: login, refresh and logout bodies
//! - **Users**: administration, listing and grants
//! - **Content types**: resource types and their permissions

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::Action;
use crate::storage::query::{
    DayRange, PageRequest, QueryError, SortOrder, TriState, UserFilter, UserSortField,
};
use crate::storage::{ContentType, Page, Permission, User};

// =============================================================================
// Sessions
// =============================================================================

#[derive(Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Tokens are returned in the body as well as set as cookies.
#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub message: String,
    pub access_token: String,
    pub refresh_token: String,
    pub csrf_token: String,
}

impl std::fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginResponse")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefreshResponse {
    pub message: String,
    pub access_token: String,
    /// Only present when refresh-token rotation is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// =============================================================================
// Users
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub is_superuser: bool,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            is_active: user.is_active(),
            username: user.username,
            is_superuser: user.is_superuser,
            last_login: user.last_login,
            created_at: user.created_at,
            updated_at: user.updated_at,
            deleted_at: user.deleted_at,
        }
    }
}

#[derive(Clone, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub username: String,
    /// At least 8 characters
    pub password: String,
    #[serde(default)]
    pub is_superuser: bool,
    /// Permissions granted (active) on creation
    #[serde(default)]
    pub permission_ids: Vec<i64>,
}

/// Query parameters of `GET /v1/users`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserListParams {
    /// User id prefix
    pub id: Option<String>,
    /// Username prefix
    pub username: Option<String>,
    /// `y`, `n` or `a`
    pub superuser: Option<String>,
    /// `y`, `n` or `a`
    pub active: Option<String>,
    pub last_login_start: Option<NaiveDate>,
    pub last_login_end: Option<NaiveDate>,
    pub created_at_start: Option<NaiveDate>,
    pub created_at_end: Option<NaiveDate>,
    /// `id`, `username`, `last_login` or `created_at`
    pub sort_by: Option<String>,
    /// `asc` or `desc`
    pub sort_order: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl UserListParams {
    pub fn into_query(self) -> Result<(UserFilter, PageRequest), QueryError> {
        let filter = UserFilter {
            id_prefix: self.id.filter(|v| !v.is_empty()),
            username_prefix: self.username.filter(|v| !v.is_empty()),
            superuser: parse_optional::<TriState>(self.superuser.as_deref())?,
            active: parse_optional::<TriState>(self.active.as_deref())?,
            last_login: DayRange::new(self.last_login_start, self.last_login_end)?,
            created_at: DayRange::new(self.created_at_start, self.created_at_end)?,
            sort_field: parse_optional::<UserSortField>(self.sort_by.as_deref())?,
            sort_order: parse_optional::<SortOrder>(self.sort_order.as_deref())?,
        };
        Ok((filter, PageRequest::new(self.page, self.page_size)?))
    }
}

fn parse_optional<T>(value: Option<&str>) -> Result<T, QueryError>
where
    T: std::str::FromStr<Err = QueryError> + Default,
{
    value.map(str::parse).transpose().map(Option::unwrap_or_default)
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserListResponse {
    pub items: Vec<UserResponse>,
    pub total: usize,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl From<Page<UserResponse>> for UserListResponse {
    fn from(page: Page<UserResponse>) -> Self {
        Self {
            items: page.items,
            total: page.total,
            page: page.page,
            page_size: page.page_size,
            total_pages: page.total_pages,
        }
    }
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CursorParams {
    /// Last user id seen
    pub cursor: Option<i64>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserCursorResponse {
    pub items: Vec<UserResponse>,
    pub next_cursor: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Username or id prefix
    pub q: String,
    pub limit: Option<u32>,
}

#[derive(Clone, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub password: String,
    pub confirm_password: String,
}

#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct ResetPasswordResponse {
    pub message: String,
    /// Shown once; only its hash is stored
    pub temporary_password: String,
}

impl std::fmt::Debug for ResetPasswordResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResetPasswordResponse")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateGrantsRequest {
    /// Permissions to grant or re-activate
    #[serde(default)]
    pub active_ids: Vec<i64>,
    /// Permissions to deactivate
    #[serde(default)]
    pub inactive_ids: Vec<i64>,
}

// =============================================================================
// Content types and permissions
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct PermissionResponse {
    pub id: i64,
    pub name: String,
    pub content_type_id: i64,
    pub action: Action,
}

impl From<Permission> for PermissionResponse {
    fn from(permission: Permission) -> Self {
        Self {
            id: permission.id,
            name: permission.name,
            content_type_id: permission.content_type_id,
            action: permission.action,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ContentTypeResponse {
    pub id: i64,
    pub content_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl From<ContentType> for ContentTypeResponse {
    fn from(content_type: ContentType) -> Self {
        Self {
            id: content_type.id,
            content_name: content_type.content_name,
            icon: content_type.icon,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContentTypeWithPermissions {
    pub content_type: ContentTypeResponse,
    pub content_permissions: Vec<PermissionResponse>,
}

impl ContentTypeWithPermissions {
    pub fn new(content_type: ContentType, permissions: Vec<Permission>) -> Self {
        Self {
            content_type: content_type.into(),
            content_permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateContentTypeRequest {
    pub content_name: String,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateContentTypeRequest {
    #[serde(default)]
    pub content_name: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_response_hides_password_hash() {
        let now = Utc::now();
        let user = User {
            id: 1,
            username: "alice".into(),
            password_hash: "$argon2id$secret".into(),
            is_superuser: false,
            last_login: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let json = serde_json::to_string(&UserResponse::from(user)).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains(r#""is_active":true"#));
    }

    #[test]
    fn secret_bearing_responses_redact_debug() {
        let reset = ResetPasswordResponse {
            message: "password reset".into(),
            temporary_password: "Tmp9secretXYZ".into(),
        };
        let rendered = format!("{reset:?}");
        assert!(rendered.contains("password reset"));
        assert!(!rendered.contains("Tmp9secretXYZ"));
    }

    #[test]
    fn list_params_parse_into_filter() {
        let params = UserListParams {
            superuser: Some("n".into()),
            sort_by: Some("username".into()),
            sort_order: Some("desc".into()),
            page: Some(2),
            ..Default::default()
        };
        let (filter, page) = params.into_query().unwrap();
        assert_eq!(filter.superuser, TriState::No);
        assert_eq!(filter.active, TriState::All);
        assert_eq!(filter.sort_field, UserSortField::Username);
        assert_eq!(filter.sort_order, SortOrder::Desc);
        assert_eq!(page.page, 2);
    }

    #[test]
    fn list_params_reject_unknown_sort_field() {
        let params = UserListParams {
            sort_by: Some("password_hash".into()),
            ..Default::default()
        };
        assert!(matches!(
            params.into_query(),
            Err(QueryError::UnknownSortField(_))
        ));
    }

    #[test]
    fn grant_update_defaults_to_empty_lists() {
        let request: UpdateGrantsRequest = serde_json::from_str("{}").unwrap();
        assert!(request.active_ids.is_empty());
        assert!(request.inactive_ids.is_empty());
    }
}
