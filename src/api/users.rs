// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User administration endpoints.
//!
//! Listing and mutation are superuser-only. A regular user may read their
//! own record and grants and change their own password.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    auth::{
        password::{generate_temporary_password, hash_password, MIN_PASSWORD_LENGTH},
        AdminOnly, Auth, ClaimSet,
    },
    error::ApiError,
    models::{
        ChangePasswordRequest, CreateUserRequest, CursorParams, MessageResponse, PermissionResponse,
        ResetPasswordResponse, SearchParams, UpdateGrantsRequest, UserCursorResponse, UserListParams,
        UserListResponse, UserResponse,
    },
    state::AppState,
    storage::{
        query::{cursor_page, paginate, search_users, DEFAULT_PAGE_SIZE},
        IdentityStore, NewUser,
    },
};

fn check_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::bad_request(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash on the blocking pool.
async fn hash_blocking(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Password hashing task failed");
            ApiError::internal()
        })?
        .map_err(ApiError::from)
}

fn require_self_or_superuser(claims: &ClaimSet, user_id: i64) -> Result<(), ApiError> {
    if claims.is_self_or_superuser(user_id) {
        Ok(())
    } else {
        Err(ApiError::forbidden("you may only access your own account"))
    }
}

#[utoipa::path(
    post,
    path = "/v1/users",
    request_body = CreateUserRequest,
    tag = "Users",
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid username or password"),
        (status = 403, description = "Superuser required"),
        (status = 404, description = "Unknown permission id"),
        (status = 409, description = "Username already exists")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    AdminOnly(admin): AdminOnly,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let username = request.username.trim().to_string();
    if username.is_empty() {
        return Err(ApiError::bad_request("username is required"));
    }
    check_password(&request.password)?;

    let password_hash = hash_blocking(request.password).await?;
    let user = state.db.create_user(
        NewUser {
            username,
            password_hash,
            is_superuser: request.is_superuser,
        },
        &request.permission_ids,
    )?;

    tracing::info!(
        target: "audit",
        actor = admin.user_id,
        user_id = user.id,
        is_superuser = user.is_superuser,
        grants = request.permission_ids.len(),
        "User created"
    );
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[utoipa::path(
    get,
    path = "/v1/users",
    params(UserListParams),
    tag = "Users",
    responses(
        (status = 200, body = UserListResponse),
        (status = 400, description = "Invalid filter, sort or page parameters"),
        (status = 403, description = "Superuser required")
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    AdminOnly(_admin): AdminOnly,
    Query(params): Query<UserListParams>,
) -> Result<Json<UserListResponse>, ApiError> {
    let (filter, page) = params.into_query()?;
    let users = filter.apply(state.db.list_users()?);
    Ok(Json(paginate(users, page).map(UserResponse::from).into()))
}

#[utoipa::path(
    get,
    path = "/v1/users/cursor",
    params(CursorParams),
    tag = "Users",
    responses(
        (status = 200, body = UserCursorResponse),
        (status = 400, description = "Invalid limit"),
        (status = 403, description = "Superuser required")
    )
)]
pub async fn list_users_cursor(
    State(state): State<AppState>,
    AdminOnly(_admin): AdminOnly,
    Query(params): Query<CursorParams>,
) -> Result<Json<UserCursorResponse>, ApiError> {
    let (users, next_cursor) = cursor_page(
        state.db.list_users()?,
        params.cursor,
        params.limit.unwrap_or(DEFAULT_PAGE_SIZE),
    )?;
    Ok(Json(UserCursorResponse {
        items: users.into_iter().map(Into::into).collect(),
        next_cursor,
    }))
}

#[utoipa::path(
    get,
    path = "/v1/users/search",
    params(SearchParams),
    tag = "Users",
    responses(
        (status = 200, body = [UserResponse]),
        (status = 400, description = "Empty search term"),
        (status = 403, description = "Superuser required")
    )
)]
pub async fn search(
    State(state): State<AppState>,
    AdminOnly(_admin): AdminOnly,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    if params.q.trim().is_empty() {
        return Err(ApiError::bad_request("search term is required"));
    }
    let users = search_users(
        state.db.list_users()?,
        &params.q,
        params.limit.unwrap_or(DEFAULT_PAGE_SIZE),
    );
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

/// The caller's identity as carried by their access token.
#[utoipa::path(
    get,
    path = "/v1/users/me",
    tag = "Users",
    responses(
        (status = 200, body = ClaimSet),
        (status = 401, description = "Access token expired or invalid"),
        (status = 403, description = "Not authenticated")
    )
)]
pub async fn me(Auth(claims): Auth) -> Json<ClaimSet> {
    Json(claims)
}

#[utoipa::path(
    get,
    path = "/v1/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    tag = "Users",
    responses(
        (status = 200, body = UserResponse),
        (status = 403, description = "Not your account"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Auth(claims): Auth,
    Path(user_id): Path<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    require_self_or_superuser(&claims, user_id)?;
    Ok(Json(state.db.find_user_by_id(user_id)?.into()))
}

#[utoipa::path(
    put,
    path = "/v1/users/{id}/password",
    params(("id" = i64, Path, description = "User id")),
    request_body = ChangePasswordRequest,
    tag = "Users",
    responses(
        (status = 200, body = MessageResponse),
        (status = 400, description = "Passwords differ or too short"),
        (status = 403, description = "Not your account"),
        (status = 404, description = "User not found")
    )
)]
pub async fn change_password(
    State(state): State<AppState>,
    Auth(claims): Auth,
    Path(user_id): Path<i64>,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    require_self_or_superuser(&claims, user_id)?;
    if request.password != request.confirm_password {
        return Err(ApiError::bad_request("passwords do not match"));
    }
    check_password(&request.password)?;

    let password_hash = hash_blocking(request.password).await?;
    state.db.set_password_hash(user_id, password_hash)?;

    tracing::info!(target: "audit", actor = claims.user_id, user_id, "Password changed");
    Ok(Json(MessageResponse::new("password changed")))
}

#[utoipa::path(
    post,
    path = "/v1/users/{id}/password/reset",
    params(("id" = i64, Path, description = "User id")),
    tag = "Users",
    responses(
        (status = 200, body = ResetPasswordResponse),
        (status = 403, description = "Superuser required"),
        (status = 404, description = "User not found")
    )
)]
pub async fn reset_password(
    State(state): State<AppState>,
    AdminOnly(admin): AdminOnly,
    Path(user_id): Path<i64>,
) -> Result<Json<ResetPasswordResponse>, ApiError> {
    let temporary_password = generate_temporary_password()?;
    let password_hash = hash_blocking(temporary_password.clone()).await?;
    state.db.set_password_hash(user_id, password_hash)?;

    tracing::info!(target: "audit", actor = admin.user_id, user_id, "Password reset");
    Ok(Json(ResetPasswordResponse {
        message: "password reset".to_string(),
        temporary_password,
    }))
}

async fn set_active(state: &AppState, admin: &ClaimSet, user_id: i64, active: bool) -> Result<Json<UserResponse>, ApiError> {
    if !active && admin.user_id == user_id {
        return Err(ApiError::bad_request("you cannot deactivate your own account"));
    }
    let user = state.db.set_user_active(user_id, active)?;
    tracing::info!(target: "audit", actor = admin.user_id, user_id, active, "User activation changed");
    Ok(Json(user.into()))
}

/// Soft-delete a user. Issued access tokens stay valid until they expire.
#[utoipa::path(
    post,
    path = "/v1/users/{id}/deactivate",
    params(("id" = i64, Path, description = "User id")),
    tag = "Users",
    responses(
        (status = 200, body = UserResponse),
        (status = 400, description = "Cannot deactivate yourself"),
        (status = 403, description = "Superuser required"),
        (status = 404, description = "User not found")
    )
)]
pub async fn deactivate_user(
    State(state): State<AppState>,
    AdminOnly(admin): AdminOnly,
    Path(user_id): Path<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    set_active(&state, &admin, user_id, false).await
}

#[utoipa::path(
    post,
    path = "/v1/users/{id}/activate",
    params(("id" = i64, Path, description = "User id")),
    tag = "Users",
    responses(
        (status = 200, body = UserResponse),
        (status = 403, description = "Superuser required"),
        (status = 404, description = "User not found")
    )
)]
pub async fn activate_user(
    State(state): State<AppState>,
    AdminOnly(admin): AdminOnly,
    Path(user_id): Path<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    set_active(&state, &admin, user_id, true).await
}

#[utoipa::path(
    get,
    path = "/v1/users/{id}/permissions",
    params(("id" = i64, Path, description = "User id")),
    tag = "Users",
    responses(
        (status = 200, description = "Active grants", body = [PermissionResponse]),
        (status = 403, description = "Not your account"),
        (status = 404, description = "User not found")
    )
)]
pub async fn list_grants(
    State(state): State<AppState>,
    Auth(claims): Auth,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<PermissionResponse>>, ApiError> {
    require_self_or_superuser(&claims, user_id)?;
    state.db.find_user_by_id(user_id)?;
    let permissions = state.db.active_permissions(user_id)?;
    Ok(Json(permissions.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    put,
    path = "/v1/users/{id}/permissions",
    params(("id" = i64, Path, description = "User id")),
    request_body = UpdateGrantsRequest,
    tag = "Users",
    responses(
        (status = 200, description = "Active grants after the update", body = [PermissionResponse]),
        (status = 400, description = "Permission listed as both active and inactive"),
        (status = 403, description = "Superuser required"),
        (status = 404, description = "Unknown user or permission")
    )
)]
pub async fn update_grants(
    State(state): State<AppState>,
    AdminOnly(admin): AdminOnly,
    Path(user_id): Path<i64>,
    Json(request): Json<UpdateGrantsRequest>,
) -> Result<Json<Vec<PermissionResponse>>, ApiError> {
    if let Some(id) = request.active_ids.iter().find(|id| request.inactive_ids.contains(id)) {
        return Err(ApiError::bad_request(format!(
            "permission {id} cannot be both active and inactive"
        )));
    }

    state
        .db
        .update_grants(user_id, &request.active_ids, &request.inactive_ids)?;
    tracing::info!(
        target: "audit",
        actor = admin.user_id,
        user_id,
        activated = ?request.active_ids,
        deactivated = ?request.inactive_ids,
        "Grants updated"
    );

    let permissions = state.db.active_permissions(user_id)?;
    Ok(Json(permissions.into_iter().map(Into::into).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;
    use crate::auth::Action;
    use crate::state::tests::test_state;
    use chrono::Utc;

    fn claims(user_id: i64, is_superuser: bool) -> ClaimSet {
        ClaimSet {
            user_id,
            is_superuser,
            expires_at: Utc::now(),
        }
    }

    fn admin() -> AdminOnly {
        AdminOnly(claims(1000, true))
    }

    fn new_user(username: &str, permission_ids: Vec<i64>) -> CreateUserRequest {
        CreateUserRequest {
            username: username.into(),
            password: "correct horse".into(),
            is_superuser: false,
            permission_ids,
        }
    }

    async fn create(state: &AppState, username: &str) -> UserResponse {
        let (_, Json(user)) = create_user(State(state.clone()), admin(), Json(new_user(username, vec![])))
            .await
            .unwrap();
        user
    }

    #[tokio::test]
    async fn create_user_hashes_password_and_grants() {
        let state = test_state();
        let (_, permissions) = state.db.create_content_type("articles", None).unwrap();
        let read = permissions.iter().find(|p| p.action == Action::Read).unwrap().id;

        let (status, Json(user)) = create_user(State(state.clone()), admin(), Json(new_user("alice", vec![read])))
            .await
            .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert!(user.is_active);
        let stored = state.db.find_user_by_id(user.id).unwrap();
        assert!(verify_password("correct horse", &stored.password_hash).unwrap());
        let granted = state.db.active_permissions(user.id).unwrap();
        assert_eq!(granted.len(), 1);
        assert_eq!(granted[0].id, read);
    }

    #[tokio::test]
    async fn create_user_rejects_short_password() {
        let state = test_state();
        let mut request = new_user("alice", vec![]);
        request.password = "short".into();

        let err = create_user(State(state), admin(), Json(request)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_user_conflicts_and_unknown_permissions() {
        let state = test_state();
        create(&state, "alice").await;

        let err = create_user(State(state.clone()), admin(), Json(new_user("alice", vec![])))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);

        let err = create_user(State(state.clone()), admin(), Json(new_user("bob", vec![42])))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        // Nothing was written for bob.
        assert_eq!(state.db.list_users().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn list_users_filters_and_pages() {
        let state = test_state();
        for name in ["carol", "alice", "bob"] {
            create(&state, name).await;
        }

        let params = UserListParams {
            sort_by: Some("username".into()),
            page_size: Some(2),
            ..Default::default()
        };
        let Json(page) = list_users(State(state.clone()), admin(), Query(params)).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        let names: Vec<_> = page.items.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, ["alice", "bob"]);

        let params = UserListParams {
            sort_by: Some("password_hash".into()),
            ..Default::default()
        };
        let err = list_users(State(state), admin(), Query(params)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn cursor_listing_walks_all_users() {
        let state = test_state();
        for name in ["a1", "a2", "a3"] {
            create(&state, name).await;
        }

        let first = CursorParams { cursor: None, limit: Some(2) };
        let Json(page) = list_users_cursor(State(state.clone()), admin(), Query(first)).await.unwrap();
        assert_eq!(page.items.len(), 2);
        let next = page.next_cursor.unwrap();

        let second = CursorParams { cursor: Some(next), limit: Some(2) };
        let Json(page) = list_users_cursor(State(state), admin(), Query(second)).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.next_cursor, None);
    }

    #[tokio::test]
    async fn search_matches_username_prefix() {
        let state = test_state();
        for name in ["alice", "albert", "bob"] {
            create(&state, name).await;
        }

        let params = SearchParams { q: "AL".into(), limit: None };
        let Json(found) = search(State(state.clone()), admin(), Query(params)).await.unwrap();
        let names: Vec<_> = found.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, ["albert", "alice"]);

        let empty = SearchParams { q: "  ".into(), limit: None };
        assert!(search(State(state), admin(), Query(empty)).await.is_err());
    }

    #[tokio::test]
    async fn users_can_read_only_themselves() {
        let state = test_state();
        let alice = create(&state, "alice").await;
        let bob = create(&state, "bob").await;

        let Json(me) = get_user(State(state.clone()), Auth(claims(alice.id, false)), Path(alice.id))
            .await
            .unwrap();
        assert_eq!(me.username, "alice");

        let err = get_user(State(state.clone()), Auth(claims(alice.id, false)), Path(bob.id))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        let err = get_user(State(state), Auth(claims(1, true)), Path(999)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn me_echoes_the_claims() {
        let Json(claims) = me(Auth(claims(7, false))).await;
        assert_eq!(claims.user_id, 7);
        assert!(!claims.is_superuser);
    }

    #[tokio::test]
    async fn change_password_rules() {
        let state = test_state();
        let alice = create(&state, "alice").await;
        let bob = create(&state, "bob").await;
        let request = |password: &str, confirm: &str| {
            Json(ChangePasswordRequest {
                password: password.into(),
                confirm_password: confirm.into(),
            })
        };

        let err = change_password(
            State(state.clone()),
            Auth(claims(alice.id, false)),
            Path(alice.id),
            request("new password", "different"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err = change_password(
            State(state.clone()),
            Auth(claims(alice.id, false)),
            Path(bob.id),
            request("new password", "new password"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        let Json(changed) = change_password(
            State(state.clone()),
            Auth(claims(alice.id, false)),
            Path(alice.id),
            request("new password", "new password"),
        )
        .await
        .unwrap();
        assert_eq!(changed.message, "password changed");
        let stored = state.db.find_user_by_id(alice.id).unwrap();
        assert!(verify_password("new password", &stored.password_hash).unwrap());

        // A superuser may change anyone's password.
        let Json(changed) =
            change_password(State(state), Auth(claims(1, true)), Path(bob.id), request("reset by admin", "reset by admin"))
                .await
                .unwrap();
        assert_eq!(changed.message, "password changed");
    }

    #[tokio::test]
    async fn reset_password_returns_usable_temporary_password() {
        let state = test_state();
        let alice = create(&state, "alice").await;

        let Json(reset) = reset_password(State(state.clone()), admin(), Path(alice.id)).await.unwrap();
        let stored = state.db.find_user_by_id(alice.id).unwrap();
        assert!(verify_password(&reset.temporary_password, &stored.password_hash).unwrap());
        assert!(!verify_password("correct horse", &stored.password_hash).unwrap());

        let err = reset_password(State(state), admin(), Path(999)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn deactivate_then_activate() {
        let state = test_state();
        let alice = create(&state, "alice").await;

        let Json(user) = deactivate_user(State(state.clone()), admin(), Path(alice.id)).await.unwrap();
        assert!(!user.is_active);
        assert!(user.deleted_at.is_some());
        assert!(state.db.find_user_by_username("alice").is_err());

        let Json(user) = activate_user(State(state.clone()), admin(), Path(alice.id)).await.unwrap();
        assert!(user.is_active);
        assert!(state.db.find_user_by_username("alice").is_ok());
    }

    #[tokio::test]
    async fn admin_cannot_deactivate_self() {
        let state = test_state();
        let alice = create(&state, "alice").await;
        let self_admin = AdminOnly(claims(alice.id, true));

        let err = deactivate_user(State(state), self_admin, Path(alice.id)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn grant_updates_activate_and_deactivate() {
        let state = test_state();
        let alice = create(&state, "alice").await;
        let (_, permissions) = state.db.create_content_type("articles", None).unwrap();
        let ids: Vec<i64> = permissions.iter().map(|p| p.id).collect();

        let Json(active) = update_grants(
            State(state.clone()),
            admin(),
            Path(alice.id),
            Json(UpdateGrantsRequest {
                active_ids: ids.clone(),
                inactive_ids: vec![],
            }),
        )
        .await
        .unwrap();
        assert_eq!(active.len(), 4);

        let Json(active) = update_grants(
            State(state.clone()),
            admin(),
            Path(alice.id),
            Json(UpdateGrantsRequest {
                active_ids: vec![],
                inactive_ids: ids[1..].to_vec(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, ids[0]);

        let Json(own) = list_grants(State(state.clone()), Auth(claims(alice.id, false)), Path(alice.id))
            .await
            .unwrap();
        assert_eq!(own, active);
    }

    #[tokio::test]
    async fn grant_update_rejects_overlap() {
        let state = test_state();
        let alice = create(&state, "alice").await;

        let err = update_grants(
            State(state),
            admin(),
            Path(alice.id),
            Json(UpdateGrantsRequest {
                active_ids: vec![1],
                inactive_ids: vec![1],
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
