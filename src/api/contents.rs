// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Content-type endpoints.
//!
//! Every content type owns exactly four permissions, one per action; they are
//! created with it and renamed with it.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    auth::{AdminOnly, Auth},
    error::ApiError,
    models::{
        ContentTypeResponse, ContentTypeWithPermissions, CreateContentTypeRequest, UpdateContentTypeRequest,
    },
    state::AppState,
};

fn content_name(raw: &str) -> Result<&str, ApiError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("content_name is required"));
    }
    if name.contains('.') {
        return Err(ApiError::bad_request("content_name must not contain '.'"));
    }
    Ok(name)
}

#[utoipa::path(
    post,
    path = "/v1/contents",
    request_body = CreateContentTypeRequest,
    tag = "Contents",
    responses(
        (status = 201, description = "Content type and its permissions", body = ContentTypeWithPermissions),
        (status = 400, description = "Invalid name"),
        (status = 403, description = "Superuser required"),
        (status = 409, description = "Name already exists")
    )
)]
pub async fn create_content_type(
    State(state): State<AppState>,
    AdminOnly(admin): AdminOnly,
    Json(request): Json<CreateContentTypeRequest>,
) -> Result<(StatusCode, Json<ContentTypeWithPermissions>), ApiError> {
    let name = content_name(&request.content_name)?;
    let (content_type, permissions) = state.db.create_content_type(name, request.icon)?;

    tracing::info!(
        target: "audit",
        actor = admin.user_id,
        content_type_id = content_type.id,
        content_name = %content_type.content_name,
        "Content type created"
    );
    Ok((
        StatusCode::CREATED,
        Json(ContentTypeWithPermissions::new(content_type, permissions)),
    ))
}

#[utoipa::path(
    patch,
    path = "/v1/contents/{id}",
    params(("id" = i64, Path, description = "Content type id")),
    request_body = UpdateContentTypeRequest,
    tag = "Contents",
    responses(
        (status = 200, body = ContentTypeWithPermissions),
        (status = 400, description = "Invalid name"),
        (status = 403, description = "Superuser required"),
        (status = 404, description = "Content type not found"),
        (status = 409, description = "Name already exists")
    )
)]
pub async fn update_content_type(
    State(state): State<AppState>,
    AdminOnly(admin): AdminOnly,
    Path(content_type_id): Path<i64>,
    Json(request): Json<UpdateContentTypeRequest>,
) -> Result<Json<ContentTypeWithPermissions>, ApiError> {
    let name = request.content_name.as_deref().map(content_name).transpose()?;
    let (content_type, permissions) = state
        .db
        .update_content_type(content_type_id, name, request.icon)?;

    tracing::info!(
        target: "audit",
        actor = admin.user_id,
        content_type_id,
        content_name = %content_type.content_name,
        "Content type updated"
    );
    Ok(Json(ContentTypeWithPermissions::new(content_type, permissions)))
}

#[utoipa::path(
    get,
    path = "/v1/contents",
    tag = "Contents",
    responses((status = 200, body = [ContentTypeResponse]))
)]
pub async fn list_content_types(
    State(state): State<AppState>,
    Auth(_user): Auth,
) -> Result<Json<Vec<ContentTypeResponse>>, ApiError> {
    let content_types = state.db.list_content_types()?;
    Ok(Json(content_types.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/v1/contents/{id}",
    params(("id" = i64, Path, description = "Content type id")),
    tag = "Contents",
    responses(
        (status = 200, body = ContentTypeResponse),
        (status = 404, description = "Content type not found")
    )
)]
pub async fn get_content_type(
    State(state): State<AppState>,
    Auth(_user): Auth,
    Path(content_type_id): Path<i64>,
) -> Result<Json<ContentTypeResponse>, ApiError> {
    Ok(Json(state.db.get_content_type(content_type_id)?.into()))
}

/// Every content type with its permissions.
#[utoipa::path(
    get,
    path = "/v1/contents/permissions",
    tag = "Contents",
    responses((status = 200, body = [ContentTypeWithPermissions]))
)]
pub async fn list_with_permissions(
    State(state): State<AppState>,
    Auth(_user): Auth,
) -> Result<Json<Vec<ContentTypeWithPermissions>>, ApiError> {
    let permissions = state.db.list_permissions()?;
    let listing = state
        .db
        .list_content_types()?
        .into_iter()
        .map(|content_type| {
            let mut own: Vec<_> = permissions
                .iter()
                .filter(|p| p.content_type_id == content_type.id)
                .cloned()
                .collect();
            own.sort_by_key(|p| p.action.code());
            ContentTypeWithPermissions::new(content_type, own)
        })
        .collect();
    Ok(Json(listing))
}

#[utoipa::path(
    get,
    path = "/v1/contents/{id}/permissions",
    params(("id" = i64, Path, description = "Content type id")),
    tag = "Contents",
    responses(
        (status = 200, body = ContentTypeWithPermissions),
        (status = 404, description = "Content type not found")
    )
)]
pub async fn get_with_permissions(
    State(state): State<AppState>,
    Auth(_user): Auth,
    Path(content_type_id): Path<i64>,
) -> Result<Json<ContentTypeWithPermissions>, ApiError> {
    let content_type = state.db.get_content_type(content_type_id)?;
    let permissions = state.db.permissions_for(content_type_id)?;
    Ok(Json(ContentTypeWithPermissions::new(content_type, permissions)))
}
