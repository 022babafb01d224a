// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Forward-auth endpoint.
//!
//! A gateway replays the incoming request's method against
//! `/v1/access/{content_type_id}` and passes the request through on 204.

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
};

use crate::{
    auth::{authorize_method, Auth, AuthError},
    state::AppState,
};

#[utoipa::path(
    get,
    path = "/v1/access/{content_type_id}",
    tag = "Access",
    params(("content_type_id" = i64, Path, description = "Content type to check")),
    responses(
        (status = 204, description = "Authorized"),
        (status = 400, description = "Unsupported method"),
        (status = 401, description = "Access token expired or invalid"),
        (status = 403, description = "Not authenticated or not granted"),
        (status = 404, description = "No permission defined for this action")
    )
)]
pub async fn check_access(
    State(state): State<AppState>,
    Auth(claims): Auth,
    Path(content_type_id): Path<i64>,
    method: Method,
) -> Result<StatusCode, AuthError> {
    authorize_method(state.db.as_ref(), &claims, content_type_id, &method)?;
    Ok(StatusCode::NO_CONTENT)
}
