// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, HeaderName, HeaderValue, Method, Request},
    middleware::from_fn_with_state,
    routing::{any, get, post, put},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{csrf::CSRF_HEADER, require_session, Action, ClaimSet},
    models::{
        ChangePasswordRequest, ContentTypeResponse, ContentTypeWithPermissions, CreateContentTypeRequest,
        CreateUserRequest, LoginRequest, LoginResponse, MessageResponse, PermissionResponse, RefreshResponse,
        ResetPasswordResponse, UpdateContentTypeRequest, UpdateGrantsRequest, UserCursorResponse,
        UserListResponse, UserResponse,
    },
    state::AppState,
};

pub mod access;
pub mod auth;
pub mod contents;
pub mod health;
pub mod users;

pub fn router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/access-token/payload", post(auth::access_token_payload))
        .route("/refresh-token/payload", post(auth::refresh_token_payload));

    let v1_routes = Router::new()
        .route("/access/{content_type_id}", any(access::check_access))
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/me", get(users::me))
        .route("/users/cursor", get(users::list_users_cursor))
        .route("/users/search", get(users::search))
        .route("/users/{id}", get(users::get_user))
        .route("/users/{id}/password", put(users::change_password))
        .route("/users/{id}/password/reset", post(users::reset_password))
        .route("/users/{id}/deactivate", post(users::deactivate_user))
        .route("/users/{id}/activate", post(users::activate_user))
        .route(
            "/users/{id}/permissions",
            get(users::list_grants).put(users::update_grants),
        )
        .route(
            "/contents",
            get(contents::list_content_types).post(contents::create_content_type),
        )
        .route("/contents/permissions", get(contents::list_with_permissions))
        .route(
            "/contents/{id}",
            get(contents::get_content_type).patch(contents::update_content_type),
        )
        .route("/contents/{id}/permissions", get(contents::get_with_permissions))
        .route_layer(from_fn_with_state(state.clone(), require_session));

    let cors = cors_layer(&state.config.server.cors_allowed_origins);

    Router::new()
        .nest("/auth", auth_routes)
        .nest("/v1", v1_routes)
        .route("/health", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            tracing::info_span!(
                "request",
                method = %request.method(),
                path = %request.uri().path(),
                request_id,
                user_id = tracing::field::Empty,
            )
        }))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(cors)
}

/// Credentialed CORS for the configured origins; same-origin only when none are set.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(CSRF_HEADER)])
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login,
        auth::refresh,
        auth::logout,
        auth::access_token_payload,
        auth::refresh_token_payload,
        access::check_access,
        users::create_user,
        users::list_users,
        users::list_users_cursor,
        users::search,
        users::me,
        users::get_user,
        users::change_password,
        users::reset_password,
        users::deactivate_user,
        users::activate_user,
        users::list_grants,
        users::update_grants,
        contents::create_content_type,
        contents::update_content_type,
        contents::list_content_types,
        contents::get_content_type,
        contents::list_with_permissions,
        contents::get_with_permissions,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            Action,
            ClaimSet,
            LoginRequest,
            LoginResponse,
            RefreshResponse,
            MessageResponse,
            UserResponse,
            CreateUserRequest,
            UserListResponse,
            UserCursorResponse,
            ChangePasswordRequest,
            ResetPasswordResponse,
            UpdateGrantsRequest,
            PermissionResponse,
            ContentTypeResponse,
            ContentTypeWithPermissions,
            CreateContentTypeRequest,
            UpdateContentTypeRequest,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Auth", description = "Login, refresh, logout and token inspection"),
        (name = "Access", description = "Per-request permission checks"),
        (name = "Users", description = "User administration and grants"),
        (name = "Contents", description = "Content types and their permissions"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
