// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session middleware for Axum.
//!
//! Authenticates a whole router subtree once and stores the [`ClaimSet`] in
//! request extensions, where the `Auth` and `AdminOnly` extractors pick it up.
//!
//! ```rust,ignore
//! let protected = Router::new()
//!     .route("/v1/users/me", get(me))
//!     .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_session));
//! ```

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::extractor::authenticate_headers;
use super::ClaimSet;
use crate::state::AppState;

/// Reject unauthenticated requests, otherwise attach their claims.
pub async fn require_session(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    match authenticate_headers(&state.codec, request.headers()) {
        Ok(claims) => {
            tracing::Span::current().record("user_id", claims.user_id);
            request.extensions_mut().insert::<ClaimSet>(claims);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}
