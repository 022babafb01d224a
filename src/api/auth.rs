// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session endpoints: login, refresh, logout and token payload inspection.

use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, HeaderName},
    response::AppendHeaders,
    Json,
};

use crate::{
    auth::{
        cookie::{build_clear_cookie, build_set_cookie, get_cookie, ACCESS_COOKIE_NAME, CSRF_COOKIE_NAME, REFRESH_COOKIE_NAME},
        AuthError, ClaimSet, RefreshCoordinator, SessionIssuer, TokenError, TokenKind,
    },
    models::{LoginRequest, LoginResponse, MessageResponse, RefreshResponse},
    state::AppState,
};

type SetCookies = AppendHeaders<Vec<(HeaderName, String)>>;

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "Session cookies set", body = LoginResponse),
        (status = 401, description = "Invalid username or password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<(SetCookies, Json<LoginResponse>), AuthError> {
    let db = state.db.clone();
    let codec = state.codec.clone();
    let session = tokio::task::spawn_blocking(move || {
        SessionIssuer::new(db.as_ref(), codec.as_ref()).login(&request.username, &request.password)
    })
    .await
    .map_err(|e| AuthError::internal(format!("login task failed: {e}")))??;

    let cookies = &state.config.cookies;
    let headers = vec![
        (
            SET_COOKIE,
            build_set_cookie(ACCESS_COOKIE_NAME, &session.access.token, state.codec.ttl(TokenKind::Access), true, cookies),
        ),
        (
            SET_COOKIE,
            build_set_cookie(REFRESH_COOKIE_NAME, &session.refresh.token, state.codec.ttl(TokenKind::Refresh), true, cookies),
        ),
        (
            SET_COOKIE,
            build_set_cookie(CSRF_COOKIE_NAME, &session.csrf_token, state.codec.ttl(TokenKind::Refresh), false, cookies),
        ),
    ];

    Ok((
        AppendHeaders(headers),
        Json(LoginResponse {
            message: "login successful".to_string(),
            access_token: session.access.token,
            refresh_token: session.refresh.token,
            csrf_token: session.csrf_token,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    tag = "Auth",
    responses(
        (status = 200, description = "New access token issued", body = RefreshResponse),
        (status = 403, description = "Refresh token missing, expired or invalid")
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(SetCookies, Json<RefreshResponse>), AuthError> {
    let refreshed = RefreshCoordinator::new(
        state.db.as_ref(),
        state.codec.as_ref(),
        state.config.auth.rotate_refresh_tokens,
    )
    .refresh(get_cookie(&headers, REFRESH_COOKIE_NAME))?;

    let cookies = &state.config.cookies;
    let mut set_cookies = vec![(
        SET_COOKIE,
        build_set_cookie(ACCESS_COOKIE_NAME, &refreshed.access.token, state.codec.ttl(TokenKind::Access), true, cookies),
    )];
    if let Some(rotated) = &refreshed.refresh {
        set_cookies.push((
            SET_COOKIE,
            build_set_cookie(REFRESH_COOKIE_NAME, &rotated.token, state.codec.ttl(TokenKind::Refresh), true, cookies),
        ));
    }

    Ok((
        AppendHeaders(set_cookies),
        Json(RefreshResponse {
            message: "token refreshed".to_string(),
            access_token: refreshed.access.token,
            refresh_token: refreshed.refresh.map(|grant| grant.token),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "Auth",
    responses((status = 200, description = "Session cookies cleared", body = MessageResponse))
)]
pub async fn logout(State(state): State<AppState>) -> (SetCookies, Json<MessageResponse>) {
    let cookies = &state.config.cookies;
    let headers = vec![
        (SET_COOKIE, build_clear_cookie(ACCESS_COOKIE_NAME, true, cookies)),
        (SET_COOKIE, build_clear_cookie(REFRESH_COOKIE_NAME, true, cookies)),
        (SET_COOKIE, build_clear_cookie(CSRF_COOKIE_NAME, false, cookies)),
    ];
    (AppendHeaders(headers), Json(MessageResponse::new("logged out")))
}

fn inspect(state: &AppState, headers: &HeaderMap, kind: TokenKind) -> Result<ClaimSet, AuthError> {
    let cookie_name = match kind {
        TokenKind::Access => ACCESS_COOKIE_NAME,
        TokenKind::Refresh => REFRESH_COOKIE_NAME,
    };
    let token = get_cookie(headers, cookie_name)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::CookieMissing(cookie_name))?;

    // Expired and invalid are reported alike here.
    state
        .codec
        .decode(token, kind)
        .map_err(|_: TokenError| AuthError::InvalidToken)
}

#[utoipa::path(
    post,
    path = "/auth/access-token/payload",
    tag = "Auth",
    responses(
        (status = 200, body = ClaimSet),
        (status = 400, description = "Access token cookie missing"),
        (status = 401, description = "Token could not be decoded")
    )
)]
pub async fn access_token_payload(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ClaimSet>, AuthError> {
    inspect(&state, &headers, TokenKind::Access).map(Json)
}

#[utoipa::path(
    post,
    path = "/auth/refresh-token/payload",
    tag = "Auth",
    responses(
        (status = 200, body = ClaimSet),
        (status = 400, description = "Refresh token cookie missing"),
        (status = 401, description = "Token could not be decoded")
    )
)]
pub async fn refresh_token_payload(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ClaimSet>, AuthError> {
    inspect(&state, &headers, TokenKind::Refresh).map(Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::hash_password;
    use crate::state::tests::test_state;
    use crate::storage::NewUser;
    use axum::http::{header::COOKIE, HeaderValue, StatusCode};

    fn seed_alice(state: &AppState) -> i64 {
        state
            .db
            .create_user(
                NewUser {
                    username: "alice".into(),
                    password_hash: hash_password("wonderland").unwrap(),
                    is_superuser: false,
                },
                &[],
            )
            .unwrap()
            .id
    }

    fn login_request(password: &str) -> LoginRequest {
        LoginRequest {
            username: "alice".into(),
            password: password.into(),
        }
    }

    fn cookie_header(pairs: &[(&str, &str)]) -> HeaderMap {
        let value = pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ");
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(&value).unwrap());
        headers
    }

    #[tokio::test]
    async fn login_sets_three_cookies() {
        let state = test_state();
        let alice = seed_alice(&state);

        let (AppendHeaders(set_cookies), Json(body)) =
            login(State(state.clone()), Json(login_request("wonderland"))).await.unwrap();

        assert_eq!(set_cookies.len(), 3);
        let access = &set_cookies[0].1;
        let refresh = &set_cookies[1].1;
        let csrf = &set_cookies[2].1;
        assert!(access.starts_with(&format!("access_token={}", body.access_token)));
        assert!(access.contains("HttpOnly") && access.contains("Max-Age=900"));
        assert!(refresh.contains("HttpOnly") && refresh.contains("Max-Age=604800"));
        assert!(csrf.starts_with(&format!("csrf_token={}", body.csrf_token)));
        assert!(!csrf.contains("HttpOnly"));

        let claims = state.codec.decode(&body.access_token, TokenKind::Access).unwrap();
        assert_eq!(claims.user_id, alice);
    }

    #[tokio::test]
    async fn bad_login_is_unauthorized() {
        let state = test_state();
        seed_alice(&state);

        let err = login(State(state), Json(login_request("nope"))).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_sets_only_the_access_cookie_by_default() {
        let state = test_state();
        seed_alice(&state);
        let (_, Json(session)) = login(State(state.clone()), Json(login_request("wonderland"))).await.unwrap();

        let headers = cookie_header(&[(REFRESH_COOKIE_NAME, session.refresh_token.as_str())]);
        let (AppendHeaders(set_cookies), Json(body)) = refresh(State(state.clone()), headers).await.unwrap();

        assert_eq!(set_cookies.len(), 1);
        assert!(set_cookies[0].1.starts_with("access_token="));
        assert!(body.refresh_token.is_none());
        assert!(state.codec.decode(&body.access_token, TokenKind::Access).is_ok());
    }

    #[tokio::test]
    async fn refresh_without_cookie_is_forbidden() {
        let state = test_state();
        let err = refresh(State(state), HeaderMap::new()).await.unwrap_err();
        assert!(matches!(err, AuthError::RefreshTokenMissing));
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn logout_clears_all_cookies() {
        let (AppendHeaders(set_cookies), Json(body)) = logout(State(test_state())).await;
        assert_eq!(body.message, "logged out");
        assert_eq!(set_cookies.len(), 3);
        assert!(set_cookies.iter().all(|(_, c)| c.contains("Max-Age=0")));
    }

    #[tokio::test]
    async fn payload_endpoints_decode_their_own_cookie() {
        let state = test_state();
        let alice = seed_alice(&state);
        let (_, Json(session)) = login(State(state.clone()), Json(login_request("wonderland"))).await.unwrap();

        let headers = cookie_header(&[
            (ACCESS_COOKIE_NAME, session.access_token.as_str()),
            (REFRESH_COOKIE_NAME, session.refresh_token.as_str()),
        ]);
        let Json(access) = access_token_payload(State(state.clone()), headers.clone()).await.unwrap();
        let Json(refresh) = refresh_token_payload(State(state.clone()), headers).await.unwrap();
        assert_eq!(access.user_id, alice);
        assert_eq!(refresh.user_id, alice);

        // Swapped cookies fail verification.
        let swapped = cookie_header(&[(ACCESS_COOKIE_NAME, session.refresh_token.as_str())]);
        let err = access_token_payload(State(state), swapped).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn payload_without_cookie_is_bad_request() {
        let err = refresh_token_payload(State(test_state()), HeaderMap::new()).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
