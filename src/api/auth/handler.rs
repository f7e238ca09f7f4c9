// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap},
    Json,
};
use tracing::{info, warn};

use super::request::CredentialsRequest;
use super::response::{LoginResponse, LogoutResponse};
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::firebase::AuthSession;

/// Token from an `Authorization: Bearer ...` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

async fn open_session(state: &AppState, auth: AuthSession) -> LoginResponse {
    let email = auth.email.clone();
    let user_id = auth.user_id.clone();
    let expires_in = state.sessions.ttl_for(&auth).as_secs();
    let session_token = state.sessions.create(auth).await;

    LoginResponse {
        session_token,
        email,
        user_id,
        expires_in,
    }
}

/// POST /v1/auth/login
///
/// # Errors
/// - 400: missing or malformed email/password
/// - 401: wrong credentials
/// - 502: identity provider unreachable
pub async fn login_handler(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = payload?;
    request.validate()?;

    let auth = state
        .auth
        .sign_in(request.email.trim(), &request.password)
        .await
        .map_err(|e| {
            warn!("Login failed for {}: {}", request.email, e);
            ApiError::from(e)
        })?;

    info!("✅ {} logged in", auth.email);
    Ok(Json(open_session(&state, auth).await))
}

/// POST /v1/auth/signup
///
/// Creates the account and logs it in. 409 if the email is taken.
pub async fn signup_handler(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = payload?;
    request.validate()?;

    let auth = state
        .auth
        .sign_up(request.email.trim(), &request.password)
        .await?;

    info!("✅ Account created for {}", auth.email);
    Ok(Json(open_session(&state, auth).await))
}

/// POST /v1/auth/logout
pub async fn logout_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<LogoutResponse>, ApiError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

    let logged_out = state.sessions.remove(token).await;
    Ok(Json(LogoutResponse { logged_out }))
}
