// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account endpoints: register, login, refresh.

use axum::{extract::State, http::StatusCode, Json};

use crate::auth::AuthError;
use crate::models::{LoginRequest, LoginResponse, PublicUser, RefreshRequest, RegisterRequest};
use crate::state::AppState;

/// Create an account.
///
/// New accounts start with a balance of 1000 tokens. When on-chain funding is
/// enabled and a wallet address is given, the account is created with
/// funding `pending`.
#[utoipa::path(
    post,
    path = "/v1/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = PublicUser),
        (status = 400, description = "Invalid input or email already registered"),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), AuthError> {
    let user = state.auth.register(request).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Log in with email and password.
#[utoipa::path(
    post,
    path = "/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid email or password"),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    let response = state.auth.login(&request.email, &request.password).await?;
    Ok(Json(response))
}

/// Exchange a refresh token for a new token pair.
#[utoipa::path(
    post,
    path = "/v1/auth/refresh",
    tag = "Auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Token refreshed", body = LoginResponse),
        (status = 401, description = "Invalid, expired or wrong-type token"),
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    let response = state.auth.refresh(&request.refresh_token).await?;
    Ok(Json(response))
}
