//! Account endpoints.
//!
//! - `POST /api/auth/register`: create a user and its role profile
//! - `POST /api/auth/login`: exchange credentials for a bearer token
//! - `POST /api/auth/logout`: end the current session
//! - `GET /api/me`: current user and profile

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::extract::ApiJson;
use crate::api::types::{ApiContext, AuthContext};
use crate::identity::{self, Registration};
use crate::models::{Profile, User};
use crate::profiles;

#[derive(Serialize)]
pub struct AccountResponse {
    pub user: User,
    pub profile: Profile,
}

/// `POST /api/auth/register`
pub async fn register(
    State(ctx): State<ApiContext>,
    ApiJson(registration): ApiJson<Registration>,
) -> Result<(StatusCode, Json<AccountResponse>), ApiError> {
    // PBKDF2 runs on the blocking pool.
    let core = ctx.core.clone();
    let (user, profile) = tokio::task::spawn_blocking(move || -> Result<_, ApiError> {
        let conn = core.open_db()?;
        Ok(identity::register(&conn, registration, core.pbkdf2_iterations())?)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("register task failed: {e}")))??;

    Ok((StatusCode::CREATED, Json(AccountResponse { user, profile })))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
    pub profile: Profile,
}

/// `POST /api/auth/login`
pub async fn login(
    State(ctx): State<ApiContext>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let core = ctx.core.clone();
    let (user, profile) = tokio::task::spawn_blocking(move || -> Result<_, ApiError> {
        let conn = core.open_db()?;
        let user = identity::authenticate(
            &conn,
            &request.email,
            &request.password,
            core.pbkdf2_iterations(),
        )?;
        let profile = profiles::load_profile(&conn, &user)?;
        Ok((user, profile))
    })
    .await
    .map_err(|e| ApiError::Internal(format!("login task failed: {e}")))??;

    let token = ctx.sessions.create(user.id);
    tracing::info!(user_id = %user.id, role = %user.role, "User logged in");

    Ok(Json(LoginResponse {
        token,
        user,
        profile,
    }))
}

/// `POST /api/auth/logout`
pub async fn logout(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
) -> StatusCode {
    ctx.sessions.revoke(&auth.token);
    tracing::info!(user_id = %auth.user.id, "User logged out");
    StatusCode::NO_CONTENT
}

/// `GET /api/me`
pub async fn me(Extension(auth): Extension<AuthContext>) -> Json<AccountResponse> {
    Json(AccountResponse {
        user: auth.user,
        profile: auth.profile,
    })
}
