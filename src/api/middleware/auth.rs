//! Bearer token authentication middleware.
//!
//! Extracts `Authorization: Bearer <token>`, resolves it against the
//! session store, loads the caller's user and profile, and injects
//! `AuthContext` into request extensions for downstream handlers.

use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthContext};
use crate::db::repository;
use crate::profiles;

/// Require a live login session.
///
/// Accesses `ApiContext` from request extensions (injected by Extension layer).
/// On success: injects `AuthContext` and adds `Cache-Control: no-store`.
pub async fn require_auth(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_auth_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_auth_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    // 1. Extract bearer token
    let token = bearer_token(&req).ok_or(ApiError::Unauthorized)?;

    // 2. Resolve session
    let user_id = ctx.sessions.resolve(&token).ok_or(ApiError::Unauthorized)?;

    // 3. Load the caller; a deleted account ends the session
    let (user, profile) = {
        let conn = ctx.core.open_db()?;
        let Some(user) = repository::get_user(&conn, &user_id)? else {
            ctx.sessions.revoke(&token);
            return Err(ApiError::Unauthorized);
        };
        let profile = profiles::load_profile(&conn, &user)?;
        (user, profile)
    }; // Connection dropped here, before any .await

    // 4. Inject auth context for downstream handlers
    req.extensions_mut().insert(AuthContext {
        user,
        profile,
        token,
    });

    // 5. Process request
    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert("Cache-Control", HeaderValue::from_static("no-store"));

    Ok(response)
}

fn bearer_token(req: &Request<axum::body::Body>) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
