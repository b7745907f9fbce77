//! `GET /api/dashboard`: the caller's role-specific landing view.

use axum::extract::State;
use axum::{Extension, Json};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthContext};
use crate::dashboard::{self, Dashboard};

pub async fn get(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Dashboard>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(dashboard::build_dashboard(&conn, &auth.profile)?))
}
