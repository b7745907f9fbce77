//! `POST /api/claims/:id/:decision`: insurer accepts or rejects a claim.

use axum::extract::{Path, State};
use axum::{Extension, Json};

use crate::api::endpoints::parse_id;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthContext};
use crate::billing::{self, ClaimDecision};
use crate::models::Appointment;

pub async fn decide(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path((appointment_id, decision)): Path<(String, String)>,
) -> Result<Json<Appointment>, ApiError> {
    let insurer = auth.insurer()?;
    let appointment_id = parse_id(&appointment_id, "appointment")?;
    let decision: ClaimDecision = decision.parse()?;
    let conn = ctx.core.open_db()?;
    Ok(Json(billing::process_claim(&conn, insurer, &appointment_id, decision)?))
}
