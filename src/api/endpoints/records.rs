//! Medical record endpoints (doctor only).
//!
//! - `GET /api/patients/:id/records`: chart as this doctor may see it
//! - `POST /api/patients/:id/records`: append a diagnosis

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use crate::api::endpoints::parse_id;
use crate::api::error::ApiError;
use crate::api::extract::ApiJson;
use crate::api::types::{ApiContext, AuthContext};
use crate::models::MedicalRecord;
use crate::records::{self, NewRecord, PatientChart};

/// `GET /api/patients/:id/records`
pub async fn chart(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(patient_id): Path<String>,
) -> Result<Json<PatientChart>, ApiError> {
    let doctor = auth.doctor()?;
    let patient_id = parse_id(&patient_id, "patient")?;
    let conn = ctx.core.open_db()?;
    Ok(Json(records::doctor_chart(&conn, doctor, &patient_id)?))
}

/// `POST /api/patients/:id/records`
pub async fn add(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(patient_id): Path<String>,
    ApiJson(record): ApiJson<NewRecord>,
) -> Result<(StatusCode, Json<MedicalRecord>), ApiError> {
    let doctor = auth.doctor()?;
    let patient_id = parse_id(&patient_id, "patient")?;
    let conn = ctx.core.open_db()?;
    let created = records::add_medical_record(&conn, doctor, &patient_id, record)?;
    Ok((StatusCode::CREATED, Json(created)))
}
