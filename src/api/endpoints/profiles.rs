//! Profile endpoints.
//!
//! - `PUT /api/patient/profile`
//! - `PUT /api/patient/permissions`: doctors allowed the full history
//! - `PUT /api/doctor/profile`
//! - `PUT /api/doctor/availability`
//! - `PUT /api/insurance/profile`
//! - `GET /api/insurers`

use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::extract::ApiJson;
use crate::api::types::{ApiContext, AuthContext};
use crate::models::*;
use crate::profiles::{self, DoctorProfileUpdate, InsuranceProfileUpdate, PatientProfileUpdate};
use crate::records;
use crate::scheduling::{self, Availability};

/// `PUT /api/patient/profile`
pub async fn update_patient(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(update): ApiJson<PatientProfileUpdate>,
) -> Result<Json<PatientProfile>, ApiError> {
    let patient = auth.patient()?;
    let conn = ctx.core.open_db()?;
    Ok(Json(profiles::update_patient_profile(&conn, patient, update)?))
}

/// `PUT /api/doctor/profile`
pub async fn update_doctor(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(update): ApiJson<DoctorProfileUpdate>,
) -> Result<Json<DoctorProfile>, ApiError> {
    let doctor = auth.doctor()?;
    let conn = ctx.core.open_db()?;
    Ok(Json(profiles::update_doctor_profile(&conn, doctor, update)?))
}

/// `PUT /api/insurance/profile`
pub async fn update_insurance(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(update): ApiJson<InsuranceProfileUpdate>,
) -> Result<Json<InsuranceProfile>, ApiError> {
    let insurer = auth.insurer()?;
    let conn = ctx.core.open_db()?;
    Ok(Json(profiles::update_insurance_profile(&conn, insurer, update)?))
}

#[derive(Deserialize)]
pub struct AvailabilityRequest {
    /// `HH:MM`
    pub start: String,
    /// `HH:MM`
    pub end: String,
    pub slot_duration_minutes: u32,
}

/// `PUT /api/doctor/availability`
pub async fn set_availability(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(request): ApiJson<AvailabilityRequest>,
) -> Result<Json<DoctorProfile>, ApiError> {
    let doctor = auth.doctor()?;
    let availability = Availability::new(
        scheduling::parse_time_of_day(&request.start)?,
        scheduling::parse_time_of_day(&request.end)?,
        request.slot_duration_minutes,
    )?;
    let conn = ctx.core.open_db()?;
    Ok(Json(scheduling::set_availability(&conn, doctor, availability)?))
}

/// `GET /api/insurers`
pub async fn insurers(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<InsuranceProfile>>, ApiError> {
    auth.patient()?;
    let conn = ctx.core.open_db()?;
    Ok(Json(profiles::list_insurers(&conn)?))
}

#[derive(Deserialize, Serialize)]
pub struct PermissionsBody {
    pub doctor_ids: Vec<Uuid>,
}

/// `PUT /api/patient/permissions`: replaces the whole grant set.
pub async fn set_permissions(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(body): ApiJson<PermissionsBody>,
) -> Result<Json<PermissionsBody>, ApiError> {
    let patient = auth.patient()?;
    let conn = ctx.core.open_db()?;
    let doctor_ids = records::set_permitted_doctors(&conn, patient, &body.doctor_ids)?;
    Ok(Json(PermissionsBody { doctor_ids }))
}
