//! Appointment endpoints.
//!
//! Patient:
//! - `POST /api/appointments`: book a free slot
//! - `POST /api/appointments/:id/pay`: pay an unpaid bill directly
//! - `POST /api/appointments/:id/claim`: send an unpaid bill to insurance
//!
//! Doctor:
//! - `POST /api/appointments/:id/{confirm,cancel,complete}`
//! - `PUT /api/appointments/:id/bill`
//! - `POST /api/appointments/:id/mark-paid`

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Local;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::endpoints::parse_id;
use crate::api::error::ApiError;
use crate::api::extract::ApiJson;
use crate::api::types::{ApiContext, AuthContext};
use crate::billing;
use crate::lifecycle::{self, AppointmentAction};
use crate::models::Appointment;
use crate::scheduling;

#[derive(Deserialize)]
pub struct BookRequest {
    pub doctor_id: Uuid,
    /// `YYYY-MM-DDTHH:MM[:SS]`, local time.
    pub appointment_time: String,
}

/// `POST /api/appointments`
pub async fn book(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(request): ApiJson<BookRequest>,
) -> Result<(StatusCode, Json<Appointment>), ApiError> {
    let patient = auth.patient()?;
    let instant = scheduling::parse_instant(&request.appointment_time)?;
    let conn = ctx.core.open_db()?;
    let appointment = scheduling::book_appointment(
        &conn,
        patient,
        &request.doctor_id,
        instant,
        Local::now().naive_local(),
    )?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

async fn transition(
    ctx: ApiContext,
    auth: AuthContext,
    appointment_id: String,
    action: AppointmentAction,
) -> Result<Json<Appointment>, ApiError> {
    let doctor = auth.doctor()?;
    let appointment_id = parse_id(&appointment_id, "appointment")?;
    let conn = ctx.core.open_db()?;
    Ok(Json(lifecycle::apply_action(&conn, doctor, &appointment_id, action)?))
}

/// `POST /api/appointments/:id/confirm`
pub async fn confirm(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Appointment>, ApiError> {
    transition(ctx, auth, appointment_id, AppointmentAction::Confirm).await
}

/// `POST /api/appointments/:id/cancel`
pub async fn cancel(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Appointment>, ApiError> {
    transition(ctx, auth, appointment_id, AppointmentAction::Cancel).await
}

/// `POST /api/appointments/:id/complete`
pub async fn complete(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Appointment>, ApiError> {
    transition(ctx, auth, appointment_id, AppointmentAction::Complete).await
}

#[derive(Deserialize)]
pub struct BillRequest {
    pub amount: f64,
    #[serde(default)]
    pub description: Option<String>,
}

/// `PUT /api/appointments/:id/bill`
pub async fn bill(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(appointment_id): Path<String>,
    ApiJson(request): ApiJson<BillRequest>,
) -> Result<Json<Appointment>, ApiError> {
    let doctor = auth.doctor()?;
    let appointment_id = parse_id(&appointment_id, "appointment")?;
    let conn = ctx.core.open_db()?;
    Ok(Json(billing::set_bill(
        &conn,
        doctor,
        &appointment_id,
        request.amount,
        request.description,
    )?))
}

/// `POST /api/appointments/:id/mark-paid`
pub async fn mark_paid(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Appointment>, ApiError> {
    let doctor = auth.doctor()?;
    let appointment_id = parse_id(&appointment_id, "appointment")?;
    let conn = ctx.core.open_db()?;
    Ok(Json(billing::mark_paid(&conn, doctor, &appointment_id)?))
}

/// `POST /api/appointments/:id/pay`
pub async fn pay(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Appointment>, ApiError> {
    let patient = auth.patient()?;
    let appointment_id = parse_id(&appointment_id, "appointment")?;
    let conn = ctx.core.open_db()?;
    Ok(Json(billing::pay_direct(&conn, patient, &appointment_id)?))
}

#[derive(Deserialize)]
pub struct ClaimRequest {
    pub policy_id: String,
}

/// `POST /api/appointments/:id/claim`
pub async fn claim(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(appointment_id): Path<String>,
    ApiJson(request): ApiJson<ClaimRequest>,
) -> Result<Json<Appointment>, ApiError> {
    let patient = auth.patient()?;
    let appointment_id = parse_id(&appointment_id, "appointment")?;
    let conn = ctx.core.open_db()?;
    Ok(Json(billing::submit_claim(
        &conn,
        patient,
        &appointment_id,
        &request.policy_id,
    )?))
}
