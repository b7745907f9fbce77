//! Doctor discovery endpoints.
//!
//! - `GET /api/doctors/search`: filter and sort doctors
//! - `GET /api/doctors/:id/slots?date=YYYY-MM-DD`: free slots
//! - `GET /api/doctors/:id/reviews`: reviews plus averages
//! - `POST /api/doctors/:id/reviews`: review after a completed visit

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::endpoints::parse_id;
use crate::api::error::ApiError;
use crate::api::extract::{ApiJson, ApiQuery};
use crate::api::types::{ApiContext, AuthContext};
use crate::db::repository;
use crate::models::*;
use crate::reviews::{self, NewReview};
use crate::scheduling;
use crate::search::{self, DoctorSearch, DoctorSearchResult};

/// `GET /api/doctors/search`
pub async fn search(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    ApiQuery(query): ApiQuery<DoctorSearch>,
) -> Result<Json<Vec<DoctorSearchResult>>, ApiError> {
    let patient = auth.patient()?;
    let conn = ctx.core.open_db()?;
    Ok(Json(search::search_doctors(&conn, patient, &query)?))
}

#[derive(Deserialize)]
pub struct SlotsQuery {
    pub date: String,
}

#[derive(Serialize)]
pub struct SlotsResponse {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub slots: Vec<NaiveDateTime>,
}

/// `GET /api/doctors/:id/slots`
pub async fn slots(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(doctor_id): Path<String>,
    ApiQuery(query): ApiQuery<SlotsQuery>,
) -> Result<Json<SlotsResponse>, ApiError> {
    auth.patient()?;
    let doctor_id = parse_id(&doctor_id, "doctor")?;
    let date = scheduling::parse_date(&query.date)?;

    let conn = ctx.core.open_db()?;
    let doctor = repository::get_doctor_profile(&conn, &doctor_id)?
        .ok_or_else(|| ApiError::NotFound(format!("Doctor not found: {doctor_id}")))?;
    let slots = scheduling::available_slots(&conn, &doctor, date, Local::now().naive_local())?;

    Ok(Json(SlotsResponse {
        doctor_id,
        date,
        slots,
    }))
}

#[derive(Serialize)]
pub struct ReviewsResponse {
    pub summary: RatingSummary,
    pub reviews: Vec<DoctorReview>,
}

/// `GET /api/doctors/:id/reviews`
pub async fn reviews(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(doctor_id): Path<String>,
) -> Result<Json<ReviewsResponse>, ApiError> {
    if auth.profile.role() == Role::Insurance {
        return Err(ApiError::Forbidden(
            "Reviews are visible to patients and doctors".into(),
        ));
    }
    let doctor_id = parse_id(&doctor_id, "doctor")?;
    let conn = ctx.core.open_db()?;
    let reviews = reviews::reviews_for_doctor(&conn, &doctor_id)?;
    let summary = reviews::rating_summary(&conn, &doctor_id)?;
    Ok(Json(ReviewsResponse { summary, reviews }))
}

/// `POST /api/doctors/:id/reviews`
pub async fn create_review(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(doctor_id): Path<String>,
    ApiJson(review): ApiJson<NewReview>,
) -> Result<(StatusCode, Json<DoctorReview>), ApiError> {
    let patient = auth.patient()?;
    let doctor_id = parse_id(&doctor_id, "doctor")?;
    let conn = ctx.core.open_db()?;
    let created = reviews::create_review(&conn, patient, &doctor_id, review)?;
    Ok((StatusCode::CREATED, Json(created)))
}
