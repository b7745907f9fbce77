use chrono::Local;
use rusqlite::Connection;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::repository;
use crate::error::{PortalError, PortalResult};
use crate::identity::non_blank;
use crate::models::*;

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 10;
pub const MAX_COMMENT_LEN: usize = 2000;

/// Review as submitted. Ratings arrive as plain integers and are checked
/// before anything is written.
#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub cost_rating: i64,
    pub hospitality_rating: i64,
    pub med_rec_rating: i64,
    pub overall_rating: i64,
    #[serde(default)]
    pub comment: Option<String>,
}

fn checked_rating(field: &str, value: i64) -> PortalResult<u8> {
    if !(MIN_RATING..=MAX_RATING).contains(&value) {
        return Err(PortalError::validation(format!(
            "{field} must be between {MIN_RATING} and {MAX_RATING}, got {value}"
        )));
    }
    u8::try_from(value).map_err(|_| PortalError::validation(format!("{field} is out of range")))
}

pub fn create_review(
    conn: &Connection,
    patient: &PatientProfile,
    doctor_id: &Uuid,
    review: NewReview,
) -> PortalResult<DoctorReview> {
    let cost_rating = checked_rating("cost_rating", review.cost_rating)?;
    let hospitality_rating = checked_rating("hospitality_rating", review.hospitality_rating)?;
    let med_rec_rating = checked_rating("med_rec_rating", review.med_rec_rating)?;
    let overall_rating = checked_rating("overall_rating", review.overall_rating)?;
    let comment = non_blank(review.comment);
    if comment
        .as_deref()
        .is_some_and(|c| c.chars().count() > MAX_COMMENT_LEN)
    {
        return Err(PortalError::validation(format!(
            "comment must be at most {MAX_COMMENT_LEN} characters"
        )));
    }

    if repository::get_doctor_profile(conn, doctor_id)?.is_none() {
        return Err(PortalError::not_found("Doctor", doctor_id));
    }
    if !repository::has_completed_appointment(conn, &patient.id, doctor_id)? {
        return Err(PortalError::Forbidden(
            "you can review a doctor only after a completed appointment".into(),
        ));
    }
    if repository::review_exists(conn, &patient.id, doctor_id)? {
        return Err(PortalError::conflict("you have already reviewed this doctor"));
    }

    let created = DoctorReview {
        id: Uuid::new_v4(),
        patient_id: patient.id,
        doctor_id: *doctor_id,
        cost_rating,
        hospitality_rating,
        med_rec_rating,
        overall_rating,
        comment,
        created_at: Local::now().naive_local(),
    };
    match repository::insert_review(conn, &created) {
        Ok(()) => {}
        Err(e) if e.is_unique_violation() => {
            return Err(PortalError::conflict("you have already reviewed this doctor"))
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(
        review_id = %created.id,
        patient_id = %patient.id,
        doctor_id = %doctor_id,
        overall = overall_rating,
        "Review created"
    );
    Ok(created)
}

/// Doctors with a completed visit the patient has not reviewed yet.
pub fn pending_reviews(conn: &Connection, patient: &PatientProfile) -> PortalResult<Vec<DoctorProfile>> {
    Ok(repository::doctors_pending_review(conn, &patient.id)?)
}

pub fn reviews_for_doctor(conn: &Connection, doctor_id: &Uuid) -> PortalResult<Vec<DoctorReview>> {
    if repository::get_doctor_profile(conn, doctor_id)?.is_none() {
        return Err(PortalError::not_found("Doctor", doctor_id));
    }
    Ok(repository::list_reviews_for_doctor(conn, doctor_id)?)
}

pub fn rating_summary(conn: &Connection, doctor_id: &Uuid) -> PortalResult<RatingSummary> {
    Ok(repository::rating_summary(conn, doctor_id)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    fn ratings(overall: i64) -> NewReview {
        NewReview {
            cost_rating: 7,
            hospitality_rating: 8,
            med_rec_rating: 9,
            overall_rating: overall,
            comment: Some("Thorough and kind".into()),
        }
    }

    #[test]
    fn review_requires_completed_appointment() {
        let conn = test_db();
        let doctor = doctor(&conn, "d@example.com");
        let patient = patient(&conn, "p@example.com");
        appointment_with_status(&conn, &patient, &doctor, at(10, 0), AppointmentStatus::Confirmed);

        let err = create_review(&conn, &patient, &doctor.id, ratings(9)).unwrap_err();
        assert!(matches!(err, PortalError::Forbidden(_)));
        assert_eq!(rating_summary(&conn, &doctor.id).unwrap().review_count, 0);
    }

    #[test]
    fn one_review_per_patient_and_doctor() {
        let conn = test_db();
        let doctor = doctor(&conn, "d@example.com");
        let patient = patient(&conn, "p@example.com");
        appointment_with_status(&conn, &patient, &doctor, at(10, 0), AppointmentStatus::Completed);

        assert_eq!(pending_reviews(&conn, &patient).unwrap().len(), 1);
        create_review(&conn, &patient, &doctor.id, ratings(9)).unwrap();
        assert!(pending_reviews(&conn, &patient).unwrap().is_empty());

        let err = create_review(&conn, &patient, &doctor.id, ratings(3)).unwrap_err();
        assert!(matches!(err, PortalError::Conflict(_)));
        assert_eq!(reviews_for_doctor(&conn, &doctor.id).unwrap().len(), 1);
    }

    #[test]
    fn out_of_range_rating_names_the_field() {
        let conn = test_db();
        let doctor = doctor(&conn, "d@example.com");
        let patient = patient(&conn, "p@example.com");
        appointment_with_status(&conn, &patient, &doctor, at(10, 0), AppointmentStatus::Completed);

        let mut review = ratings(9);
        review.hospitality_rating = 11;
        match create_review(&conn, &patient, &doctor.id, review) {
            Err(PortalError::Validation(msg)) => assert!(msg.contains("hospitality_rating"), "{msg}"),
            other => panic!("expected validation error, got {other:?}"),
        }
        match create_review(&conn, &patient, &doctor.id, ratings(0)) {
            Err(PortalError::Validation(msg)) => assert!(msg.contains("overall_rating"), "{msg}"),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(reviews_for_doctor(&conn, &doctor.id).unwrap().is_empty());
    }

    #[test]
    fn summary_reflects_reviews() {
        let conn = test_db();
        let doctor = doctor(&conn, "d@example.com");
        for (i, overall) in [10, 6].into_iter().enumerate() {
            let patient = patient(&conn, &format!("p{i}@example.com"));
            appointment_with_status(&conn, &patient, &doctor, at(9 + i as u32, 0), AppointmentStatus::Completed);
            create_review(&conn, &patient, &doctor.id, ratings(overall)).unwrap();
        }
        let summary = rating_summary(&conn, &doctor.id).unwrap();
        assert_eq!(summary.review_count, 2);
        assert_eq!(summary.avg_overall, Some(8.0));
        assert_eq!(summary.avg_med_rec, Some(9.0));
    }

    #[test]
    fn unknown_doctor_is_not_found() {
        let conn = test_db();
        let patient = patient(&conn, "p@example.com");
        assert!(matches!(
            create_review(&conn, &patient, &Uuid::new_v4(), ratings(5)),
            Err(PortalError::NotFound { .. })
        ));
    }
}
