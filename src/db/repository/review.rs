use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::profile::{doctor_from_row, DOCTOR_COLUMNS};
use super::{format_datetime, get_datetime, get_uuid};
use crate::db::DatabaseError;
use crate::models::*;

fn review_from_row(row: &Row<'_>) -> rusqlite::Result<DoctorReview> {
    Ok(DoctorReview {
        id: get_uuid(row, 0)?,
        patient_id: get_uuid(row, 1)?,
        doctor_id: get_uuid(row, 2)?,
        cost_rating: row.get(3)?,
        hospitality_rating: row.get(4)?,
        med_rec_rating: row.get(5)?,
        overall_rating: row.get(6)?,
        comment: row.get(7)?,
        created_at: get_datetime(row, 8)?,
    })
}

pub fn insert_review(conn: &Connection, r: &DoctorReview) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO doctor_reviews (id, patient_id, doctor_id, cost_rating, hospitality_rating,
             med_rec_rating, overall_rating, comment, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            r.id.to_string(),
            r.patient_id.to_string(),
            r.doctor_id.to_string(),
            r.cost_rating,
            r.hospitality_rating,
            r.med_rec_rating,
            r.overall_rating,
            r.comment,
            format_datetime(&r.created_at),
        ],
    )?;
    Ok(())
}

pub fn review_exists(conn: &Connection, patient_id: &Uuid, doctor_id: &Uuid) -> Result<bool, DatabaseError> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM doctor_reviews WHERE patient_id = ?1 AND doctor_id = ?2)",
        params![patient_id.to_string(), doctor_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub fn list_reviews_for_doctor(conn: &Connection, doctor_id: &Uuid) -> Result<Vec<DoctorReview>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, doctor_id, cost_rating, hospitality_rating, med_rec_rating,
             overall_rating, comment, created_at
         FROM doctor_reviews WHERE doctor_id = ?1 ORDER BY created_at DESC",
    )?;
    let rows = stmt.query_map(params![doctor_id.to_string()], review_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn rating_summary(conn: &Connection, doctor_id: &Uuid) -> Result<RatingSummary, DatabaseError> {
    let summary = conn.query_row(
        "SELECT COUNT(*), AVG(overall_rating), AVG(cost_rating), AVG(hospitality_rating),
             AVG(med_rec_rating)
         FROM doctor_reviews WHERE doctor_id = ?1",
        params![doctor_id.to_string()],
        |row| {
            Ok(RatingSummary {
                review_count: row.get(0)?,
                avg_overall: row.get(1)?,
                avg_cost: row.get(2)?,
                avg_hospitality: row.get(3)?,
                avg_med_rec: row.get(4)?,
            })
        },
    )?;
    Ok(summary)
}

/// Doctors the patient completed an appointment with but has not reviewed.
pub fn doctors_pending_review(conn: &Connection, patient_id: &Uuid) -> Result<Vec<DoctorProfile>, DatabaseError> {
    let sql = format!(
        "SELECT {DOCTOR_COLUMNS} FROM doctor_profiles
         WHERE id IN (SELECT doctor_id FROM appointments WHERE patient_id = ?1 AND status = 'Completed')
           AND id NOT IN (SELECT doctor_id FROM doctor_reviews WHERE patient_id = ?1)
         ORDER BY full_name ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![patient_id.to_string()], doctor_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}
