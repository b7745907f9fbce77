use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::{format_datetime, get_datetime, get_uuid};
use crate::db::DatabaseError;
use crate::models::*;

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<MedicalRecord> {
    Ok(MedicalRecord {
        id: get_uuid(row, 0)?,
        patient_id: get_uuid(row, 1)?,
        doctor_id: get_uuid(row, 2)?,
        diagnosis: row.get(3)?,
        notes: row.get(4)?,
        prescription: row.get(5)?,
        created_at: get_datetime(row, 6)?,
    })
}

pub fn insert_medical_record(conn: &Connection, r: &MedicalRecord) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO medical_records (id, patient_id, doctor_id, diagnosis, notes, prescription, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            r.id.to_string(),
            r.patient_id.to_string(),
            r.doctor_id.to_string(),
            r.diagnosis,
            r.notes,
            r.prescription,
            format_datetime(&r.created_at),
        ],
    )?;
    Ok(())
}

/// Records for a patient, newest first. With `authored_by`, only that
/// doctor's records are returned.
pub fn list_medical_records(
    conn: &Connection,
    patient_id: &Uuid,
    authored_by: Option<&Uuid>,
) -> Result<Vec<MedicalRecord>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, doctor_id, diagnosis, notes, prescription, created_at
         FROM medical_records
         WHERE patient_id = ?1 AND (?2 IS NULL OR doctor_id = ?2)
         ORDER BY created_at DESC",
    )?;
    let rows = stmt.query_map(
        params![patient_id.to_string(), authored_by.map(|id| id.to_string())],
        record_from_row,
    )?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}
