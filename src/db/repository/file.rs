use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{format_datetime, get_datetime, get_uuid};
use crate::db::DatabaseError;
use crate::models::*;

const FILE_COLUMNS: &str = "id, patient_id, doctor_id, stored_filename, original_filename,
     content_type, size_bytes, description, uploaded_at";

fn file_from_row(row: &Row<'_>) -> rusqlite::Result<MedicalFile> {
    Ok(MedicalFile {
        id: get_uuid(row, 0)?,
        patient_id: get_uuid(row, 1)?,
        doctor_id: get_uuid(row, 2)?,
        stored_filename: row.get(3)?,
        original_filename: row.get(4)?,
        content_type: row.get(5)?,
        size_bytes: row.get(6)?,
        description: row.get(7)?,
        uploaded_at: get_datetime(row, 8)?,
    })
}

pub fn insert_medical_file(conn: &Connection, f: &MedicalFile) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO medical_files (id, patient_id, doctor_id, stored_filename, original_filename,
             content_type, size_bytes, description, uploaded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            f.id.to_string(),
            f.patient_id.to_string(),
            f.doctor_id.to_string(),
            f.stored_filename,
            f.original_filename,
            f.content_type,
            f.size_bytes,
            f.description,
            format_datetime(&f.uploaded_at),
        ],
    )?;
    Ok(())
}

pub fn get_medical_file(conn: &Connection, id: &Uuid) -> Result<Option<MedicalFile>, DatabaseError> {
    let sql = format!("SELECT {FILE_COLUMNS} FROM medical_files WHERE id = ?1");
    conn.query_row(&sql, params![id.to_string()], file_from_row)
        .optional()
        .map_err(DatabaseError::from)
}

/// Files for a patient, newest first, optionally limited to one author.
pub fn list_medical_files(
    conn: &Connection,
    patient_id: &Uuid,
    authored_by: Option<&Uuid>,
) -> Result<Vec<MedicalFile>, DatabaseError> {
    let sql = format!(
        "SELECT {FILE_COLUMNS} FROM medical_files
         WHERE patient_id = ?1 AND (?2 IS NULL OR doctor_id = ?2)
         ORDER BY uploaded_at DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![patient_id.to_string(), authored_by.map(|id| id.to_string())],
        file_from_row,
    )?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}
