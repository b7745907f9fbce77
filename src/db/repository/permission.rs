use rusqlite::{params, Connection};
use uuid::Uuid;

use super::get_uuid;
use crate::db::DatabaseError;

pub fn has_permission(
    conn: &Connection,
    patient_id: &Uuid,
    doctor_id: &Uuid,
) -> Result<bool, DatabaseError> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM patient_doctor_permissions
             WHERE patient_id = ?1 AND doctor_id = ?2)",
        params![patient_id.to_string(), doctor_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub fn permitted_doctor_ids(conn: &Connection, patient_id: &Uuid) -> Result<Vec<Uuid>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT doctor_id FROM patient_doctor_permissions WHERE patient_id = ?1 ORDER BY doctor_id",
    )?;
    let rows = stmt.query_map(params![patient_id.to_string()], |row| get_uuid(row, 0))?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Clear the patient's grants and re-add `doctor_ids`, in one transaction.
pub fn replace_permissions(
    conn: &Connection,
    patient_id: &Uuid,
    doctor_ids: &[Uuid],
) -> Result<(), DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "DELETE FROM patient_doctor_permissions WHERE patient_id = ?1",
        params![patient_id.to_string()],
    )?;
    {
        let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO patient_doctor_permissions (patient_id, doctor_id) VALUES (?1, ?2)",
        )?;
        for doctor_id in doctor_ids {
            stmt.execute(params![patient_id.to_string(), doctor_id.to_string()])?;
        }
    }
    tx.commit()?;
    Ok(())
}
