use std::collections::HashSet;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{format_datetime, get_datetime, get_enum, get_opt_uuid, get_uuid};
use crate::db::DatabaseError;
use crate::models::*;

const APPOINTMENT_COLUMNS: &str = "id, patient_id, doctor_id, appointment_time, status,
     bill_amount, bill_status, bill_description, insurance_id, insurance_claim_status,
     claim_policy_id, created_at";

fn appointment_from_row(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: get_uuid(row, 0)?,
        patient_id: get_uuid(row, 1)?,
        doctor_id: get_uuid(row, 2)?,
        appointment_time: get_datetime(row, 3)?,
        status: get_enum(row, 4)?,
        bill_amount: row.get(5)?,
        bill_status: get_enum(row, 6)?,
        bill_description: row.get(7)?,
        insurance_id: get_opt_uuid(row, 8)?,
        insurance_claim_status: get_enum(row, 9)?,
        claim_policy_id: row.get(10)?,
        created_at: get_datetime(row, 11)?,
    })
}

fn query_appointments(
    conn: &Connection,
    where_clause: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<Appointment>, DatabaseError> {
    let sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments {where_clause}");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params, appointment_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Plain insert. A second active booking for the same doctor and instant
/// fails with a UNIQUE violation from `idx_appointments_active_slot`.
pub fn insert_appointment(conn: &Connection, a: &Appointment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO appointments (id, patient_id, doctor_id, appointment_time, status,
             bill_amount, bill_status, bill_description, insurance_id, insurance_claim_status,
             claim_policy_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            a.id.to_string(),
            a.patient_id.to_string(),
            a.doctor_id.to_string(),
            format_datetime(&a.appointment_time),
            a.status.as_str(),
            a.bill_amount,
            a.bill_status.as_str(),
            a.bill_description,
            a.insurance_id.map(|id| id.to_string()),
            a.insurance_claim_status.as_str(),
            a.claim_policy_id,
            format_datetime(&a.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_appointment(conn: &Connection, id: &Uuid) -> Result<Option<Appointment>, DatabaseError> {
    let sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1");
    conn.query_row(&sql, params![id.to_string()], appointment_from_row)
        .optional()
        .map_err(DatabaseError::from)
}

/// Whether a non-cancelled appointment holds this doctor/instant.
pub fn slot_taken(
    conn: &Connection,
    doctor_id: &Uuid,
    instant: &NaiveDateTime,
) -> Result<bool, DatabaseError> {
    let taken = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM appointments
             WHERE doctor_id = ?1 AND appointment_time = ?2 AND status != 'Cancelled')",
        params![doctor_id.to_string(), format_datetime(instant)],
        |row| row.get(0),
    )?;
    Ok(taken)
}

/// Instants on `date` held by non-cancelled appointments of this doctor.
pub fn booked_times(
    conn: &Connection,
    doctor_id: &Uuid,
    date: NaiveDate,
) -> Result<HashSet<NaiveDateTime>, DatabaseError> {
    let day_start = date.and_time(chrono::NaiveTime::MIN);
    let day_end = day_start + Duration::days(1);
    let mut stmt = conn.prepare(
        "SELECT appointment_time FROM appointments
         WHERE doctor_id = ?1 AND status != 'Cancelled'
           AND appointment_time >= ?2 AND appointment_time < ?3",
    )?;
    let rows = stmt.query_map(
        params![
            doctor_id.to_string(),
            format_datetime(&day_start),
            format_datetime(&day_end),
        ],
        |row| get_datetime(row, 0),
    )?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn list_appointments_for_doctor(
    conn: &Connection,
    doctor_id: &Uuid,
) -> Result<Vec<Appointment>, DatabaseError> {
    query_appointments(
        conn,
        "WHERE doctor_id = ?1 ORDER BY appointment_time ASC",
        &[&doctor_id.to_string()],
    )
}

pub fn list_appointments_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Appointment>, DatabaseError> {
    query_appointments(
        conn,
        "WHERE patient_id = ?1 ORDER BY appointment_time DESC",
        &[&patient_id.to_string()],
    )
}

/// Appointments with a claim filed against this insurer, oldest first.
pub fn list_claims_for_insurer(
    conn: &Connection,
    insurer_id: &Uuid,
) -> Result<Vec<Appointment>, DatabaseError> {
    query_appointments(
        conn,
        "WHERE insurance_id = ?1 AND insurance_claim_status != 'None'
         ORDER BY appointment_time ASC",
        &[&insurer_id.to_string()],
    )
}

/// Whether a Completed appointment exists between the pair.
pub fn has_completed_appointment(
    conn: &Connection,
    patient_id: &Uuid,
    doctor_id: &Uuid,
) -> Result<bool, DatabaseError> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM appointments
             WHERE patient_id = ?1 AND doctor_id = ?2 AND status = 'Completed')",
        params![patient_id.to_string(), doctor_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists)
}

// ─── Conditional transitions ──────────────────────────────────────────────────
//
// Each returns `true` when exactly the expected row changed. A `false`
// means the row was not in the expected state any more.

pub fn update_appointment_status(
    conn: &Connection,
    id: &Uuid,
    from: AppointmentStatus,
    to: AppointmentStatus,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments SET status = ?3 WHERE id = ?1 AND status = ?2",
        params![id.to_string(), from.as_str(), to.as_str()],
    )?;
    Ok(changed == 1)
}

/// Attach (or replace) a bill on a Completed appointment whose bill is
/// not yet settled or under a claim.
pub fn set_bill(
    conn: &Connection,
    id: &Uuid,
    amount: f64,
    description: Option<&str>,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments SET bill_amount = ?2, bill_description = ?3, bill_status = 'Unpaid'
         WHERE id = ?1 AND status = 'Completed' AND bill_status IN ('Unbilled', 'Unpaid')",
        params![id.to_string(), amount, description],
    )?;
    Ok(changed == 1)
}

pub fn update_bill_status(
    conn: &Connection,
    id: &Uuid,
    from: BillStatus,
    to: BillStatus,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments SET bill_status = ?3 WHERE id = ?1 AND bill_status = ?2",
        params![id.to_string(), from.as_str(), to.as_str()],
    )?;
    Ok(changed == 1)
}

/// Move an Unpaid bill under a claim against `insurer_id`.
pub fn record_claim(
    conn: &Connection,
    id: &Uuid,
    insurer_id: &Uuid,
    policy_id: &str,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments SET bill_status = 'Pending Insurance', insurance_claim_status = 'Pending',
             insurance_id = ?2, claim_policy_id = ?3
         WHERE id = ?1 AND bill_status = 'Unpaid' AND insurance_claim_status != 'Pending'",
        params![id.to_string(), insurer_id.to_string(), policy_id],
    )?;
    Ok(changed == 1)
}

/// Settle a Pending claim filed against `insurer_id`.
pub fn resolve_claim(
    conn: &Connection,
    id: &Uuid,
    insurer_id: &Uuid,
    claim_status: ClaimStatus,
    bill_status: BillStatus,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments SET insurance_claim_status = ?3, bill_status = ?4
         WHERE id = ?1 AND insurance_id = ?2 AND insurance_claim_status = 'Pending'
           AND bill_status = 'Pending Insurance'",
        params![
            id.to_string(),
            insurer_id.to_string(),
            claim_status.as_str(),
            bill_status.as_str(),
        ],
    )?;
    Ok(changed == 1)
}
