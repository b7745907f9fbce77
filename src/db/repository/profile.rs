use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{format_time, get_opt_time, get_opt_uuid, get_uuid};
use crate::db::DatabaseError;
use crate::models::*;

const PATIENT_COLUMNS: &str = "id, user_id, full_name, phone, address, pincode, latitude, longitude,
     insurance_policy_id, insurance_company_id";

pub(crate) const DOCTOR_COLUMNS: &str = "id, user_id, full_name, specialty, phone, address, pincode,
     latitude, longitude, availability_start_time, availability_end_time, slot_duration_minutes";

const INSURANCE_COLUMNS: &str = "id, user_id, company_name, phone, address, pincode";

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<PatientProfile> {
    Ok(PatientProfile {
        id: get_uuid(row, 0)?,
        user_id: get_uuid(row, 1)?,
        full_name: row.get(2)?,
        phone: row.get(3)?,
        address: row.get(4)?,
        pincode: row.get(5)?,
        latitude: row.get(6)?,
        longitude: row.get(7)?,
        insurance_policy_id: row.get(8)?,
        insurance_company_id: get_opt_uuid(row, 9)?,
    })
}

/// Maps the first twelve columns (in `DOCTOR_COLUMNS` order) to a profile.
pub(crate) fn doctor_from_row(row: &Row<'_>) -> rusqlite::Result<DoctorProfile> {
    Ok(DoctorProfile {
        id: get_uuid(row, 0)?,
        user_id: get_uuid(row, 1)?,
        full_name: row.get(2)?,
        specialty: row.get(3)?,
        phone: row.get(4)?,
        address: row.get(5)?,
        pincode: row.get(6)?,
        latitude: row.get(7)?,
        longitude: row.get(8)?,
        availability_start_time: get_opt_time(row, 9)?,
        availability_end_time: get_opt_time(row, 10)?,
        slot_duration_minutes: row.get(11)?,
    })
}

fn insurance_from_row(row: &Row<'_>) -> rusqlite::Result<InsuranceProfile> {
    Ok(InsuranceProfile {
        id: get_uuid(row, 0)?,
        user_id: get_uuid(row, 1)?,
        company_name: row.get(2)?,
        phone: row.get(3)?,
        address: row.get(4)?,
        pincode: row.get(5)?,
    })
}

// ─── Patients ─────────────────────────────────────────────────────────────────

pub fn insert_patient_profile(conn: &Connection, p: &PatientProfile) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patient_profiles (id, user_id, full_name, phone, address, pincode, latitude,
             longitude, insurance_policy_id, insurance_company_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            p.id.to_string(),
            p.user_id.to_string(),
            p.full_name,
            p.phone,
            p.address,
            p.pincode,
            p.latitude,
            p.longitude,
            p.insurance_policy_id,
            p.insurance_company_id.map(|id| id.to_string()),
        ],
    )?;
    Ok(())
}

pub fn get_patient_profile(conn: &Connection, id: &Uuid) -> Result<Option<PatientProfile>, DatabaseError> {
    let sql = format!("SELECT {PATIENT_COLUMNS} FROM patient_profiles WHERE id = ?1");
    conn.query_row(&sql, params![id.to_string()], patient_from_row)
        .optional()
        .map_err(DatabaseError::from)
}

pub fn get_patient_profile_by_user(
    conn: &Connection,
    user_id: &Uuid,
) -> Result<Option<PatientProfile>, DatabaseError> {
    let sql = format!("SELECT {PATIENT_COLUMNS} FROM patient_profiles WHERE user_id = ?1");
    conn.query_row(&sql, params![user_id.to_string()], patient_from_row)
        .optional()
        .map_err(DatabaseError::from)
}

pub fn update_patient_profile(conn: &Connection, p: &PatientProfile) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE patient_profiles SET full_name = ?2, phone = ?3, address = ?4, pincode = ?5,
             latitude = ?6, longitude = ?7, insurance_policy_id = ?8, insurance_company_id = ?9
         WHERE id = ?1",
        params![
            p.id.to_string(),
            p.full_name,
            p.phone,
            p.address,
            p.pincode,
            p.latitude,
            p.longitude,
            p.insurance_policy_id,
            p.insurance_company_id.map(|id| id.to_string()),
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "PatientProfile".into(),
            id: p.id.to_string(),
        });
    }
    Ok(())
}

// ─── Doctors ──────────────────────────────────────────────────────────────────

pub fn insert_doctor_profile(conn: &Connection, d: &DoctorProfile) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO doctor_profiles (id, user_id, full_name, specialty, phone, address, pincode,
             latitude, longitude, availability_start_time, availability_end_time,
             slot_duration_minutes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            d.id.to_string(),
            d.user_id.to_string(),
            d.full_name,
            d.specialty,
            d.phone,
            d.address,
            d.pincode,
            d.latitude,
            d.longitude,
            d.availability_start_time.as_ref().map(format_time),
            d.availability_end_time.as_ref().map(format_time),
            d.slot_duration_minutes,
        ],
    )?;
    Ok(())
}

pub fn get_doctor_profile(conn: &Connection, id: &Uuid) -> Result<Option<DoctorProfile>, DatabaseError> {
    let sql = format!("SELECT {DOCTOR_COLUMNS} FROM doctor_profiles WHERE id = ?1");
    conn.query_row(&sql, params![id.to_string()], doctor_from_row)
        .optional()
        .map_err(DatabaseError::from)
}

pub fn get_doctor_profile_by_user(
    conn: &Connection,
    user_id: &Uuid,
) -> Result<Option<DoctorProfile>, DatabaseError> {
    let sql = format!("SELECT {DOCTOR_COLUMNS} FROM doctor_profiles WHERE user_id = ?1");
    conn.query_row(&sql, params![user_id.to_string()], doctor_from_row)
        .optional()
        .map_err(DatabaseError::from)
}

/// Full-row update, availability included.
pub fn update_doctor_profile(conn: &Connection, d: &DoctorProfile) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE doctor_profiles SET full_name = ?2, specialty = ?3, phone = ?4, address = ?5,
             pincode = ?6, latitude = ?7, longitude = ?8, availability_start_time = ?9,
             availability_end_time = ?10, slot_duration_minutes = ?11
         WHERE id = ?1",
        params![
            d.id.to_string(),
            d.full_name,
            d.specialty,
            d.phone,
            d.address,
            d.pincode,
            d.latitude,
            d.longitude,
            d.availability_start_time.as_ref().map(format_time),
            d.availability_end_time.as_ref().map(format_time),
            d.slot_duration_minutes,
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "DoctorProfile".into(),
            id: d.id.to_string(),
        });
    }
    Ok(())
}

/// Distinct doctors the patient has had any appointment with, by name.
pub fn doctors_seen_by_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<DoctorProfile>, DatabaseError> {
    let sql = format!(
        "SELECT {DOCTOR_COLUMNS} FROM doctor_profiles
         WHERE id IN (SELECT doctor_id FROM appointments WHERE patient_id = ?1)
         ORDER BY full_name ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![patient_id.to_string()], doctor_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

// ─── Insurance companies ──────────────────────────────────────────────────────

pub fn insert_insurance_profile(conn: &Connection, i: &InsuranceProfile) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO insurance_profiles (id, user_id, company_name, phone, address, pincode)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            i.id.to_string(),
            i.user_id.to_string(),
            i.company_name,
            i.phone,
            i.address,
            i.pincode,
        ],
    )?;
    Ok(())
}

pub fn get_insurance_profile(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<InsuranceProfile>, DatabaseError> {
    let sql = format!("SELECT {INSURANCE_COLUMNS} FROM insurance_profiles WHERE id = ?1");
    conn.query_row(&sql, params![id.to_string()], insurance_from_row)
        .optional()
        .map_err(DatabaseError::from)
}

pub fn get_insurance_profile_by_user(
    conn: &Connection,
    user_id: &Uuid,
) -> Result<Option<InsuranceProfile>, DatabaseError> {
    let sql = format!("SELECT {INSURANCE_COLUMNS} FROM insurance_profiles WHERE user_id = ?1");
    conn.query_row(&sql, params![user_id.to_string()], insurance_from_row)
        .optional()
        .map_err(DatabaseError::from)
}

pub fn update_insurance_profile(conn: &Connection, i: &InsuranceProfile) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE insurance_profiles SET company_name = ?2, phone = ?3, address = ?4, pincode = ?5
         WHERE id = ?1",
        params![i.id.to_string(), i.company_name, i.phone, i.address, i.pincode],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "InsuranceProfile".into(),
            id: i.id.to_string(),
        });
    }
    Ok(())
}

pub fn list_insurance_profiles(conn: &Connection) -> Result<Vec<InsuranceProfile>, DatabaseError> {
    let sql = format!("SELECT {INSURANCE_COLUMNS} FROM insurance_profiles ORDER BY company_name ASC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], insurance_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}
