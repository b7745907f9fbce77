//! Fixtures shared by the unit tests.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::Connection;

use crate::db::repository;
use crate::db::sqlite::open_memory_database;
use crate::identity::{self, Registration};
use crate::models::*;

pub const TEST_ITERATIONS: u32 = 1_000;
pub const TEST_PASSWORD: &str = "password123";

pub fn test_db() -> Connection {
    open_memory_database().unwrap()
}

/// Fixed "now" for scheduling tests: 2030-03-01 12:00.
pub fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2030, 3, 1).unwrap().and_hms_opt(12, 0, 0).unwrap()
}

/// A day after `now()`.
pub fn future_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 3, 4).unwrap()
}

pub fn at(h: u32, m: u32) -> NaiveDateTime {
    future_day().and_hms_opt(h, m, 0).unwrap()
}

pub fn registration(email: &str, role: Role, name: &str) -> Registration {
    Registration {
        email: email.into(),
        password: TEST_PASSWORD.into(),
        role,
        name: name.into(),
        specialty: None,
        phone: None,
        address: None,
        pincode: None,
    }
}

pub fn patient(conn: &Connection, email: &str) -> PatientProfile {
    let (_, profile) =
        identity::register(conn, registration(email, Role::Patient, "Pat Patient"), TEST_ITERATIONS)
            .unwrap();
    profile.as_patient().cloned().unwrap()
}

/// Patient holding policy `POL-123` with `insurer`.
pub fn insured_patient(conn: &Connection, email: &str, insurer: &InsuranceProfile) -> PatientProfile {
    let mut p = patient(conn, email);
    p.insurance_policy_id = Some("POL-123".into());
    p.insurance_company_id = Some(insurer.id);
    repository::update_patient_profile(conn, &p).unwrap();
    p
}

/// Doctor available 09:00-17:00 with 30 minute slots.
pub fn doctor(conn: &Connection, email: &str) -> DoctorProfile {
    let (_, profile) =
        identity::register(conn, registration(email, Role::Doctor, "Dr. Test"), TEST_ITERATIONS).unwrap();
    let mut d = profile.as_doctor().cloned().unwrap();
    d.availability_start_time = NaiveTime::from_hms_opt(9, 0, 0);
    d.availability_end_time = NaiveTime::from_hms_opt(17, 0, 0);
    d.slot_duration_minutes = 30;
    repository::update_doctor_profile(conn, &d).unwrap();
    d
}

pub fn insurer(conn: &Connection, email: &str) -> InsuranceProfile {
    let (_, profile) =
        identity::register(conn, registration(email, Role::Insurance, "Acme Mutual"), TEST_ITERATIONS)
            .unwrap();
    profile.as_insurance().cloned().unwrap()
}

/// Insert an appointment directly in the given status.
pub fn appointment_with_status(
    conn: &Connection,
    patient: &PatientProfile,
    doctor: &DoctorProfile,
    instant: NaiveDateTime,
    status: AppointmentStatus,
) -> Appointment {
    let mut appt = Appointment::pending(patient.id, doctor.id, instant);
    appt.status = status;
    repository::insert_appointment(conn, &appt).unwrap();
    appt
}

pub fn reload(conn: &Connection, appt: &Appointment) -> Appointment {
    repository::get_appointment(conn, &appt.id).unwrap().unwrap()
}
