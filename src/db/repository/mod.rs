//! Repository layer: entity-scoped database operations.
//!
//! Functions take a borrowed `Connection` and return `DatabaseError`.
//! Business rules live in the domain modules; the only rules enforced
//! here are the conditional `WHERE` clauses that make state transitions
//! atomic, and the constraints declared in the schema.

mod appointment;
mod file;
mod permission;
mod profile;
mod record;
mod review;
mod search;
mod user;

use std::str::FromStr;

use chrono::{NaiveDateTime, NaiveTime};
use rusqlite::types::Type;
use rusqlite::Row;
use uuid::Uuid;

use super::DatabaseError;

/// Storage format for instants (local wall-clock, second precision).
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Storage format for times of day.
pub const TIME_FORMAT: &str = "%H:%M:%S";

pub use appointment::*;
pub use file::*;
pub use permission::*;
pub use profile::*;
pub use record::*;
pub use review::*;
pub use search::*;
pub use user::*;

pub(crate) fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

pub(crate) fn format_time(t: &NaiveTime) -> String {
    t.format(TIME_FORMAT).to_string()
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

pub(crate) fn get_uuid(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn get_opt_uuid(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    row.get::<_, Option<String>>(idx)?
        .map(|raw| Uuid::parse_str(&raw).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

pub(crate) fn get_datetime(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, DATETIME_FORMAT).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn get_opt_time(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveTime>> {
    row.get::<_, Option<String>>(idx)?
        .map(|raw| NaiveTime::parse_from_str(&raw, TIME_FORMAT).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

pub(crate) fn get_enum<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = DatabaseError>,
{
    let raw: String = row.get(idx)?;
    T::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::models::*;
    use chrono::NaiveDate;
    use rusqlite::{params, Connection};

    fn test_db() -> Connection {
        open_memory_database().unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2030, 3, 4).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    fn make_user(conn: &Connection, email: &str, role: Role) -> User {
        let user = User {
            id: Uuid::new_v4(),
            email: email.into(),
            credential_hash: "x".into(),
            role,
            created_at: at(8, 0),
        };
        insert_user(conn, &user).unwrap();
        user
    }

    fn make_patient(conn: &Connection, email: &str) -> PatientProfile {
        let user = make_user(conn, email, Role::Patient);
        let patient = PatientProfile {
            id: Uuid::new_v4(),
            user_id: user.id,
            full_name: "Pat".into(),
            phone: None,
            address: None,
            pincode: Some("10001".into()),
            latitude: None,
            longitude: None,
            insurance_policy_id: None,
            insurance_company_id: None,
        };
        insert_patient_profile(conn, &patient).unwrap();
        patient
    }

    fn make_doctor(conn: &Connection, email: &str) -> DoctorProfile {
        let user = make_user(conn, email, Role::Doctor);
        let doctor = DoctorProfile {
            id: Uuid::new_v4(),
            user_id: user.id,
            full_name: "Dr. Who".into(),
            specialty: "Cardiologist".into(),
            phone: None,
            address: None,
            pincode: None,
            latitude: Some(40.7),
            longitude: Some(-74.0),
            availability_start_time: NaiveTime::from_hms_opt(9, 0, 0),
            availability_end_time: NaiveTime::from_hms_opt(17, 0, 0),
            slot_duration_minutes: 30,
        };
        insert_doctor_profile(conn, &doctor).unwrap();
        doctor
    }

    #[test]
    fn user_lookup_by_email() {
        let conn = test_db();
        let user = make_user(&conn, "a@example.com", Role::Patient);
        let found = get_user_by_email(&conn, "a@example.com").unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.role, Role::Patient);
        assert!(get_user_by_email(&conn, "b@example.com").unwrap().is_none());
    }

    #[test]
    fn duplicate_email_is_unique_violation() {
        let conn = test_db();
        make_user(&conn, "a@example.com", Role::Patient);
        let dup = User {
            id: Uuid::new_v4(),
            email: "a@example.com".into(),
            credential_hash: "x".into(),
            role: Role::Doctor,
            created_at: at(8, 0),
        };
        let err = insert_user(&conn, &dup).unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[test]
    fn doctor_profile_round_trips_availability() {
        let conn = test_db();
        let doctor = make_doctor(&conn, "d@example.com");
        let loaded = get_doctor_profile(&conn, &doctor.id).unwrap().unwrap();
        assert_eq!(loaded, doctor);
        let by_user = get_doctor_profile_by_user(&conn, &doctor.user_id).unwrap().unwrap();
        assert_eq!(by_user.id, doctor.id);
    }

    #[test]
    fn active_slot_index_rejects_second_booking() {
        let conn = test_db();
        let patient = make_patient(&conn, "p@example.com");
        let doctor = make_doctor(&conn, "d@example.com");

        insert_appointment(&conn, &Appointment::pending(patient.id, doctor.id, at(10, 0))).unwrap();
        let err = insert_appointment(&conn, &Appointment::pending(patient.id, doctor.id, at(10, 0)))
            .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[test]
    fn cancelled_appointment_releases_the_slot() {
        let conn = test_db();
        let patient = make_patient(&conn, "p@example.com");
        let doctor = make_doctor(&conn, "d@example.com");

        let first = Appointment::pending(patient.id, doctor.id, at(10, 0));
        insert_appointment(&conn, &first).unwrap();
        assert!(slot_taken(&conn, &doctor.id, &at(10, 0)).unwrap());

        let changed = update_appointment_status(
            &conn,
            &first.id,
            AppointmentStatus::Pending,
            AppointmentStatus::Cancelled,
        )
        .unwrap();
        assert!(changed);
        assert!(!slot_taken(&conn, &doctor.id, &at(10, 0)).unwrap());

        insert_appointment(&conn, &Appointment::pending(patient.id, doctor.id, at(10, 0))).unwrap();
    }

    #[test]
    fn conditional_status_update_misses_on_stale_state() {
        let conn = test_db();
        let patient = make_patient(&conn, "p@example.com");
        let doctor = make_doctor(&conn, "d@example.com");
        let appt = Appointment::pending(patient.id, doctor.id, at(11, 0));
        insert_appointment(&conn, &appt).unwrap();

        let changed = update_appointment_status(
            &conn,
            &appt.id,
            AppointmentStatus::Confirmed,
            AppointmentStatus::Completed,
        )
        .unwrap();
        assert!(!changed);
        let loaded = get_appointment(&conn, &appt.id).unwrap().unwrap();
        assert_eq!(loaded.status, AppointmentStatus::Pending);
    }

    #[test]
    fn booked_times_only_covers_requested_day() {
        let conn = test_db();
        let patient = make_patient(&conn, "p@example.com");
        let doctor = make_doctor(&conn, "d@example.com");
        insert_appointment(&conn, &Appointment::pending(patient.id, doctor.id, at(9, 30))).unwrap();
        let next_day = at(9, 30) + chrono::Duration::days(1);
        insert_appointment(&conn, &Appointment::pending(patient.id, doctor.id, next_day)).unwrap();

        let booked = booked_times(&conn, &doctor.id, at(0, 0).date()).unwrap();
        assert_eq!(booked.len(), 1);
        assert!(booked.contains(&at(9, 30)));
    }

    #[test]
    fn permissions_replace_previous_set() {
        let conn = test_db();
        let patient = make_patient(&conn, "p@example.com");
        let d1 = make_doctor(&conn, "d1@example.com");
        let d2 = make_doctor(&conn, "d2@example.com");

        replace_permissions(&conn, &patient.id, &[d1.id]).unwrap();
        assert!(has_permission(&conn, &patient.id, &d1.id).unwrap());

        replace_permissions(&conn, &patient.id, &[d2.id]).unwrap();
        assert!(!has_permission(&conn, &patient.id, &d1.id).unwrap());
        assert_eq!(permitted_doctor_ids(&conn, &patient.id).unwrap(), vec![d2.id]);
    }

    #[test]
    fn rating_summary_averages_reviews() {
        let conn = test_db();
        let p1 = make_patient(&conn, "p1@example.com");
        let p2 = make_patient(&conn, "p2@example.com");
        let doctor = make_doctor(&conn, "d@example.com");

        assert_eq!(rating_summary(&conn, &doctor.id).unwrap().avg_overall, None);

        for (patient, overall) in [(&p1, 8u8), (&p2, 5u8)] {
            insert_review(&conn, &DoctorReview {
                id: Uuid::new_v4(),
                patient_id: patient.id,
                doctor_id: doctor.id,
                cost_rating: 6,
                hospitality_rating: 7,
                med_rec_rating: 9,
                overall_rating: overall,
                comment: None,
                created_at: at(12, 0),
            })
            .unwrap();
        }

        let summary = rating_summary(&conn, &doctor.id).unwrap();
        assert_eq!(summary.review_count, 2);
        assert_eq!(summary.avg_overall, Some(6.5));
        assert_eq!(summary.avg_cost, Some(6.0));
    }

    #[test]
    fn review_check_constraint_guards_range() {
        let conn = test_db();
        let patient = make_patient(&conn, "p@example.com");
        let doctor = make_doctor(&conn, "d@example.com");
        let result = conn.execute(
            "INSERT INTO doctor_reviews (id, patient_id, doctor_id, cost_rating, hospitality_rating,
                 med_rec_rating, overall_rating, created_at)
             VALUES (?1, ?2, ?3, 11, 5, 5, 5, '2030-01-01 00:00:00')",
            params![Uuid::new_v4().to_string(), patient.id.to_string(), doctor.id.to_string()],
        );
        assert!(result.is_err());
    }
}
