//! Scheduling engine: slot enumeration and conflict-safe booking.
//!
//! A doctor publishes a same-day window `[start, end)` and a slot size.
//! Slots are the instants `start + n * slot` before `end`. A slot is free
//! when it is in the future and no non-cancelled appointment holds it.
//!
//! Booking checks the slot first, then inserts. Two patients racing for
//! the same instant both pass the check; the partial unique index on
//! `(doctor_id, appointment_time)` lets exactly one insert through and
//! the other is reported as `SlotTaken`.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::repository;
use crate::error::{PortalError, PortalResult};
use crate::models::*;

/// Smallest slot a doctor may publish.
pub const MIN_SLOT_MINUTES: u32 = 10;

/// A doctor's published daily window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub slot_minutes: u32,
}

impl Availability {
    pub fn new(start: NaiveTime, end: NaiveTime, slot_minutes: u32) -> PortalResult<Self> {
        if start >= end {
            return Err(PortalError::validation(
                "availability end must be later the same day than start",
            ));
        }
        if slot_minutes < MIN_SLOT_MINUTES {
            return Err(PortalError::validation(format!(
                "slot_duration_minutes must be at least {MIN_SLOT_MINUTES}"
            )));
        }
        if i64::from(slot_minutes) > (end - start).num_minutes() {
            return Err(PortalError::validation(
                "slot_duration_minutes must fit inside the availability window",
            ));
        }
        Ok(Self {
            start,
            end,
            slot_minutes,
        })
    }

    /// The doctor's window, if one is fully published.
    pub fn of(doctor: &DoctorProfile) -> Option<Self> {
        let start = doctor.availability_start_time?;
        let end = doctor.availability_end_time?;
        (start < end && doctor.slot_duration_minutes > 0).then_some(Self {
            start,
            end,
            slot_minutes: doctor.slot_duration_minutes,
        })
    }

    fn step(&self) -> Duration {
        Duration::minutes(i64::from(self.slot_minutes))
    }

    /// Whether `instant` is exactly one of the grid instants of its day.
    pub fn contains_slot(&self, instant: NaiveDateTime) -> bool {
        let time = instant.time();
        if time < self.start || time >= self.end || time.nanosecond() != 0 {
            return false;
        }
        let offset = (time - self.start).num_seconds();
        offset % self.step().num_seconds() == 0
    }
}

/// All grid instants of `date`, ascending, end-exclusive.
pub fn slot_grid(availability: &Availability, date: NaiveDate) -> Vec<NaiveDateTime> {
    let end = date.and_time(availability.end);
    let step = availability.step();
    let mut slots = Vec::new();
    let mut cursor = date.and_time(availability.start);
    while cursor < end {
        slots.push(cursor);
        cursor += step;
    }
    slots
}

/// Free slots for `doctor` on `date`, ascending.
///
/// Empty when the doctor has no published availability. Instants at or
/// before `now` and instants held by a non-cancelled appointment are
/// left out.
pub fn available_slots(
    conn: &Connection,
    doctor: &DoctorProfile,
    date: NaiveDate,
    now: NaiveDateTime,
) -> PortalResult<Vec<NaiveDateTime>> {
    let Some(availability) = Availability::of(doctor) else {
        return Ok(Vec::new());
    };
    let booked = repository::booked_times(conn, &doctor.id, date)?;
    Ok(slot_grid(&availability, date)
        .into_iter()
        .filter(|slot| *slot > now && !booked.contains(slot))
        .collect())
}

/// Publish a new availability window for `doctor`.
pub fn set_availability(
    conn: &Connection,
    doctor: &DoctorProfile,
    availability: Availability,
) -> PortalResult<DoctorProfile> {
    let updated = DoctorProfile {
        availability_start_time: Some(availability.start),
        availability_end_time: Some(availability.end),
        slot_duration_minutes: availability.slot_minutes,
        ..doctor.clone()
    };
    repository::update_doctor_profile(conn, &updated)?;
    tracing::info!(
        doctor_id = %doctor.id,
        start = %availability.start,
        end = %availability.end,
        slot_minutes = availability.slot_minutes,
        "Availability updated"
    );
    Ok(updated)
}

/// Book `instant` with a doctor for `patient`, as a Pending appointment.
pub fn book_appointment(
    conn: &Connection,
    patient: &PatientProfile,
    doctor_id: &Uuid,
    instant: NaiveDateTime,
    now: NaiveDateTime,
) -> PortalResult<Appointment> {
    let doctor = repository::get_doctor_profile(conn, doctor_id)?
        .ok_or_else(|| PortalError::not_found("Doctor", doctor_id))?;
    let availability = Availability::of(&doctor)
        .ok_or_else(|| PortalError::validation("doctor has not published availability"))?;
    if instant <= now {
        return Err(PortalError::validation("appointment time must be in the future"));
    }
    if !availability.contains_slot(instant) {
        return Err(PortalError::validation(
            "appointment time is not one of the doctor's slots",
        ));
    }

    if repository::slot_taken(conn, &doctor.id, &instant)? {
        return Err(PortalError::SlotTaken(instant));
    }

    let appointment = Appointment::pending(patient.id, doctor.id, instant);
    match repository::insert_appointment(conn, &appointment) {
        Ok(()) => {}
        Err(e) if e.is_unique_violation() => {
            tracing::info!(doctor_id = %doctor.id, %instant, "Booking lost slot race");
            return Err(PortalError::SlotTaken(instant));
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(
        appointment_id = %appointment.id,
        patient_id = %patient.id,
        doctor_id = %doctor.id,
        %instant,
        "Appointment booked"
    );
    Ok(appointment)
}

// ─── Input parsing ────────────────────────────────────────────────────────────

pub fn parse_date(raw: &str) -> PortalResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| PortalError::validation(format!("malformed date '{raw}', expected YYYY-MM-DD")))
}

/// Accepts `HH:MM` or `HH:MM:SS`.
pub fn parse_time_of_day(raw: &str) -> PortalResult<NaiveTime> {
    let raw_trimmed = raw.trim();
    NaiveTime::parse_from_str(raw_trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw_trimmed, "%H:%M:%S"))
        .map_err(|_| PortalError::validation(format!("malformed time '{raw}', expected HH:MM")))
}

/// Accepts `YYYY-MM-DD HH:MM[:SS]` with a space or `T` separator.
pub fn parse_instant(raw: &str) -> PortalResult<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%d %H:%M:%S",
    ];
    let trimmed = raw.trim();
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| {
            PortalError::validation(format!("malformed date/time '{raw}', expected YYYY-MM-DDTHH:MM"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn full_day_has_sixteen_half_hour_slots() {
        let conn = test_db();
        let doctor = doctor(&conn, "d@example.com");

        let slots = available_slots(&conn, &doctor, future_day(), now()).unwrap();
        assert_eq!(slots.len(), 16);
        assert_eq!(slots.first(), Some(&at(9, 0)));
        assert_eq!(slots.last(), Some(&at(16, 30)));
        assert!(slots.iter().all(|s| s.minute() == 0 || s.minute() == 30));
        assert!(slots.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn slots_respect_window_grid_and_now() {
        let availability = Availability::new(time(9, 0), time(12, 0), 45).unwrap();
        let grid = slot_grid(&availability, future_day());
        // 09:00, 09:45, 10:30, 11:15
        assert_eq!(grid.len(), 4);
        for t in &grid {
            assert!(t.time() >= availability.start && t.time() < availability.end);
            assert!(availability.contains_slot(*t));
        }
        assert!(!availability.contains_slot(at(9, 30)));
        assert!(!availability.contains_slot(at(12, 0)));
    }

    #[test]
    fn past_and_current_slots_are_excluded() {
        let conn = test_db();
        let doctor = doctor(&conn, "d@example.com");
        let slots = available_slots(&conn, &doctor, future_day(), at(10, 0)).unwrap();
        assert_eq!(slots.first(), Some(&at(10, 30)));
        assert_eq!(slots.len(), 13);
    }

    #[test]
    fn no_availability_means_no_slots() {
        let conn = test_db();
        let mut doctor = doctor(&conn, "d@example.com");
        doctor.availability_end_time = None;
        assert!(available_slots(&conn, &doctor, future_day(), now()).unwrap().is_empty());
    }

    #[test]
    fn booked_slot_disappears_and_force_booking_conflicts() {
        let conn = test_db();
        let doctor = doctor(&conn, "d@example.com");
        let first = patient(&conn, "p1@example.com");
        let second = patient(&conn, "p2@example.com");

        let appt = book_appointment(&conn, &first, &doctor.id, at(10, 0), now()).unwrap();
        assert_eq!(appt.status, AppointmentStatus::Pending);
        assert_eq!(appt.bill_status, BillStatus::Unbilled);

        let slots = available_slots(&conn, &doctor, future_day(), now()).unwrap();
        assert_eq!(slots.len(), 15);
        assert!(!slots.contains(&at(10, 0)));

        let err = book_appointment(&conn, &second, &doctor.id, at(10, 0), now()).unwrap_err();
        assert!(matches!(err, PortalError::SlotTaken(t) if t == at(10, 0)));
    }

    #[test]
    fn slot_listing_is_idempotent() {
        let conn = test_db();
        let doctor = doctor(&conn, "d@example.com");
        let a = available_slots(&conn, &doctor, future_day(), now()).unwrap();
        let b = available_slots(&conn, &doctor, future_day(), now()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn cancelled_slot_becomes_free_again() {
        let conn = test_db();
        let doctor = doctor(&conn, "d@example.com");
        let patient = patient(&conn, "p@example.com");
        appointment_with_status(&conn, &patient, &doctor, at(11, 0), AppointmentStatus::Cancelled);

        let slots = available_slots(&conn, &doctor, future_day(), now()).unwrap();
        assert!(slots.contains(&at(11, 0)));
        book_appointment(&conn, &patient, &doctor.id, at(11, 0), now()).unwrap();
    }

    #[test]
    fn booking_validates_instant() {
        let conn = test_db();
        let doctor = doctor(&conn, "d@example.com");
        let patient = patient(&conn, "p@example.com");

        // Off-grid, outside the window, and in the past.
        for instant in [at(10, 10), at(17, 0), at(8, 30), now() - Duration::days(1)] {
            let err = book_appointment(&conn, &patient, &doctor.id, instant, now()).unwrap_err();
            assert!(matches!(err, PortalError::Validation(_)), "{instant}");
        }

        let err = book_appointment(&conn, &patient, &Uuid::new_v4(), at(10, 0), now()).unwrap_err();
        assert!(matches!(err, PortalError::NotFound { .. }));
    }

    #[test]
    fn concurrent_bookings_for_one_slot_have_one_winner() {
        use std::sync::Barrier;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("race.db");
        let conn = crate::db::open_database(&path).unwrap();
        let doctor = doctor(&conn, "d@example.com");
        let patients = [patient(&conn, "p1@example.com"), patient(&conn, "p2@example.com")];

        let barrier = Barrier::new(patients.len());
        let results: Vec<PortalResult<Appointment>> = std::thread::scope(|scope| {
            let handles: Vec<_> = patients
                .iter()
                .map(|p| {
                    let barrier = &barrier;
                    let path = &path;
                    let doctor_id = doctor.id;
                    scope.spawn(move || {
                        let conn = crate::db::open_connection(path).unwrap();
                        barrier.wait();
                        book_appointment(&conn, p, &doctor_id, at(10, 0), now())
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let winners = results.iter().filter(|r| r.is_ok()).count();
        let losers = results
            .iter()
            .filter(|r| matches!(r, Err(PortalError::SlotTaken(_))))
            .count();
        assert_eq!((winners, losers), (1, 1));
        assert!(repository::slot_taken(&conn, &doctor.id, &at(10, 0)).unwrap());
    }

    #[test]
    fn availability_validation() {
        assert!(Availability::new(time(9, 0), time(17, 0), 30).is_ok());
        assert!(Availability::new(time(17, 0), time(9, 0), 30).is_err());
        assert!(Availability::new(time(9, 0), time(9, 0), 30).is_err());
        assert!(Availability::new(time(9, 0), time(17, 0), 5).is_err());
        assert!(Availability::new(time(9, 0), time(9, 20), 30).is_err());
        assert!(Availability::new(time(9, 0), time(9, 10), 10).is_ok());
    }

    #[test]
    fn set_availability_changes_the_grid() {
        let conn = test_db();
        let doctor = doctor(&conn, "d@example.com");
        let updated = set_availability(
            &conn,
            &doctor,
            Availability::new(time(14, 0), time(16, 0), 20).unwrap(),
        )
        .unwrap();
        let stored = repository::get_doctor_profile(&conn, &doctor.id).unwrap().unwrap();
        assert_eq!(stored, updated);
        assert_eq!(available_slots(&conn, &stored, future_day(), now()).unwrap().len(), 6);
    }

    #[test]
    fn parsing_helpers() {
        assert_eq!(parse_instant("2030-03-04T10:00").unwrap(), at(10, 0));
        assert_eq!(parse_instant("2030-03-04 10:00:00").unwrap(), at(10, 0));
        assert!(matches!(parse_instant("tomorrow"), Err(PortalError::Validation(_))));
        assert_eq!(parse_date("2030-03-04").unwrap(), future_day());
        assert!(parse_date("04/03/2030").is_err());
        assert_eq!(parse_time_of_day("09:30").unwrap(), time(9, 30));
        assert!(parse_time_of_day("25:00").is_err());
    }
}
