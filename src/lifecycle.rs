//! Doctor-driven appointment status transitions.
//!
//! ```text
//! Pending ──confirm──▶ Confirmed ──complete──▶ Completed
//!    │                     │
//!    └──cancel──▶ Cancelled ◀──cancel──┘
//! ```

use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::db::repository;
use crate::error::{PortalError, PortalResult};
use crate::models::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentAction {
    Confirm,
    Cancel,
    Complete,
}

impl AppointmentAction {
    /// Target status when applied to `from`, or `None` if not allowed.
    pub fn target(self, from: AppointmentStatus) -> Option<AppointmentStatus> {
        use crate::models::AppointmentStatus::*;
        match (self, from) {
            (Self::Confirm, Pending) => Some(Confirmed),
            (Self::Cancel, Pending | Confirmed) => Some(Cancelled),
            (Self::Complete, Confirmed) => Some(Completed),
            _ => None,
        }
    }
}

/// Load an appointment owned by `doctor`. Others' appointments are
/// reported as missing.
pub(crate) fn doctor_appointment(
    conn: &Connection,
    doctor: &DoctorProfile,
    appointment_id: &Uuid,
) -> PortalResult<Appointment> {
    repository::get_appointment(conn, appointment_id)?
        .filter(|a| a.doctor_id == doctor.id)
        .ok_or_else(|| PortalError::not_found("Appointment", appointment_id))
}

pub(crate) fn patient_appointment(
    conn: &Connection,
    patient: &PatientProfile,
    appointment_id: &Uuid,
) -> PortalResult<Appointment> {
    repository::get_appointment(conn, appointment_id)?
        .filter(|a| a.patient_id == patient.id)
        .ok_or_else(|| PortalError::not_found("Appointment", appointment_id))
}

pub fn apply_action(
    conn: &Connection,
    doctor: &DoctorProfile,
    appointment_id: &Uuid,
    action: AppointmentAction,
) -> PortalResult<Appointment> {
    let appointment = doctor_appointment(conn, doctor, appointment_id)?;
    let from = appointment.status;
    let to = action.target(from).ok_or_else(|| {
        PortalError::conflict(format!("cannot {action:?} an appointment that is {from}").to_lowercase())
    })?;

    if !repository::update_appointment_status(conn, appointment_id, from, to)? {
        return Err(PortalError::conflict(
            "appointment changed concurrently, reload and retry",
        ));
    }

    tracing::info!(
        appointment_id = %appointment_id,
        doctor_id = %doctor.id,
        from = %from,
        to = %to,
        "Appointment status changed"
    );
    Ok(Appointment {
        status: to,
        ..appointment
    })
}

pub fn list_for_doctor(conn: &Connection, doctor: &DoctorProfile) -> PortalResult<Vec<Appointment>> {
    Ok(repository::list_appointments_for_doctor(conn, &doctor.id)?)
}

pub fn list_for_patient(conn: &Connection, patient: &PatientProfile) -> PortalResult<Vec<Appointment>> {
    Ok(repository::list_appointments_for_patient(conn, &patient.id)?)
}
