//! Per-role landing views.

use rusqlite::Connection;
use serde::Serialize;

use crate::billing;
use crate::error::PortalResult;
use crate::lifecycle;
use crate::models::*;
use crate::records::{self, DoctorAccess};
use crate::reviews;

#[derive(Debug, Clone, Serialize)]
pub struct PatientDashboard {
    pub profile: PatientProfile,
    pub timeline: Vec<TimelineItem>,
    pub pending_reviews: Vec<DoctorProfile>,
    /// Newest first, with bill and claim state.
    pub appointments: Vec<Appointment>,
    pub doctors: Vec<DoctorAccess>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DoctorDashboard {
    pub pending: Vec<Appointment>,
    pub confirmed: Vec<Appointment>,
    pub completed: Vec<Appointment>,
    pub cancelled: Vec<Appointment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InsuranceDashboard {
    pub profile: InsuranceProfile,
    pub pending_claims: Vec<Appointment>,
    pub processed_claims: Vec<Appointment>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Dashboard {
    Patient(PatientDashboard),
    Doctor {
        profile: DoctorProfile,
        #[serde(flatten)]
        appointments: DoctorDashboard,
    },
    Insurance(InsuranceDashboard),
}

impl DoctorDashboard {
    /// Split chronological appointments by status.
    pub fn from_appointments(appointments: Vec<Appointment>) -> Self {
        let mut dashboard = Self::default();
        for appt in appointments {
            let bucket = match appt.status {
                AppointmentStatus::Pending => &mut dashboard.pending,
                AppointmentStatus::Confirmed => &mut dashboard.confirmed,
                AppointmentStatus::Completed => &mut dashboard.completed,
                AppointmentStatus::Cancelled => &mut dashboard.cancelled,
            };
            bucket.push(appt);
        }
        dashboard
    }
}

pub fn build_dashboard(conn: &Connection, profile: &Profile) -> PortalResult<Dashboard> {
    let dashboard = match profile {
        Profile::Patient(patient) => Dashboard::Patient(PatientDashboard {
            profile: patient.clone(),
            timeline: records::patient_timeline(conn, patient)?,
            pending_reviews: reviews::pending_reviews(conn, patient)?,
            appointments: lifecycle::list_for_patient(conn, patient)?,
            doctors: records::doctors_with_access(conn, patient)?,
        }),
        Profile::Doctor(doctor) => Dashboard::Doctor {
            profile: doctor.clone(),
            appointments: DoctorDashboard::from_appointments(lifecycle::list_for_doctor(conn, doctor)?),
        },
        Profile::Insurance(insurer) => {
            let (pending_claims, processed_claims) = billing::claims_for_insurer(conn, insurer)?;
            Dashboard::Insurance(InsuranceDashboard {
                profile: insurer.clone(),
                pending_claims,
                processed_claims,
            })
        }
    };
    Ok(dashboard)
}
