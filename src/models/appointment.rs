use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{AppointmentStatus, BillStatus, ClaimStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_time: NaiveDateTime,
    pub status: AppointmentStatus,
    pub bill_amount: Option<f64>,
    pub bill_status: BillStatus,
    pub bill_description: Option<String>,
    pub insurance_id: Option<Uuid>,
    pub insurance_claim_status: ClaimStatus,
    /// Policy id the patient entered when submitting the claim.
    pub claim_policy_id: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Appointment {
    /// A fresh Pending, unbilled appointment.
    pub fn pending(patient_id: Uuid, doctor_id: Uuid, appointment_time: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id,
            doctor_id,
            appointment_time,
            status: AppointmentStatus::Pending,
            bill_amount: None,
            bill_status: BillStatus::Unbilled,
            bill_description: None,
            insurance_id: None,
            insurance_claim_status: ClaimStatus::None,
            claim_policy_id: None,
            created_at: chrono::Local::now().naive_local(),
        }
    }
}
