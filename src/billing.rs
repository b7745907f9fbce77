//! Billing and insurance claims.
//!
//! Bill states, gated by the appointment being Completed:
//!
//! ```text
//! Unbilled ──bill──▶ Unpaid ──pay / mark paid──▶ Paid
//!                     │  ▲
//!               claim │  │ reject
//!                     ▼  │
//!              Pending Insurance ──accept──▶ Paid
//! ```
//!
//! Every transition is a conditional UPDATE on the expected current
//! state, so of two concurrent actions on one bill only the first wins;
//! the second gets a `Conflict`.

use std::str::FromStr;

use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::db::repository;
use crate::error::{PortalError, PortalResult};
use crate::lifecycle::{doctor_appointment, patient_appointment};
use crate::models::*;

/// Longest bill description accepted.
pub const MAX_BILL_DESCRIPTION: usize = 500;

/// Positive, finite, rounded to cents.
pub fn normalize_amount(amount: f64) -> PortalResult<f64> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(PortalError::validation("bill amount must be a positive number"));
    }
    let cents = (amount * 100.0).round() / 100.0;
    if !cents.is_finite() {
        return Err(PortalError::validation("bill amount is too large"));
    }
    if cents <= 0.0 {
        return Err(PortalError::validation("bill amount must be at least 0.01"));
    }
    Ok(cents)
}

fn fetch_appointment(conn: &Connection, id: &Uuid) -> PortalResult<Appointment> {
    repository::get_appointment(conn, id)?.ok_or_else(|| PortalError::not_found("Appointment", id))
}

/// Attach a bill to one of the doctor's Completed appointments.
/// An Unpaid bill may be replaced; settled or claimed bills may not.
pub fn set_bill(
    conn: &Connection,
    doctor: &DoctorProfile,
    appointment_id: &Uuid,
    amount: f64,
    description: Option<String>,
) -> PortalResult<Appointment> {
    let appointment = doctor_appointment(conn, doctor, appointment_id)?;
    let amount = normalize_amount(amount)?;
    let description = crate::identity::non_blank(description);
    if description
        .as_deref()
        .is_some_and(|d| d.chars().count() > MAX_BILL_DESCRIPTION)
    {
        return Err(PortalError::validation(format!(
            "bill description must be at most {MAX_BILL_DESCRIPTION} characters"
        )));
    }

    if appointment.status != AppointmentStatus::Completed {
        return Err(PortalError::conflict(
            "only completed appointments can be billed",
        ));
    }
    if !matches!(appointment.bill_status, BillStatus::Unbilled | BillStatus::Unpaid) {
        return Err(PortalError::conflict(format!(
            "bill is already {}",
            appointment.bill_status
        )));
    }

    if !repository::set_bill(conn, appointment_id, amount, description.as_deref())? {
        return Err(PortalError::conflict("bill changed concurrently, reload and retry"));
    }
    tracing::info!(
        appointment_id = %appointment_id,
        doctor_id = %doctor.id,
        amount,
        "Bill set"
    );
    fetch_appointment(conn, appointment_id)
}

fn settle_unpaid(conn: &Connection, appointment: &Appointment) -> PortalResult<()> {
    if appointment.bill_status != BillStatus::Unpaid {
        return Err(PortalError::conflict(format!(
            "bill is {}, only unpaid bills can be paid",
            appointment.bill_status
        )));
    }
    if !repository::update_bill_status(conn, &appointment.id, BillStatus::Unpaid, BillStatus::Paid)? {
        return Err(PortalError::conflict("bill changed concurrently, reload and retry"));
    }
    Ok(())
}

/// Doctor records payment received at the desk.
pub fn mark_paid(
    conn: &Connection,
    doctor: &DoctorProfile,
    appointment_id: &Uuid,
) -> PortalResult<Appointment> {
    let appointment = doctor_appointment(conn, doctor, appointment_id)?;
    settle_unpaid(conn, &appointment)?;
    tracing::info!(appointment_id = %appointment_id, doctor_id = %doctor.id, "Bill marked paid");
    fetch_appointment(conn, appointment_id)
}

/// Patient pays an unpaid bill directly (simulated, no gateway). A bill
/// whose claim was rejected is back to Unpaid and can be paid this way.
pub fn pay_direct(
    conn: &Connection,
    patient: &PatientProfile,
    appointment_id: &Uuid,
) -> PortalResult<Appointment> {
    let appointment = patient_appointment(conn, patient, appointment_id)?;
    settle_unpaid(conn, &appointment)?;
    tracing::info!(appointment_id = %appointment_id, patient_id = %patient.id, "Bill paid directly");
    fetch_appointment(conn, appointment_id)
}

/// File an insurance claim for an unpaid bill.
///
/// `policy_id` must equal the policy on the patient's profile exactly.
/// Any failed precondition leaves the appointment untouched.
pub fn submit_claim(
    conn: &Connection,
    patient: &PatientProfile,
    appointment_id: &Uuid,
    policy_id: &str,
) -> PortalResult<Appointment> {
    let appointment = patient_appointment(conn, patient, appointment_id)?;
    let (Some(stored_policy), Some(insurer_id)) = (
        patient.insurance_policy_id.as_deref(),
        patient.insurance_company_id,
    ) else {
        return Err(PortalError::validation(
            "register an insurance policy and company on your profile first",
        ));
    };
    if policy_id != stored_policy {
        tracing::info!(appointment_id = %appointment_id, "Claim rejected: policy id mismatch");
        return Err(PortalError::validation(
            "policy id does not match the policy on your profile",
        ));
    }
    if appointment.bill_status != BillStatus::Unpaid {
        return Err(PortalError::conflict(format!(
            "bill is {}, only unpaid bills can be claimed",
            appointment.bill_status
        )));
    }

    if !repository::record_claim(conn, appointment_id, &insurer_id, policy_id)? {
        return Err(PortalError::conflict("bill changed concurrently, reload and retry"));
    }
    tracing::info!(
        appointment_id = %appointment_id,
        patient_id = %patient.id,
        insurer_id = %insurer_id,
        "Insurance claim submitted"
    );
    fetch_appointment(conn, appointment_id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimDecision {
    Accept,
    Reject,
}

impl FromStr for ClaimDecision {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accept" => Ok(Self::Accept),
            "reject" => Ok(Self::Reject),
            other => Err(PortalError::validation(format!("unknown claim decision '{other}'"))),
        }
    }
}

impl ClaimDecision {
    /// Resulting (claim status, bill status).
    pub fn outcome(self) -> (ClaimStatus, BillStatus) {
        match self {
            Self::Accept => (ClaimStatus::Accepted, BillStatus::Paid),
            Self::Reject => (ClaimStatus::Rejected, BillStatus::Unpaid),
        }
    }
}

/// Settle a pending claim filed against `insurer`. Claims against other
/// companies are reported as missing.
pub fn process_claim(
    conn: &Connection,
    insurer: &InsuranceProfile,
    appointment_id: &Uuid,
    decision: ClaimDecision,
) -> PortalResult<Appointment> {
    let appointment = repository::get_appointment(conn, appointment_id)?
        .filter(|a| a.insurance_id == Some(insurer.id))
        .ok_or_else(|| PortalError::not_found("Claim", appointment_id))?;
    if appointment.insurance_claim_status != ClaimStatus::Pending {
        return Err(PortalError::conflict(format!(
            "claim is already {}",
            appointment.insurance_claim_status
        )));
    }

    let (claim_status, bill_status) = decision.outcome();
    if !repository::resolve_claim(conn, appointment_id, &insurer.id, claim_status, bill_status)? {
        return Err(PortalError::conflict("claim changed concurrently, reload and retry"));
    }
    tracing::info!(
        appointment_id = %appointment_id,
        insurer_id = %insurer.id,
        claim = %claim_status,
        bill = %bill_status,
        "Insurance claim processed"
    );
    fetch_appointment(conn, appointment_id)
}

/// Claims filed against `insurer`: (pending, processed).
pub fn claims_for_insurer(
    conn: &Connection,
    insurer: &InsuranceProfile,
) -> PortalResult<(Vec<Appointment>, Vec<Appointment>)> {
    let claims = repository::list_claims_for_insurer(conn, &insurer.id)?;
    Ok(claims
        .into_iter()
        .partition(|a| a.insurance_claim_status == ClaimStatus::Pending))
}
