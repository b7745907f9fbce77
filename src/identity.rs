//! Registration and credential checks.

use std::sync::LazyLock;

use chrono::Local;
use regex::Regex;
use rusqlite::Connection;
use serde::Deserialize;
use uuid::Uuid;

use crate::crypto;
use crate::db::{self, repository};
use crate::error::{PortalError, PortalResult};
use crate::models::*;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const DEFAULT_SPECIALTY: &str = "General";
pub const DEFAULT_SLOT_MINUTES: u32 = 30;

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub role: Role,
    /// Person name, or company name for insurers.
    pub name: String,
    #[serde(default)]
    pub specialty: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub pincode: Option<String>,
}

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Trim and lowercase. Returns `None` when the shape is not an email.
pub fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim().to_lowercase();
    EMAIL_PATTERN.is_match(&email).then_some(email)
}

/// Empty or whitespace-only strings become `None`.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Create a user and its role profile in one transaction.
pub fn register(
    conn: &Connection,
    registration: Registration,
    iterations: u32,
) -> PortalResult<(User, Profile)> {
    let email = normalize_email(&registration.email)
        .ok_or_else(|| PortalError::validation("email is not a valid address"))?;
    if registration.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(PortalError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    let name = registration.name.trim().to_string();
    if name.is_empty() {
        return Err(PortalError::validation("name is required"));
    }

    if repository::get_user_by_email(conn, &email)?.is_some() {
        return Err(PortalError::conflict("email is already registered"));
    }

    let user = User {
        id: Uuid::new_v4(),
        email,
        credential_hash: crypto::hash_password(&registration.password, iterations),
        role: registration.role,
        created_at: Local::now().naive_local(),
    };
    let phone = non_blank(registration.phone);
    let address = non_blank(registration.address);
    let pincode = non_blank(registration.pincode);

    let profile = match registration.role {
        Role::Patient => Profile::Patient(PatientProfile {
            id: Uuid::new_v4(),
            user_id: user.id,
            full_name: name,
            phone,
            address,
            pincode,
            latitude: None,
            longitude: None,
            insurance_policy_id: None,
            insurance_company_id: None,
        }),
        Role::Doctor => Profile::Doctor(DoctorProfile {
            id: Uuid::new_v4(),
            user_id: user.id,
            full_name: name,
            specialty: non_blank(registration.specialty)
                .unwrap_or_else(|| DEFAULT_SPECIALTY.to_string()),
            phone,
            address,
            pincode,
            latitude: None,
            longitude: None,
            availability_start_time: None,
            availability_end_time: None,
            slot_duration_minutes: DEFAULT_SLOT_MINUTES,
        }),
        Role::Insurance => Profile::Insurance(InsuranceProfile {
            id: Uuid::new_v4(),
            user_id: user.id,
            company_name: name,
            phone,
            address,
            pincode,
        }),
    };

    let tx = conn.unchecked_transaction()?;
    match repository::insert_user(&tx, &user) {
        Ok(()) => {}
        // Lost a race with a concurrent registration of the same email.
        Err(e) if e.is_unique_violation() => {
            return Err(PortalError::conflict("email is already registered"))
        }
        Err(e) => return Err(e.into()),
    }
    insert_profile(&tx, &profile)?;
    tx.commit()?;

    tracing::info!(user_id = %user.id, role = %user.role, "User registered");
    Ok((user, profile))
}

pub(crate) fn insert_profile(conn: &Connection, profile: &Profile) -> Result<(), db::DatabaseError> {
    match profile {
        Profile::Patient(p) => repository::insert_patient_profile(conn, p),
        Profile::Doctor(d) => repository::insert_doctor_profile(conn, d),
        Profile::Insurance(i) => repository::insert_insurance_profile(conn, i),
    }
}

/// Verify an email/password pair.
///
/// Unknown email, wrong password and unreadable hashes all produce the
/// same `InvalidCredentials`. A missing account is still checked against
/// a placeholder hash with `iterations` rounds, so both failures take
/// one key derivation.
pub fn authenticate(
    conn: &Connection,
    email: &str,
    password: &str,
    iterations: u32,
) -> PortalResult<User> {
    let user = match normalize_email(email) {
        Some(email) => repository::get_user_by_email(conn, &email)?,
        None => None,
    };
    let Some(user) = user else {
        tracing::debug!("Login for unknown email");
        let _ = crypto::verify_password(password, &crypto::placeholder_hash(iterations));
        return Err(PortalError::InvalidCredentials);
    };
    match crypto::verify_password(password, &user.credential_hash) {
        Ok(true) => Ok(user),
        Ok(false) => Err(PortalError::InvalidCredentials),
        Err(e) => {
            tracing::warn!(user_id = %user.id, error = %e, "Stored credential hash unreadable");
            Err(PortalError::InvalidCredentials)
        }
    }
}
