//! Profile resolution and role-specific profile edits.

use rusqlite::Connection;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::repository;
use crate::error::{PortalError, PortalResult};
use crate::identity::non_blank;
use crate::models::*;

/// Resolve the single profile owned by `user`, by role.
pub fn load_profile(conn: &Connection, user: &User) -> PortalResult<Profile> {
    let profile = match user.role {
        Role::Patient => repository::get_patient_profile_by_user(conn, &user.id)?.map(Profile::Patient),
        Role::Doctor => repository::get_doctor_profile_by_user(conn, &user.id)?.map(Profile::Doctor),
        Role::Insurance => {
            repository::get_insurance_profile_by_user(conn, &user.id)?.map(Profile::Insurance)
        }
    };
    profile.ok_or_else(|| PortalError::not_found("Profile", user.id))
}

/// Both coordinates or neither, each within its range.
pub fn validate_coordinates(latitude: Option<f64>, longitude: Option<f64>) -> PortalResult<()> {
    match (latitude, longitude) {
        (None, None) => Ok(()),
        (Some(lat), Some(lon)) => {
            if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
                return Err(PortalError::validation("latitude must be between -90 and 90"));
            }
            if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
                return Err(PortalError::validation("longitude must be between -180 and 180"));
            }
            Ok(())
        }
        _ => Err(PortalError::validation(
            "latitude and longitude must be given together",
        )),
    }
}

fn required_name(raw: &str, field: &str) -> PortalResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(PortalError::validation(format!("{field} is required")));
    }
    Ok(name.to_string())
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatientProfileUpdate {
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub pincode: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub insurance_policy_id: Option<String>,
    #[serde(default)]
    pub insurance_company_id: Option<Uuid>,
}

pub fn update_patient_profile(
    conn: &Connection,
    patient: &PatientProfile,
    update: PatientProfileUpdate,
) -> PortalResult<PatientProfile> {
    validate_coordinates(update.latitude, update.longitude)?;
    if let Some(company_id) = update.insurance_company_id {
        if repository::get_insurance_profile(conn, &company_id)?.is_none() {
            return Err(PortalError::validation("insurance_company_id is not a known insurer"));
        }
    }

    let updated = PatientProfile {
        id: patient.id,
        user_id: patient.user_id,
        full_name: required_name(&update.full_name, "full_name")?,
        phone: non_blank(update.phone),
        address: non_blank(update.address),
        pincode: non_blank(update.pincode),
        latitude: update.latitude,
        longitude: update.longitude,
        insurance_policy_id: non_blank(update.insurance_policy_id),
        insurance_company_id: update.insurance_company_id,
    };
    repository::update_patient_profile(conn, &updated)?;
    tracing::info!(patient_id = %updated.id, "Patient profile updated");
    Ok(updated)
}

/// Doctor details other than availability, which goes through
/// `scheduling::set_availability`.
#[derive(Debug, Clone, Deserialize)]
pub struct DoctorProfileUpdate {
    pub full_name: String,
    pub specialty: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub pincode: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

pub fn update_doctor_profile(
    conn: &Connection,
    doctor: &DoctorProfile,
    update: DoctorProfileUpdate,
) -> PortalResult<DoctorProfile> {
    validate_coordinates(update.latitude, update.longitude)?;
    let updated = DoctorProfile {
        full_name: required_name(&update.full_name, "full_name")?,
        specialty: required_name(&update.specialty, "specialty")?,
        phone: non_blank(update.phone),
        address: non_blank(update.address),
        pincode: non_blank(update.pincode),
        latitude: update.latitude,
        longitude: update.longitude,
        ..doctor.clone()
    };
    repository::update_doctor_profile(conn, &updated)?;
    tracing::info!(doctor_id = %updated.id, "Doctor profile updated");
    Ok(updated)
}

#[derive(Debug, Clone, Deserialize)]
pub struct InsuranceProfileUpdate {
    pub company_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub pincode: Option<String>,
}

pub fn update_insurance_profile(
    conn: &Connection,
    insurer: &InsuranceProfile,
    update: InsuranceProfileUpdate,
) -> PortalResult<InsuranceProfile> {
    let updated = InsuranceProfile {
        id: insurer.id,
        user_id: insurer.user_id,
        company_name: required_name(&update.company_name, "company_name")?,
        phone: non_blank(update.phone),
        address: non_blank(update.address),
        pincode: non_blank(update.pincode),
    };
    repository::update_insurance_profile(conn, &updated)?;
    tracing::info!(insurer_id = %updated.id, "Insurance profile updated");
    Ok(updated)
}

/// Insurance companies a patient can pick from, by name.
pub fn list_insurers(conn: &Connection) -> PortalResult<Vec<InsuranceProfile>> {
    Ok(repository::list_insurance_profiles(conn)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    fn patient_update(name: &str) -> PatientProfileUpdate {
        PatientProfileUpdate {
            full_name: name.into(),
            phone: Some(" 555-0100 ".into()),
            address: None,
            pincode: Some("10001".into()),
            latitude: Some(40.7),
            longitude: Some(-74.0),
            insurance_policy_id: Some("POL-1".into()),
            insurance_company_id: None,
        }
    }

    #[test]
    fn load_profile_dispatches_on_role() {
        let conn = test_db();
        let patient = patient(&conn, "p@example.com");
        let insurer = insurer(&conn, "i@example.com");

        let user = repository::get_user(&conn, &patient.user_id).unwrap().unwrap();
        let profile = load_profile(&conn, &user).unwrap();
        assert_eq!(profile.as_patient().map(|p| p.id), Some(patient.id));

        let user = repository::get_user(&conn, &insurer.user_id).unwrap().unwrap();
        assert_eq!(load_profile(&conn, &user).unwrap().role(), Role::Insurance);
    }

    #[test]
    fn patient_update_persists_and_trims() {
        let conn = test_db();
        let patient = patient(&conn, "p@example.com");
        let insurer = insurer(&conn, "i@example.com");

        let mut update = patient_update("Pat Q. Public");
        update.insurance_company_id = Some(insurer.id);
        let updated = update_patient_profile(&conn, &patient, update).unwrap();
        assert_eq!(updated.phone.as_deref(), Some("555-0100"));

        let stored = repository::get_patient_profile(&conn, &patient.id).unwrap().unwrap();
        assert_eq!(stored, updated);
        assert_eq!(stored.coordinates(), Some((40.7, -74.0)));
    }

    #[test]
    fn patient_update_rejects_unknown_insurer() {
        let conn = test_db();
        let patient = patient(&conn, "p@example.com");
        let mut update = patient_update("Pat");
        update.insurance_company_id = Some(Uuid::new_v4());
        assert!(matches!(
            update_patient_profile(&conn, &patient, update),
            Err(PortalError::Validation(_))
        ));
    }

    #[test]
    fn coordinates_must_be_paired_and_in_range() {
        assert!(validate_coordinates(None, None).is_ok());
        assert!(validate_coordinates(Some(12.9), Some(77.6)).is_ok());
        assert!(validate_coordinates(Some(12.9), None).is_err());
        assert!(validate_coordinates(Some(91.0), Some(0.0)).is_err());
        assert!(validate_coordinates(Some(0.0), Some(-181.0)).is_err());
        assert!(validate_coordinates(Some(f64::NAN), Some(0.0)).is_err());
    }

    #[test]
    fn doctor_update_keeps_availability() {
        let conn = test_db();
        let doctor = doctor(&conn, "d@example.com");
        let updated = update_doctor_profile(
            &conn,
            &doctor,
            DoctorProfileUpdate {
                full_name: "Dr. House".into(),
                specialty: "Neurologist".into(),
                phone: None,
                address: Some("221B".into()),
                pincode: None,
                latitude: None,
                longitude: None,
            },
        )
        .unwrap();
        assert_eq!(updated.specialty, "Neurologist");
        assert_eq!(updated.availability_start_time, doctor.availability_start_time);
        assert_eq!(updated.slot_duration_minutes, doctor.slot_duration_minutes);
    }

    #[test]
    fn insurers_are_listed_by_name() {
        let conn = test_db();
        let zed = insurer(&conn, "z@example.com");
        update_insurance_profile(
            &conn,
            &zed,
            InsuranceProfileUpdate {
                company_name: "Zenith Health".into(),
                phone: None,
                address: None,
                pincode: None,
            },
        )
        .unwrap();
        let acme = insurer(&conn, "a@example.com");

        let names: Vec<_> = list_insurers(&conn)
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(names, vec![acme.id, zed.id]);
    }
}
