use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::Role;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub pincode: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub insurance_policy_id: Option<String>,
    pub insurance_company_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub specialty: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub pincode: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub availability_start_time: Option<NaiveTime>,
    pub availability_end_time: Option<NaiveTime>,
    pub slot_duration_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsuranceProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub pincode: Option<String>,
}

/// The single role-shaped profile owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Profile {
    Patient(PatientProfile),
    Doctor(DoctorProfile),
    Insurance(InsuranceProfile),
}

impl Profile {
    pub fn id(&self) -> Uuid {
        match self {
            Profile::Patient(p) => p.id,
            Profile::Doctor(d) => d.id,
            Profile::Insurance(i) => i.id,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Profile::Patient(_) => Role::Patient,
            Profile::Doctor(_) => Role::Doctor,
            Profile::Insurance(_) => Role::Insurance,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Profile::Patient(p) => &p.full_name,
            Profile::Doctor(d) => &d.full_name,
            Profile::Insurance(i) => &i.company_name,
        }
    }

    pub fn as_patient(&self) -> Option<&PatientProfile> {
        match self {
            Profile::Patient(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_doctor(&self) -> Option<&DoctorProfile> {
        match self {
            Profile::Doctor(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_insurance(&self) -> Option<&InsuranceProfile> {
        match self {
            Profile::Insurance(i) => Some(i),
            _ => None,
        }
    }
}

impl PatientProfile {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

impl DoctorProfile {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_serializes_with_role_tag() {
        let profile = Profile::Insurance(InsuranceProfile {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            company_name: "Acme Mutual".into(),
            phone: None,
            address: None,
            pincode: None,
        });
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["role"], "insurance");
        assert_eq!(json["company_name"], "Acme Mutual");
        assert_eq!(profile.role(), Role::Insurance);
        assert!(profile.as_patient().is_none());
    }
}
