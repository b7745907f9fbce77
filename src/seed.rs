//! Demo data for local development.
//!
//! Creates doctors, patients and insurers with random details, a
//! completed and paid visit behind every review, and fixed test
//! accounts that all use the password `password`.

use chrono::{Duration, Local, NaiveTime};
use rand::seq::SliceRandom;
use rand::Rng;
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::crypto;
use crate::db::repository;
use crate::error::{PortalError, PortalResult};
use crate::identity::insert_profile;
use crate::models::*;

pub const DEMO_PASSWORD: &str = "password";
pub const TEST_PATIENT_EMAIL: &str = "patient@test.com";
pub const TEST_DOCTOR_EMAIL: &str = "doctor@test.com";
pub const TEST_INSURER_EMAIL: &str = "insurance@test.com";
pub const TEST_POLICY_ID: &str = "TEST-POLICY-001";

pub const SPECIALTIES: [&str; 9] = [
    "Cardiologist",
    "Dermatologist",
    "Neurologist",
    "Pediatrician",
    "Oncologist",
    "Orthopedist",
    "General",
    "Surgeon",
    "Psychiatrist",
];

const FIRST_NAMES: [&str; 16] = [
    "Aisha", "Ben", "Carla", "Dev", "Elena", "Farid", "Grace", "Hiro", "Ines", "Jonas", "Kemi",
    "Luca", "Maya", "Nikhil", "Olga", "Priya",
];
const LAST_NAMES: [&str; 16] = [
    "Adams", "Bose", "Costa", "Dubois", "Eze", "Fischer", "Garcia", "Hughes", "Iyer", "Jensen",
    "Kowalski", "Lopez", "Mensah", "Novak", "Okafor", "Patel",
];
const COMPANY_WORDS: [&str; 8] = [
    "Acme", "Beacon", "Cedar", "Harbor", "Meridian", "Summit", "Evergreen", "Northstar",
];
const COMPANY_SUFFIXES: [&str; 4] = ["Health", "Mutual", "Assurance", "Care"];
const REVIEW_COMMENTS: [&str; 6] = [
    "Listened carefully and explained everything.",
    "Long wait but good care.",
    "Friendly staff, fair prices.",
    "Quick diagnosis, felt rushed.",
    "Would recommend to family.",
    "Clear follow-up instructions.",
];

/// Centre of the generated coordinates (New York).
const CENTRE: (f64, f64) = (40.7128, -74.0060);

#[derive(Debug, Clone)]
pub struct SeedOptions {
    pub doctors: usize,
    pub patients: usize,
    pub insurers: usize,
    pub min_reviews_per_patient: usize,
    pub max_reviews_per_patient: usize,
    pub pbkdf2_iterations: u32,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            doctors: 50,
            patients: 100,
            insurers: 10,
            min_reviews_per_patient: 5,
            max_reviews_per_patient: 15,
            pbkdf2_iterations: crypto::PBKDF2_ITERATIONS,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SeedSummary {
    pub doctors: usize,
    pub patients: usize,
    pub insurers: usize,
    pub reviews: usize,
}

/// Delete every row, leaving the schema in place.
pub fn clear_data(conn: &Connection) -> PortalResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "DELETE FROM doctor_reviews;
         DELETE FROM medical_files;
         DELETE FROM medical_records;
         DELETE FROM appointments;
         DELETE FROM patient_doctor_permissions;
         DELETE FROM patient_profiles;
         DELETE FROM doctor_profiles;
         DELETE FROM insurance_profiles;
         DELETE FROM users;",
    )?;
    tx.commit()?;
    tracing::info!("Existing data cleared");
    Ok(())
}

struct Seeder<'a, R: Rng> {
    conn: &'a Connection,
    rng: &'a mut R,
    credential_hash: String,
    created_at: chrono::NaiveDateTime,
}

impl<R: Rng> Seeder<'_, R> {
    fn person_name(&mut self) -> (String, String) {
        let first = *FIRST_NAMES.choose(self.rng).unwrap_or(&"Alex");
        let last = *LAST_NAMES.choose(self.rng).unwrap_or(&"Smith");
        (first.to_string(), last.to_string())
    }

    fn phone(&mut self) -> String {
        format!("555-{:04}", self.rng.gen_range(0..10_000))
    }

    fn pincode(&mut self) -> String {
        format!("{:05}", self.rng.gen_range(10_000..11_000))
    }

    fn address(&mut self) -> String {
        let (_, street) = self.person_name();
        format!("{} {} Street", self.rng.gen_range(1..999), street)
    }

    fn coordinates(&mut self) -> (f64, f64) {
        (
            CENTRE.0 + self.rng.gen_range(-0.3..0.3),
            CENTRE.1 + self.rng.gen_range(-0.3..0.3),
        )
    }

    fn user(&self, email: String, role: Role) -> PortalResult<User> {
        let user = User {
            id: Uuid::new_v4(),
            email,
            credential_hash: self.credential_hash.clone(),
            role,
            created_at: self.created_at,
        };
        repository::insert_user(self.conn, &user)?;
        Ok(user)
    }

    fn doctor(&mut self, email: String, full_name: String, specialty: &str) -> PortalResult<DoctorProfile> {
        let user = self.user(email, Role::Doctor)?;
        let (latitude, longitude) = self.coordinates();
        let doctor = DoctorProfile {
            id: Uuid::new_v4(),
            user_id: user.id,
            full_name,
            specialty: specialty.to_string(),
            phone: Some(self.phone()),
            address: Some(self.address()),
            pincode: Some(self.pincode()),
            latitude: Some(latitude),
            longitude: Some(longitude),
            availability_start_time: NaiveTime::from_hms_opt(9, 0, 0),
            availability_end_time: NaiveTime::from_hms_opt(17, 0, 0),
            slot_duration_minutes: 30,
        };
        insert_profile(self.conn, &Profile::Doctor(doctor.clone()))?;
        Ok(doctor)
    }

    fn patient(&mut self, email: String, full_name: String) -> PortalResult<PatientProfile> {
        let user = self.user(email, Role::Patient)?;
        let (latitude, longitude) = self.coordinates();
        let patient = PatientProfile {
            id: Uuid::new_v4(),
            user_id: user.id,
            full_name,
            phone: Some(self.phone()),
            address: Some(self.address()),
            pincode: Some(self.pincode()),
            latitude: Some(latitude),
            longitude: Some(longitude),
            insurance_policy_id: None,
            insurance_company_id: None,
        };
        insert_profile(self.conn, &Profile::Patient(patient.clone()))?;
        Ok(patient)
    }

    fn insurer(&mut self, email: String, company_name: String) -> PortalResult<InsuranceProfile> {
        let user = self.user(email, Role::Insurance)?;
        let insurer = InsuranceProfile {
            id: Uuid::new_v4(),
            user_id: user.id,
            company_name,
            phone: Some(self.phone()),
            address: Some(self.address()),
            pincode: Some(self.pincode()),
        };
        insert_profile(self.conn, &Profile::Insurance(insurer.clone()))?;
        Ok(insurer)
    }

    /// A completed, paid past visit followed by a review of it.
    fn visit_and_review(
        &mut self,
        patient: &PatientProfile,
        doctor: &DoctorProfile,
        days_ago: i64,
        slot: i64,
    ) -> PortalResult<()> {
        let day = self.created_at.date() - Duration::days(days_ago);
        let instant = day.and_time(NaiveTime::MIN) + Duration::minutes(9 * 60 + 30 * slot);

        let mut visit = Appointment::pending(patient.id, doctor.id, instant);
        visit.status = AppointmentStatus::Completed;
        visit.bill_amount = Some(f64::from(self.rng.gen_range(40..400_u32)));
        visit.bill_status = BillStatus::Paid;
        visit.bill_description = Some("Consultation".into());
        repository::insert_appointment(self.conn, &visit)?;

        let [cost, hospitality, med_rec, overall]: [u8; 4] =
            std::array::from_fn(|_| self.rng.gen_range(1..=10));
        let review = DoctorReview {
            id: Uuid::new_v4(),
            patient_id: patient.id,
            doctor_id: doctor.id,
            cost_rating: cost,
            hospitality_rating: hospitality,
            med_rec_rating: med_rec,
            overall_rating: overall,
            comment: REVIEW_COMMENTS.choose(self.rng).map(|c| c.to_string()),
            created_at: instant + Duration::hours(2),
        };
        repository::insert_review(self.conn, &review)?;
        Ok(())
    }
}

/// Fill an empty database with demo data, in one transaction.
pub fn seed_demo_data<R: Rng>(
    conn: &Connection,
    options: &SeedOptions,
    rng: &mut R,
) -> PortalResult<SeedSummary> {
    if repository::count_users(conn)? > 0 {
        return Err(PortalError::conflict(
            "database already has users, pass --reset to replace them",
        ));
    }
    if options.min_reviews_per_patient > options.max_reviews_per_patient {
        return Err(PortalError::validation("min reviews exceeds max reviews"));
    }

    let tx = conn.unchecked_transaction()?;
    let mut seeder = Seeder {
        conn: &tx,
        rng,
        // Shared by every demo account.
        credential_hash: crypto::hash_password(DEMO_PASSWORD, options.pbkdf2_iterations),
        created_at: Local::now().naive_local(),
    };
    let mut summary = SeedSummary::default();

    let mut doctors = Vec::with_capacity(options.doctors);
    for i in 0..options.doctors {
        let (first, last) = seeder.person_name();
        let email = format!("{}.{}.dr{i}@example.com", first, last).to_lowercase();
        let specialty = *SPECIALTIES.choose(seeder.rng).unwrap_or(&"General");
        doctors.push(seeder.doctor(email, format!("Dr. {first} {last}"), specialty)?);
    }
    summary.doctors = doctors.len();

    let mut insurers = Vec::with_capacity(options.insurers);
    for i in 0..options.insurers {
        let word = *COMPANY_WORDS.choose(seeder.rng).unwrap_or(&"Acme");
        let suffix = *COMPANY_SUFFIXES.choose(seeder.rng).unwrap_or(&"Health");
        let email = format!("claims{i}@{}.example.com", word.to_lowercase());
        insurers.push(seeder.insurer(email, format!("{word} {suffix}"))?);
    }
    summary.insurers = insurers.len();

    for i in 0..options.patients {
        let (first, last) = seeder.person_name();
        let email = format!("{}.{}{i}@example.com", first, last).to_lowercase();
        let patient = seeder.patient(email, format!("{first} {last}"))?;

        let wanted = seeder
            .rng
            .gen_range(options.min_reviews_per_patient..=options.max_reviews_per_patient)
            .min(doctors.len());
        let reviewed: Vec<DoctorProfile> = doctors.choose_multiple(seeder.rng, wanted).cloned().collect();
        // Each patient's visits fall on their own day, so slots never collide.
        for (slot, doctor) in reviewed.iter().enumerate() {
            seeder.visit_and_review(&patient, doctor, i as i64 + 1, slot as i64)?;
            summary.reviews += 1;
        }
        summary.patients += 1;
    }

    let mut test_patient = seeder.patient(TEST_PATIENT_EMAIL.into(), "Test Patient".into())?;
    seeder.doctor(TEST_DOCTOR_EMAIL.into(), "Dr. Test".into(), "Cardiologist")?;
    let test_insurer = seeder.insurer(TEST_INSURER_EMAIL.into(), "Test Insurance Co".into())?;
    test_patient.insurance_policy_id = Some(TEST_POLICY_ID.into());
    test_patient.insurance_company_id = Some(test_insurer.id);
    repository::update_patient_profile(&tx, &test_patient)?;
    summary.patients += 1;
    summary.doctors += 1;
    summary.insurers += 1;

    tx.commit()?;
    tracing::info!(
        doctors = summary.doctors,
        patients = summary.patients,
        insurers = summary.insurers,
        reviews = summary.reviews,
        "Demo data seeded"
    );
    Ok(summary)
}
