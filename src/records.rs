//! Medical records, doctor access grants and the combined timeline.
//!
//! A doctor always sees what they wrote. A patient's whole history is
//! visible to a doctor only while the patient grants it.

use chrono::Local;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::repository;
use crate::error::{PortalError, PortalResult};
use crate::identity::non_blank;
use crate::models::*;

pub const MAX_DIAGNOSIS_LEN: usize = 2000;
pub const MAX_NOTES_LEN: usize = 5000;
pub const MAX_PRESCRIPTION_LEN: usize = 500;

#[derive(Debug, Clone, Deserialize)]
pub struct NewRecord {
    pub diagnosis: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub prescription: Option<String>,
}

fn check_len(field: &str, value: Option<&str>, max: usize) -> PortalResult<()> {
    if value.is_some_and(|v| v.chars().count() > max) {
        return Err(PortalError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

fn existing_patient(conn: &Connection, patient_id: &Uuid) -> PortalResult<PatientProfile> {
    repository::get_patient_profile(conn, patient_id)?
        .ok_or_else(|| PortalError::not_found("Patient", patient_id))
}

/// Append a diagnosis entry for a patient. Records are never edited.
pub fn add_medical_record(
    conn: &Connection,
    doctor: &DoctorProfile,
    patient_id: &Uuid,
    record: NewRecord,
) -> PortalResult<MedicalRecord> {
    let diagnosis = record.diagnosis.trim().to_string();
    if diagnosis.is_empty() {
        return Err(PortalError::validation("diagnosis is required"));
    }
    let notes = non_blank(record.notes);
    let prescription = non_blank(record.prescription);
    check_len("diagnosis", Some(&diagnosis), MAX_DIAGNOSIS_LEN)?;
    check_len("notes", notes.as_deref(), MAX_NOTES_LEN)?;
    check_len("prescription", prescription.as_deref(), MAX_PRESCRIPTION_LEN)?;
    let patient = existing_patient(conn, patient_id)?;

    let created = MedicalRecord {
        id: Uuid::new_v4(),
        patient_id: patient.id,
        doctor_id: doctor.id,
        diagnosis,
        notes,
        prescription,
        created_at: Local::now().naive_local(),
    };
    repository::insert_medical_record(conn, &created)?;
    tracing::info!(
        record_id = %created.id,
        patient_id = %patient.id,
        doctor_id = %doctor.id,
        "Medical record added"
    );
    Ok(created)
}

pub fn doctor_can_view_all(
    conn: &Connection,
    doctor: &DoctorProfile,
    patient_id: &Uuid,
) -> PortalResult<bool> {
    Ok(repository::has_permission(conn, patient_id, &doctor.id)?)
}

fn merge_timeline(records: Vec<MedicalRecord>, files: Vec<MedicalFile>) -> Vec<TimelineItem> {
    let mut items: Vec<TimelineItem> = records
        .into_iter()
        .map(TimelineItem::Record)
        .chain(files.into_iter().map(TimelineItem::File))
        .collect();
    items.sort_by_key(|item| std::cmp::Reverse(item.timestamp()));
    items
}

/// Everything in the patient's history, newest first.
pub fn patient_timeline(conn: &Connection, patient: &PatientProfile) -> PortalResult<Vec<TimelineItem>> {
    let records = repository::list_medical_records(conn, &patient.id, None)?;
    let files = repository::list_medical_files(conn, &patient.id, None)?;
    Ok(merge_timeline(records, files))
}

/// A patient's chart as one doctor may see it.
#[derive(Debug, Clone, Serialize)]
pub struct PatientChart {
    pub patient: PatientProfile,
    /// False when only the doctor's own entries are included.
    pub full_access: bool,
    pub items: Vec<TimelineItem>,
}

pub fn doctor_chart(
    conn: &Connection,
    doctor: &DoctorProfile,
    patient_id: &Uuid,
) -> PortalResult<PatientChart> {
    let patient = existing_patient(conn, patient_id)?;
    let full_access = doctor_can_view_all(conn, doctor, patient_id)?;
    let authored_by = (!full_access).then_some(&doctor.id);
    let records = repository::list_medical_records(conn, patient_id, authored_by)?;
    let files = repository::list_medical_files(conn, patient_id, authored_by)?;
    Ok(PatientChart {
        patient,
        full_access,
        items: merge_timeline(records, files),
    })
}

/// Replace the set of doctors allowed to see the patient's whole
/// history. Only doctors the patient has had an appointment with can
/// be granted. Concurrent edits are last-write-wins.
pub fn set_permitted_doctors(
    conn: &Connection,
    patient: &PatientProfile,
    doctor_ids: &[Uuid],
) -> PortalResult<Vec<Uuid>> {
    let seen: Vec<Uuid> = repository::doctors_seen_by_patient(conn, &patient.id)?
        .into_iter()
        .map(|d| d.id)
        .collect();
    if let Some(unknown) = doctor_ids.iter().find(|id| !seen.contains(id)) {
        return Err(PortalError::validation(format!(
            "doctor {unknown} is not one of your doctors"
        )));
    }

    repository::replace_permissions(conn, &patient.id, doctor_ids)?;
    tracing::info!(
        patient_id = %patient.id,
        granted = doctor_ids.len(),
        "Doctor permissions updated"
    );
    Ok(repository::permitted_doctor_ids(conn, &patient.id)?)
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorAccess {
    pub doctor: DoctorProfile,
    pub permitted: bool,
}

/// Doctors the patient has seen, each with the current grant.
pub fn doctors_with_access(conn: &Connection, patient: &PatientProfile) -> PortalResult<Vec<DoctorAccess>> {
    let permitted = repository::permitted_doctor_ids(conn, &patient.id)?;
    Ok(repository::doctors_seen_by_patient(conn, &patient.id)?
        .into_iter()
        .map(|doctor| DoctorAccess {
            permitted: permitted.contains(&doctor.id),
            doctor,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use chrono::Duration;

    fn record(diagnosis: &str) -> NewRecord {
        NewRecord {
            diagnosis: diagnosis.into(),
            notes: None,
            prescription: Some("Rest".into()),
        }
    }

    fn file_for(patient: &PatientProfile, doctor: &DoctorProfile, minutes_ago: i64) -> MedicalFile {
        MedicalFile {
            id: Uuid::new_v4(),
            patient_id: patient.id,
            doctor_id: doctor.id,
            stored_filename: format!("{}.pdf", Uuid::new_v4()),
            original_filename: "scan.pdf".into(),
            content_type: "application/pdf".into(),
            size_bytes: 10,
            description: None,
            uploaded_at: Local::now().naive_local() - Duration::minutes(minutes_ago),
        }
    }

    #[test]
    fn record_validation() {
        let conn = test_db();
        let doctor = doctor(&conn, "d@example.com");
        let patient = patient(&conn, "p@example.com");

        assert!(matches!(
            add_medical_record(&conn, &doctor, &patient.id, record("  ")),
            Err(PortalError::Validation(_))
        ));
        let mut long = record("Flu");
        long.prescription = Some("x".repeat(MAX_PRESCRIPTION_LEN + 1));
        assert!(matches!(
            add_medical_record(&conn, &doctor, &patient.id, long),
            Err(PortalError::Validation(_))
        ));
        assert!(matches!(
            add_medical_record(&conn, &doctor, &Uuid::new_v4(), record("Flu")),
            Err(PortalError::NotFound { .. })
        ));
        assert!(patient_timeline(&conn, &patient).unwrap().is_empty());
    }

    #[test]
    fn timeline_merges_records_and_files_newest_first() {
        let conn = test_db();
        let doctor = doctor(&conn, "d@example.com");
        let patient = patient(&conn, "p@example.com");

        let old_file = file_for(&patient, &doctor, 60);
        repository::insert_medical_file(&conn, &old_file).unwrap();
        let rec = add_medical_record(&conn, &doctor, &patient.id, record("Flu")).unwrap();

        let timeline = patient_timeline(&conn, &patient).unwrap();
        assert_eq!(timeline.len(), 2);
        assert!(matches!(&timeline[0], TimelineItem::Record(r) if r.id == rec.id));
        assert!(matches!(&timeline[1], TimelineItem::File(f) if f.id == old_file.id));
        assert!(timeline[0].timestamp() >= timeline[1].timestamp());
    }

    #[test]
    fn doctor_sees_own_entries_until_granted() {
        let conn = test_db();
        let author = doctor(&conn, "d1@example.com");
        let other = doctor(&conn, "d2@example.com");
        let patient = patient(&conn, "p@example.com");
        add_medical_record(&conn, &author, &patient.id, record("Asthma")).unwrap();
        add_medical_record(&conn, &other, &patient.id, record("Sprain")).unwrap();

        let chart = doctor_chart(&conn, &other, &patient.id).unwrap();
        assert!(!chart.full_access);
        assert_eq!(chart.items.len(), 1);
        assert!(chart.items.iter().all(|i| i.doctor_id() == other.id));

        appointment_with_status(&conn, &patient, &other, at(10, 0), AppointmentStatus::Pending);
        set_permitted_doctors(&conn, &patient, &[other.id]).unwrap();
        let chart = doctor_chart(&conn, &other, &patient.id).unwrap();
        assert!(chart.full_access);
        assert_eq!(chart.items.len(), 2);
    }

    #[test]
    fn only_seen_doctors_can_be_granted() {
        let conn = test_db();
        let seen = doctor(&conn, "d1@example.com");
        let stranger = doctor(&conn, "d2@example.com");
        let patient = patient(&conn, "p@example.com");
        appointment_with_status(&conn, &patient, &seen, at(10, 0), AppointmentStatus::Completed);

        let err = set_permitted_doctors(&conn, &patient, &[seen.id, stranger.id]).unwrap_err();
        assert!(matches!(err, PortalError::Validation(_)));
        assert!(!doctor_can_view_all(&conn, &seen, &patient.id).unwrap());

        assert_eq!(set_permitted_doctors(&conn, &patient, &[seen.id]).unwrap(), vec![seen.id]);
        let access = doctors_with_access(&conn, &patient).unwrap();
        assert_eq!(access.len(), 1);
        assert!(access[0].permitted);

        assert!(set_permitted_doctors(&conn, &patient, &[]).unwrap().is_empty());
        assert!(!doctors_with_access(&conn, &patient).unwrap()[0].permitted);
    }
}
