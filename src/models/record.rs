use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Append-only diagnosis entry written by one doctor about one patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub diagnosis: String,
    pub notes: Option<String>,
    pub prescription: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Metadata for an uploaded attachment. The bytes live on disk under
/// `stored_filename`, never under the name the uploader chose.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalFile {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    #[serde(skip_serializing, default)]
    pub stored_filename: String,
    pub original_filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub description: Option<String>,
    pub uploaded_at: NaiveDateTime,
}

/// One entry of a patient's combined history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TimelineItem {
    Record(MedicalRecord),
    File(MedicalFile),
}

impl TimelineItem {
    pub fn timestamp(&self) -> NaiveDateTime {
        match self {
            TimelineItem::Record(r) => r.created_at,
            TimelineItem::File(f) => f.uploaded_at,
        }
    }

    pub fn doctor_id(&self) -> Uuid {
        match self {
            TimelineItem::Record(r) => r.doctor_id,
            TimelineItem::File(f) => f.doctor_id,
        }
    }
}
