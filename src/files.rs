//! Medical file attachments: disk storage plus access rules.
//!
//! Bytes are written under the uploads directory as `<uuid>.<ext>`; the
//! uploader's filename is kept only as metadata. Who may read a file:
//! the patient it belongs to, the doctor who uploaded it, and any doctor
//! the patient has granted full access. Everyone else gets `NotFound`.

use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::repository;
use crate::error::{PortalError, PortalResult};
use crate::identity::non_blank;
use crate::models::*;

const MAX_EXTENSION_LEN: usize = 10;
const MAX_FILENAME_LEN: usize = 255;

/// Upload directory with a size cap.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    max_bytes: usize,
}

impl FileStore {
    pub fn new(root: PathBuf, max_bytes: usize) -> io::Result<Self> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root, max_bytes })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    fn path_of(&self, stored_filename: &str) -> PathBuf {
        self.root.join(stored_filename)
    }

    fn write(&self, stored_filename: &str, bytes: &[u8]) -> io::Result<()> {
        std::fs::write(self.path_of(stored_filename), bytes)
    }

    fn read(&self, stored_filename: &str) -> io::Result<Vec<u8>> {
        std::fs::read(self.path_of(stored_filename))
    }

    fn remove(&self, stored_filename: &str) {
        if let Err(e) = std::fs::remove_file(self.path_of(stored_filename)) {
            tracing::warn!(file = stored_filename, error = %e, "Failed to remove orphaned upload");
        }
    }
}

/// Lowercase alphanumeric extension of `filename`, if it has a usable one.
pub fn sanitize_extension(filename: &str) -> Option<String> {
    let ext = Path::new(filename).extension()?.to_str()?;
    if ext.is_empty() || ext.len() > MAX_EXTENSION_LEN || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Last path component of a client-supplied name, without control chars.
fn clean_original_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_FILENAME_LEN)
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

#[derive(Debug, Clone)]
pub struct NewUpload {
    pub original_filename: String,
    /// Type sent by the client; guessed from the filename when absent.
    pub content_type: Option<String>,
    pub description: Option<String>,
    pub bytes: Vec<u8>,
}

pub fn upload_file(
    conn: &Connection,
    store: &FileStore,
    doctor: &DoctorProfile,
    patient_id: &Uuid,
    upload: NewUpload,
) -> PortalResult<MedicalFile> {
    if upload.bytes.is_empty() {
        return Err(PortalError::validation("uploaded file is empty"));
    }
    if upload.bytes.len() > store.max_bytes {
        return Err(PortalError::TooLarge {
            size: upload.bytes.len(),
            limit: store.max_bytes,
        });
    }
    let patient = repository::get_patient_profile(conn, patient_id)?
        .ok_or_else(|| PortalError::not_found("Patient", patient_id))?;

    let original_filename = clean_original_name(&upload.original_filename);
    let id = Uuid::new_v4();
    let stored_filename = match sanitize_extension(&original_filename) {
        Some(ext) => format!("{id}.{ext}"),
        None => id.to_string(),
    };
    let content_type = non_blank(upload.content_type)
        .filter(|ct| ct != "application/octet-stream")
        .unwrap_or_else(|| {
            mime_guess::from_path(&original_filename)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        });

    let file = MedicalFile {
        id,
        patient_id: patient.id,
        doctor_id: doctor.id,
        stored_filename,
        original_filename,
        content_type,
        size_bytes: upload.bytes.len() as i64,
        description: non_blank(upload.description),
        uploaded_at: Local::now().naive_local(),
    };

    store.write(&file.stored_filename, &upload.bytes)?;
    if let Err(e) = repository::insert_medical_file(conn, &file) {
        store.remove(&file.stored_filename);
        return Err(e.into());
    }

    tracing::info!(
        file_id = %file.id,
        patient_id = %patient.id,
        doctor_id = %doctor.id,
        size = file.size_bytes,
        "Medical file uploaded"
    );
    Ok(file)
}

/// Metadata of a file `viewer` is allowed to read.
pub fn authorize_file(conn: &Connection, viewer: &Profile, file_id: &Uuid) -> PortalResult<MedicalFile> {
    let not_found = || PortalError::not_found("File", file_id);
    let file = repository::get_medical_file(conn, file_id)?.ok_or_else(not_found)?;
    let allowed = match viewer {
        Profile::Patient(p) => file.patient_id == p.id,
        Profile::Doctor(d) => {
            file.doctor_id == d.id || repository::has_permission(conn, &file.patient_id, &d.id)?
        }
        Profile::Insurance(_) => false,
    };
    if !allowed {
        tracing::debug!(file_id = %file_id, viewer = %viewer.id(), "File access denied");
        return Err(not_found());
    }
    Ok(file)
}

/// Authorized metadata plus file contents.
pub fn open_file(
    conn: &Connection,
    store: &FileStore,
    viewer: &Profile,
    file_id: &Uuid,
) -> PortalResult<(MedicalFile, Vec<u8>)> {
    let file = authorize_file(conn, viewer, file_id)?;
    let bytes = store.read(&file.stored_filename)?;
    Ok((file, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    fn store(dir: &tempfile::TempDir) -> FileStore {
        FileStore::new(dir.path().join("uploads"), 1024).unwrap()
    }

    fn upload(name: &str, bytes: &[u8]) -> NewUpload {
        NewUpload {
            original_filename: name.into(),
            content_type: None,
            description: Some("X-ray".into()),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn extension_sanitizing() {
        assert_eq!(sanitize_extension("scan.PDF"), Some("pdf".into()));
        assert_eq!(sanitize_extension("archive.tar.gz"), Some("gz".into()));
        assert_eq!(sanitize_extension("noext"), None);
        assert_eq!(sanitize_extension("evil.p$p"), None);
        assert_eq!(clean_original_name("../../etc/passwd"), "passwd");
        assert_eq!(clean_original_name("C:\\docs\\report.pdf"), "report.pdf");
        assert_eq!(clean_original_name(".."), "upload");
    }

    #[test]
    fn upload_stores_bytes_under_generated_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let conn = test_db();
        let doctor = doctor(&conn, "d@example.com");
        let patient = patient(&conn, "p@example.com");

        let file = upload_file(&conn, &store, &doctor, &patient.id, upload("../scan.PNG", b"png-bytes")).unwrap();
        assert_eq!(file.original_filename, "scan.PNG");
        assert_eq!(file.stored_filename, format!("{}.png", file.id));
        assert_eq!(file.content_type, "image/png");
        assert_eq!(file.size_bytes, 9);
        assert!(store.root().join(&file.stored_filename).is_file());

        let viewer = Profile::Patient(patient);
        let (meta, bytes) = open_file(&conn, &store, &viewer, &file.id).unwrap();
        assert_eq!(meta.id, file.id);
        assert_eq!(bytes, b"png-bytes");
    }

    #[test]
    fn upload_limits() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let conn = test_db();
        let doctor = doctor(&conn, "d@example.com");
        let patient = patient(&conn, "p@example.com");

        assert!(matches!(
            upload_file(&conn, &store, &doctor, &patient.id, upload("big.bin", &[0u8; 2048])),
            Err(PortalError::TooLarge { size: 2048, limit: 1024 })
        ));
        assert!(matches!(
            upload_file(&conn, &store, &doctor, &patient.id, upload("empty.txt", b"")),
            Err(PortalError::Validation(_))
        ));
        assert!(matches!(
            upload_file(&conn, &store, &doctor, &Uuid::new_v4(), upload("a.txt", b"a")),
            Err(PortalError::NotFound { .. })
        ));
        assert_eq!(std::fs::read_dir(store.root()).unwrap().count(), 0);
    }

    #[test]
    fn access_rules() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let conn = test_db();
        let author = doctor(&conn, "d1@example.com");
        let colleague = doctor(&conn, "d2@example.com");
        let owner = patient(&conn, "p1@example.com");
        let stranger = patient(&conn, "p2@example.com");
        let insurer = insurer(&conn, "i@example.com");

        let file = upload_file(&conn, &store, &author, &owner.id, upload("notes.txt", b"hi")).unwrap();

        assert!(authorize_file(&conn, &Profile::Patient(owner.clone()), &file.id).is_ok());
        assert!(authorize_file(&conn, &Profile::Doctor(author.clone()), &file.id).is_ok());
        for viewer in [
            Profile::Patient(stranger),
            Profile::Doctor(colleague.clone()),
            Profile::Insurance(insurer),
        ] {
            assert!(matches!(
                authorize_file(&conn, &viewer, &file.id),
                Err(PortalError::NotFound { .. })
            ));
        }

        repository::replace_permissions(&conn, &owner.id, &[colleague.id]).unwrap();
        assert!(authorize_file(&conn, &Profile::Doctor(colleague), &file.id).is_ok());

        assert!(matches!(
            authorize_file(&conn, &Profile::Doctor(author), &Uuid::new_v4()),
            Err(PortalError::NotFound { .. })
        ));
    }
}
