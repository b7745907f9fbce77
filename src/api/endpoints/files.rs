//! Medical file endpoints.
//!
//! - `POST /api/patients/:id/files`: doctor uploads (multipart: `file`,
//!   optional `description`)
//! - `GET /api/files/:id`: download, subject to the file access rules

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};

use crate::api::endpoints::parse_id;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthContext};
use crate::files::{self, NewUpload};
use crate::models::{MedicalFile, Role};

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

/// `POST /api/patients/:id/files`
pub async fn upload(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(patient_id): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<MedicalFile>), ApiError> {
    let doctor = auth.doctor()?;
    let patient_id = parse_id(&patient_id, "patient")?;

    let mut upload: Option<NewUpload> = None;
    let mut description: Option<String> = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let original_filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                upload = Some(NewUpload {
                    original_filename,
                    content_type,
                    description: None,
                    bytes: bytes.to_vec(),
                });
            }
            Some("description") => {
                description = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }
    let mut upload =
        upload.ok_or_else(|| ApiError::BadRequest("Missing multipart field 'file'".into()))?;
    upload.description = description;

    let conn = ctx.core.open_db()?;
    let file = files::upload_file(&conn, &ctx.core.files, doctor, &patient_id, upload)?;
    Ok((StatusCode::CREATED, Json(file)))
}

/// `GET /api/files/:id`
pub async fn download(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(file_id): Path<String>,
) -> Result<Response, ApiError> {
    if auth.profile.role() == Role::Insurance {
        return Err(ApiError::Forbidden(
            "Medical files are visible to patients and doctors".into(),
        ));
    }
    let file_id = parse_id(&file_id, "file")?;
    let conn = ctx.core.open_db()?;
    let (file, bytes) = files::open_file(&conn, &ctx.core.files, &auth.profile, &file_id)?;

    let content_type = HeaderValue::from_str(&file.content_type)
        .unwrap_or(HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&content_disposition(&file.original_filename))
        .unwrap_or(HeaderValue::from_static("attachment"));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// `attachment` disposition with a header-safe filename.
fn content_disposition(original_filename: &str) -> String {
    let safe: String = original_filename
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("attachment; filename=\"{safe}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposition_escapes_quotes_and_non_ascii() {
        assert_eq!(
            content_disposition("scan \"final\".pdf"),
            "attachment; filename=\"scan _final_.pdf\""
        );
        assert_eq!(content_disposition("résumé.txt"), "attachment; filename=\"r_sum_.txt\"");
    }
}
