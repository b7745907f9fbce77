//! API endpoint handlers.
//!
//! Each module covers one area of the portal. Handlers open a
//! connection per request and delegate to the domain modules; role
//! checks go through `AuthContext`.

pub mod appointments;
pub mod auth;
pub mod claims;
pub mod dashboard;
pub mod doctors;
pub mod files;
pub mod health;
pub mod profiles;
pub mod records;

use uuid::Uuid;

use crate::api::error::ApiError;

/// Parse a path id, reporting which kind of id was malformed.
pub(crate) fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|e| ApiError::BadRequest(format!("Invalid {what} ID: {e}")))
}
