//! Domain error taxonomy shared by every portal operation.
//!
//! Validation and conflict errors never leave partial writes behind;
//! authorization failures on another user's resource surface as
//! `NotFound` so existence is not leaked.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum PortalError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Slot {0} is already taken")]
    SlotTaken(NaiveDateTime),

    #[error("Upload too large: {size} bytes exceeds {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error("Database error: {0}")]
    Database(DatabaseError),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
}

pub type PortalResult<T> = Result<T, PortalError>;

impl PortalError {
    pub fn validation(msg: impl Into<String>) -> Self {
        PortalError::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        PortalError::Conflict(msg.into())
    }

    pub fn not_found(entity_type: &str, id: impl ToString) -> Self {
        PortalError::NotFound {
            entity_type: entity_type.to_string(),
            id: id.to_string(),
        }
    }
}

impl From<DatabaseError> for PortalError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity_type, id } => PortalError::NotFound { entity_type, id },
            other => PortalError::Database(other),
        }
    }
}

impl From<rusqlite::Error> for PortalError {
    fn from(err: rusqlite::Error) -> Self {
        PortalError::Database(DatabaseError::from(err))
    }
}
