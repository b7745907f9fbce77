//! Shared application state handed to every request.
//!
//! Holds configuration and the upload store. Database access is one
//! short-lived connection per call to `open_db()`; migrations run once
//! in `CoreState::new`.

use crate::config::PortalConfig;
use crate::db::{self, DatabaseError};
use crate::files::FileStore;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct CoreState {
    pub config: PortalConfig,
    pub files: FileStore,
}

impl CoreState {
    /// Create data directories, migrate the database and build the state.
    pub fn new(config: PortalConfig) -> Result<Self, CoreError> {
        std::fs::create_dir_all(&config.data_dir)?;
        if let Some(parent) = config.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let files = FileStore::new(config.uploads_dir.clone(), config.max_upload_bytes)?;

        // Migrate once; request connections skip it.
        db::open_database(&config.db_path)?;
        tracing::info!(db = %config.db_path.display(), "Database ready");

        Ok(Self { config, files })
    }

    /// Open a database connection for one request or command.
    pub fn open_db(&self) -> Result<rusqlite::Connection, CoreError> {
        db::open_connection(&self.config.db_path).map_err(CoreError::Database)
    }

    pub fn pbkdf2_iterations(&self) -> u32 {
        self.config.pbkdf2_iterations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_creates_dirs_and_migrated_db() {
        let dir = tempfile::tempdir().unwrap();
        let config = PortalConfig::with_data_dir(dir.path().join("portal"));
        let state = CoreState::new(config).unwrap();

        assert!(state.config.uploads_dir.is_dir());
        let conn = state.open_db().unwrap();
        assert_eq!(db::count_tables(&conn).unwrap(), 10);
    }

    #[test]
    fn new_is_idempotent_on_existing_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = PortalConfig::with_data_dir(dir.path().to_path_buf());
        CoreState::new(config.clone()).unwrap();
        let state = CoreState::new(config).unwrap();
        assert!(state.open_db().is_ok());
    }
}
