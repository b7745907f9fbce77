use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::crypto::PBKDF2_ITERATIONS;

/// Application-level constants
pub const APP_NAME: &str = "MedPortal";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
/// Idle lifetime of a login token: 8 hours.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 8 * 60 * 60;
/// Largest accepted medical file upload: 10 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "medportal=info,medportal_lib=info,tower_http=info"
}

/// Get the application data directory
/// ~/MedPortal/ unless overridden.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Runtime configuration, resolved from `MEDPORTAL_*` environment variables.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub uploads_dir: PathBuf,
    pub session_ttl: Duration,
    pub max_upload_bytes: usize,
    pub pbkdf2_iterations: u32,
}

impl PortalConfig {
    /// Defaults rooted at `data_dir`.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            db_path: data_dir.join("portal.db"),
            uploads_dir: data_dir.join("uploads"),
            data_dir,
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            pbkdf2_iterations: PBKDF2_ITERATIONS,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = lookup("MEDPORTAL_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(app_data_dir);
        let mut config = Self::with_data_dir(data_dir);

        if let Some(raw) = lookup("MEDPORTAL_BIND") {
            config.bind_addr = parse_value("MEDPORTAL_BIND", raw)?;
        }
        if let Some(raw) = lookup("MEDPORTAL_DB") {
            config.db_path = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("MEDPORTAL_UPLOADS") {
            config.uploads_dir = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("MEDPORTAL_SESSION_TTL_SECS") {
            config.session_ttl = Duration::from_secs(parse_value("MEDPORTAL_SESSION_TTL_SECS", raw)?);
        }
        if let Some(raw) = lookup("MEDPORTAL_MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = parse_value("MEDPORTAL_MAX_UPLOAD_BYTES", raw)?;
        }
        if let Some(raw) = lookup("MEDPORTAL_PBKDF2_ITERATIONS") {
            let iterations: u32 = parse_value("MEDPORTAL_PBKDF2_ITERATIONS", raw.clone())?;
            if iterations == 0 {
                return Err(ConfigError::Invalid {
                    key: "MEDPORTAL_PBKDF2_ITERATIONS",
                    value: raw,
                });
            }
            config.pbkdf2_iterations = iterations;
        }

        Ok(config)
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, raw: String) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value: raw })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn app_data_dir_ends_with_app_name() {
        assert!(app_data_dir().ends_with("MedPortal"));
    }

    #[test]
    fn defaults_derive_from_data_dir() {
        let config = PortalConfig::from_lookup(lookup_from(&[("MEDPORTAL_DATA_DIR", "/srv/portal")])).unwrap();
        assert_eq!(config.db_path, PathBuf::from("/srv/portal/portal.db"));
        assert_eq!(config.uploads_dir, PathBuf::from("/srv/portal/uploads"));
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    }

    #[test]
    fn overrides_are_applied() {
        let config = PortalConfig::from_lookup(lookup_from(&[
            ("MEDPORTAL_DATA_DIR", "/srv/portal"),
            ("MEDPORTAL_BIND", "0.0.0.0:9000"),
            ("MEDPORTAL_DB", "/var/db/portal.sqlite"),
            ("MEDPORTAL_SESSION_TTL_SECS", "60"),
            ("MEDPORTAL_PBKDF2_ITERATIONS", "1000"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.db_path, PathBuf::from("/var/db/portal.sqlite"));
        assert_eq!(config.session_ttl, Duration::from_secs(60));
        assert_eq!(config.pbkdf2_iterations, 1000);
    }

    #[test]
    fn invalid_values_are_reported_with_key() {
        let err = PortalConfig::from_lookup(lookup_from(&[("MEDPORTAL_BIND", "not-an-addr")])).unwrap_err();
        assert!(err.to_string().contains("MEDPORTAL_BIND"));

        let err = PortalConfig::from_lookup(lookup_from(&[("MEDPORTAL_PBKDF2_ITERATIONS", "0")])).unwrap_err();
        assert!(err.to_string().contains("MEDPORTAL_PBKDF2_ITERATIONS"));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }
}
