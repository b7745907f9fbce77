pub mod api; // JSON HTTP API
pub mod billing; // Bills, direct payment and insurance claims
pub mod config;
pub mod core_state; // Shared state: config, file store, DB access
pub mod crypto;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod files; // Medical file storage + access rules
pub mod identity; // Registration and login
pub mod lifecycle; // Appointment state machine
pub mod models;
pub mod profiles;
pub mod records; // Medical records, permissions, timeline
pub mod reviews;
pub mod scheduling; // Availability, slot grid, booking
pub mod search; // Doctor search
pub mod seed; // Demo data

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Open the data directory and serve the API until Ctrl-C.
pub async fn run(config: config::PortalConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
    let core = Arc::new(core_state::CoreState::new(config)?);
    api::serve(core).await?;
    tracing::info!("{} stopped", config::APP_NAME);
    Ok(())
}
