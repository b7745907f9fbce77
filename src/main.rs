//! MedPortal command line.
//!
//! Usage:
//!   medportal serve [--bind <addr>] [--data-dir <dir>]
//!   medportal seed [--reset] [--data-dir <dir>] [--doctors N] [--patients N] [--insurers N]

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use medportal_lib::config::PortalConfig;
use medportal_lib::core_state::CoreState;
use medportal_lib::seed::{self, SeedOptions};

#[derive(Parser)]
#[command(name = "medportal")]
#[command(version)]
#[command(about = "Multi-role healthcare portal: booking, records, billing and claims", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Data directory (database + uploads); overrides MEDPORTAL_DATA_DIR
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Listen address; overrides MEDPORTAL_BIND
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },

    /// Fill an empty database with demo accounts, visits and reviews
    Seed {
        /// Delete all existing data first
        #[arg(long)]
        reset: bool,

        #[arg(long, default_value = "50")]
        doctors: usize,

        #[arg(long, default_value = "100")]
        patients: usize,

        #[arg(long, default_value = "10")]
        insurers: usize,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    medportal_lib::init_tracing();

    let mut config = PortalConfig::from_env()?;
    if let Some(dir) = cli.data_dir {
        let rooted = PortalConfig::with_data_dir(dir);
        config.data_dir = rooted.data_dir;
        config.db_path = rooted.db_path;
        config.uploads_dir = rooted.uploads_dir;
    }

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(addr) = bind {
                config.bind_addr = addr;
            }
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(medportal_lib::run(config))?;
        }
        Commands::Seed {
            reset,
            doctors,
            patients,
            insurers,
        } => {
            let core = CoreState::new(config)?;
            let conn = core.open_db()?;
            if reset {
                seed::clear_data(&conn)?;
                tracing::info!("Existing data cleared");
            }
            let options = SeedOptions {
                doctors,
                patients,
                insurers,
                pbkdf2_iterations: core.pbkdf2_iterations(),
                ..SeedOptions::default()
            };
            let summary = seed::seed_demo_data(&conn, &options, &mut rand::thread_rng())?;
            println!(
                "Seeded {} doctors, {} patients, {} insurers, {} reviews",
                summary.doctors, summary.patients, summary.insurers, summary.reviews
            );
            println!(
                "Demo logins (password '{}'): {}, {}, {}",
                seed::DEMO_PASSWORD,
                seed::TEST_PATIENT_EMAIL,
                seed::TEST_DOCTOR_EMAIL,
                seed::TEST_INSURER_EMAIL
            );
        }
    }
    Ok(())
}
