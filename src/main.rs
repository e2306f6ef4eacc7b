//! Coursewright maintenance entry point.
//!
//! Loads configuration, initialises logging and runs one retention sweep
//! against the configured session store. Meant to be invoked by an external
//! scheduler.

use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use coursewright::application::SessionManager;
use coursewright::config::{AppConfig, LoggingConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("coursewright: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.logging);

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return ExitCode::FAILURE;
    }

    let storage = config.storage.build();
    let manager = SessionManager::new(storage, config.sessions.manager_config());

    info!(
        backend = ?config.storage.backend,
        retention_days = config.sessions.retention_days,
        "Running session cleanup"
    );

    match manager.cleanup_expired_sessions().await {
        Ok(report) => {
            println!(
                "Scanned {} sessions, removed {} expired",
                report.scanned,
                report.removed.len()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, code = %e.code(), "Session cleanup failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.filter));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
