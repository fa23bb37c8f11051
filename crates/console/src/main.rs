use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error};

use client::ApiClient;
use geofence_console::cli::{self, Cli};
use geofence_console::config::Config;
use geofence_console::console::GeofenceConsole;
use geofence_console::logging::init_logging;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Cli::parse();

    let mut config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(base_url) = args.base_url {
        config.api.base_url = base_url;
        config.validate()?;
    }

    init_logging(&config.logging, args.verbose);
    debug!(
        base_url = %config.api.base_url,
        "Starting Geofence Console v{}",
        env!("CARGO_PKG_VERSION")
    );

    let client = ApiClient::new(config.api.client_config())?;
    let mut console = GeofenceConsole::new(client);

    match cli::run(&mut console, args.command, &config.gps).await {
        Ok(output) => {
            print!("{}", output.text);
            if !output.text.ends_with('\n') {
                println!();
            }
            Ok(if output.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("{}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}
