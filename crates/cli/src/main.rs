//! # WMH Pipeline CLI
//!
//! Command-line entry point.
//!
//! Provides:
//! - legacy `-inT1 ... -doALL` invocation
//! - settings loading and validation
//! - run summary and exit codes (1 = usage, 2 = pipeline failure)

mod cli;
mod commands;
mod error;

use std::process::ExitCode;

use clap::error::ErrorKind;
use observability::ObservabilityConfig;
use tracing::{error, info};

use cli::{Cli, Commands};
use commands::{run_info, run_pipeline, run_validate};
use error::{exit_code, EXIT_USAGE};

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = match Cli::try_parse_legacy(std::env::args_os()) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(EXIT_USAGE),
            };
        }
    };

    let config = ObservabilityConfig {
        log_format: cli.log_format.into(),
        metrics_port: cli.run.metrics_port(),
        default_log_level: ObservabilityConfig::level_for(cli.verbose, cli.quiet).to_string(),
    };
    if let Err(e) = observability::init_with_config(config) {
        eprintln!("Error: {e:#}");
        return ExitCode::FAILURE;
    }

    info!(version = env!("CARGO_PKG_VERSION"), "WMH pipeline starting");

    let result = match &cli.command {
        None => run_pipeline(&cli.run).await,
        Some(Commands::Validate(args)) => run_validate(args),
        Some(Commands::Info(args)) => run_info(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Command failed");
            eprintln!("Error: {e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}
