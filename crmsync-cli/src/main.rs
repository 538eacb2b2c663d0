//! crmsync CLI
//!
//! Runs one scheduled CRM sync job (or all of them) and exits with a
//! status an external scheduler can act on.

mod commands;
mod config;

use clap::Parser;
use commands::{Commands, handle_command};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Overrides;

/// Exit status for configuration that cannot be used
const EXIT_BAD_CONFIG: u8 = 2;

#[derive(Parser)]
#[command(name = "crmsync")]
#[command(about = "Scheduled sync jobs for the CRM GraphQL API", long_about = None)]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Diagnostics go to stderr; stdout carries the outcome line
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crmsync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match cli.overrides.load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("crmsync: {:#}", e);
            return ExitCode::from(EXIT_BAD_CONFIG);
        }
    };

    match handle_command(cli.command, &config).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("crmsync: {:#}", e);
            ExitCode::from(EXIT_BAD_CONFIG)
        }
    }
}
