//! Commands module
//!
//! One subcommand per job, plus `all`.

mod run;

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use crmsync_runner::{Config, JobKind};

/// Top-level CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check that the CRM answers
    Heartbeat,
    /// Restock products whose stock is low
    LowStockRestock,
    /// Log reminders for orders placed in the last week
    OrderReminders,
    /// Report customer, order and revenue totals
    UsageReport,
    /// Run every job concurrently
    All,
}

impl Commands {
    /// Jobs selected by the command
    pub fn jobs(&self) -> Vec<JobKind> {
        match self {
            Commands::Heartbeat => vec![JobKind::Heartbeat],
            Commands::LowStockRestock => vec![JobKind::LowStockRestock],
            Commands::OrderReminders => vec![JobKind::OrderReminders],
            Commands::UsageReport => vec![JobKind::UsageReport],
            Commands::All => JobKind::ALL.to_vec(),
        }
    }
}

/// Handle a CLI command
///
/// Returns the process exit code: 1 if any selected job failed, 0 otherwise.
pub async fn handle_command(command: Commands, config: &Config) -> Result<u8> {
    let (results, lost) = run::run_jobs(&command.jobs(), config).await?;

    for result in &results {
        run::print_outcome(result);
    }
    if lost > 0 {
        println!("{}", format!("{} job(s) ended without a result", lost).red());
    }

    Ok(run::exit_code(&results, lost))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_selects_every_job() {
        assert_eq!(Commands::All.jobs(), JobKind::ALL.to_vec());
        assert_eq!(Commands::UsageReport.jobs(), vec![JobKind::UsageReport]);
    }
}
