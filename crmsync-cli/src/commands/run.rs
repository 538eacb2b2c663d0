//! Job execution and outcome reporting

use anyhow::{Context, Result};
use chrono::Utc;
use colored::*;
use crmsync_core::domain::job::{JobResult, JobStatus};
use crmsync_runner::{Config, DurableLogger, JobKind, JobRunner};
use tracing::error;

/// A job ready to start: its runner and destination are already built
pub struct PreparedRun {
    kind: JobKind,
    runner: JobRunner,
    logger: DurableLogger,
}

/// Builds a client and destination for every job before any job starts
///
/// Either all jobs can run or none does.
pub fn prepare_runs(kinds: &[JobKind], config: &Config) -> Result<Vec<PreparedRun>> {
    kinds
        .iter()
        .map(|&kind| -> Result<PreparedRun> {
            let runner = JobRunner::from_config(config)
                .with_context(|| format!("Failed to create client for job '{}'", kind))?;
            let logger =
                DurableLogger::new(config.destination(kind)).with_format(config.log_format);
            Ok(PreparedRun {
                kind,
                runner,
                logger,
            })
        })
        .collect()
}

/// Runs each job in its own task, with its own client and destination
///
/// Results come back in the order the jobs were given, along with the
/// number of tasks that died outside the runner.
pub async fn run_jobs(kinds: &[JobKind], config: &Config) -> Result<(Vec<JobResult>, usize)> {
    let runs = prepare_runs(kinds, config)?;
    Ok(spawn_runs(runs).await)
}

async fn spawn_runs(runs: Vec<PreparedRun>) -> (Vec<JobResult>, usize) {
    let handles: Vec<_> = runs
        .into_iter()
        .map(|PreparedRun { kind, runner, logger }| {
            let handle = tokio::spawn(async move {
                let job = kind.definition(Utc::now());
                runner.run(job.as_ref(), &logger).await
            });
            (kind, handle)
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    let mut lost = 0;
    for (kind, handle) in handles {
        match handle.await {
            Ok(result) => results.push(result),
            Err(e) => {
                error!("Job '{}' task ended abnormally: {}", kind, e);
                lost += 1;
            }
        }
    }

    (results, lost)
}

/// Exit code for a set of runs: 1 if any failed or was lost
pub fn exit_code(results: &[JobResult], lost: usize) -> u8 {
    if lost > 0 {
        return 1;
    }
    results.iter().map(JobResult::exit_code).max().unwrap_or(0)
}

/// Prints a one-line outcome to stdout
pub fn print_outcome(result: &JobResult) {
    let marker = match result.status() {
        JobStatus::Success => "✓".green(),
        JobStatus::PartialFailure => "~".yellow(),
        JobStatus::Failure => "✗".red(),
    };

    println!(
        "{} {} {} {}",
        marker,
        result.job_name().bold(),
        colorize_status(result.status()),
        result.summary()
    );
}

fn colorize_status(status: JobStatus) -> ColoredString {
    let status_str = status.as_str();
    match status {
        JobStatus::Success => status_str.green(),
        JobStatus::PartialFailure => status_str.yellow(),
        JobStatus::Failure => status_str.red(),
    }
}
