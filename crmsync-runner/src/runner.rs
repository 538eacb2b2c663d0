//! Job runner
//!
//! Executes one job run end to end:
//! - sends the job's operations in sequence through the `RemoteClient`
//! - interprets the responses into an outcome
//! - appends exactly one entry to the log sink (or the fallback sink)
//!
//! `run` never fails. Remote errors, shape mismatches, a panicking
//! interpreter and an exhausted run budget all become a logged Failure.

use chrono::Utc;
use crmsync_client::{RemoteClient, RetryPolicy};
use crmsync_core::domain::job::{JobResult, Outcome};
use crmsync_core::domain::log::LogEntry;
use crmsync_core::remote::RemoteResponse;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::jobs::JobDefinition;
use crate::sink::{LogSink, StderrSink};

/// Runs jobs against one remote client
pub struct JobRunner {
    client: RemoteClient,
    policy: RetryPolicy,
    run_budget: Option<Duration>,
    fallback: Box<dyn LogSink>,
}

impl JobRunner {
    /// Creates a runner; the fallback sink is standard error
    pub fn new(client: RemoteClient, policy: RetryPolicy) -> Self {
        Self {
            client,
            policy,
            run_budget: None,
            fallback: Box::new(StderrSink),
        }
    }

    /// Creates a runner with its own HTTP client from configuration
    pub fn from_config(config: &Config) -> crmsync_client::Result<Self> {
        let client = RemoteClient::new(config.endpoint.clone(), config.verify_tls)?
            .with_introspection(config.introspect);

        let mut runner = Self::new(client, config.retry_policy());
        runner.run_budget = config.run_budget;
        Ok(runner)
    }

    /// Bounds every run to `budget` regardless of the job
    pub fn with_run_budget(mut self, budget: Duration) -> Self {
        self.run_budget = Some(budget);
        self
    }

    /// Replaces the sink used when the primary sink cannot be written
    pub fn with_fallback(mut self, fallback: Box<dyn LogSink>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn client(&self) -> &RemoteClient {
        &self.client
    }

    /// Time allowed for one run of `job`
    ///
    /// Unless configured explicitly, this is the worst case of every
    /// operation exhausting its retries, plus one attempt timeout for the
    /// schema fetch when the client introspects.
    pub fn budget_for(&self, job: &dyn JobDefinition) -> Duration {
        self.run_budget.unwrap_or_else(|| {
            let ops = u32::try_from(job.operation_count().max(1)).unwrap_or(u32::MAX);
            let operations = self.policy.worst_case().saturating_mul(ops);
            if self.client.introspects() {
                operations.saturating_add(self.policy.timeout)
            } else {
                operations
            }
        })
    }

    /// Executes one run of `job` and records it in `sink`
    ///
    /// Dropping the returned future before it completes abandons the run
    /// without logging anything.
    pub async fn run(&self, job: &dyn JobDefinition, sink: &dyn LogSink) -> JobResult {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let span = info_span!("run", job = job.name(), run_id = %run_id);

        async move {
            info!("Starting job '{}'", job.name());

            let budget = self.budget_for(job);
            let outcome = match tokio::time::timeout(budget, self.execute(job)).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    error!("Job '{}' exceeded its run budget of {:?}", job.name(), budget);
                    Outcome::failure(format!("run exceeded budget of {:?}", budget))
                }
            };

            let result = JobResult::new(run_id, job.name(), started_at, outcome);
            self.record(&result, sink);

            if result.status().is_failure() {
                warn!("Job '{}' failed: {}", job.name(), result.summary());
            } else {
                info!(
                    "Job '{}' finished with {}: {}",
                    job.name(),
                    result.status(),
                    result.summary()
                );
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Sends the operations in sequence and interprets the responses
    async fn execute(&self, job: &dyn JobDefinition) -> Outcome {
        let mut responses: Vec<RemoteResponse> = Vec::new();

        while responses.len() < job.operation_count() {
            let Some(op) = job.next_operation(&responses) else {
                break;
            };

            match self.client.execute(&op, &self.policy).await {
                Ok(response) => responses.push(response),
                Err(e) => {
                    error!("Operation '{}' failed: {}", op.name(), e);
                    return Outcome::failure(format!("{}: {}", op.name(), e));
                }
            }
        }

        interpret_contained(job, &responses)
    }

    /// Appends the result to `sink`, or to the fallback when that fails
    fn record(&self, result: &JobResult, sink: &dyn LogSink) {
        let entry = LogEntry::from(result);

        let Err(e) = off_reactor(|| sink.append(&entry)) else {
            return;
        };

        error!(
            "Failed to append to {}: {}; writing to {} instead",
            sink.describe(),
            e,
            self.fallback.describe()
        );
        if let Err(e) = off_reactor(|| self.fallback.append(&entry)) {
            error!("Fallback sink {} failed too: {}", self.fallback.describe(), e);
        }
    }
}

/// Runs blocking sink I/O without stalling other tasks on this worker
///
/// On a multi-threaded runtime the worker hands its other tasks off while
/// `f` runs. A current-thread runtime has nowhere to move them, so `f`
/// simply runs in place.
fn off_reactor<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

/// Interprets responses, turning shape errors and panics into failures
fn interpret_contained(job: &dyn JobDefinition, responses: &[RemoteResponse]) -> Outcome {
    match catch_unwind(AssertUnwindSafe(|| job.interpret(responses))) {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(shape)) => {
            error!("Job '{}' got an unexpected response shape: {}", job.name(), shape);
            Outcome::failure(format!("unexpected response shape: {}", shape))
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!("Job '{}' panicked while interpreting: {}", job.name(), message);
            Outcome::failure(format!("interpretation panicked: {}", message))
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
