//! Job outcome types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Overall status of one job run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    #[serde(rename = "SUCCESS")]
    Success,
    /// The run completed but some records could not be processed
    #[serde(rename = "PARTIAL")]
    PartialFailure,
    #[serde(rename = "FAILURE")]
    Failure,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Success => "SUCCESS",
            JobStatus::PartialFailure => "PARTIAL",
            JobStatus::Failure => "FAILURE",
        }
    }

    /// Process exit code for this status
    pub fn exit_code(&self) -> u8 {
        match self {
            JobStatus::Success | JobStatus::PartialFailure => 0,
            JobStatus::Failure => 1,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, JobStatus::Failure)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUCCESS" => Ok(JobStatus::Success),
            "PARTIAL" => Ok(JobStatus::PartialFailure),
            "FAILURE" => Ok(JobStatus::Failure),
            other => Err(format!("unknown job status '{}'", other)),
        }
    }
}

/// One structured record produced by a job run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobItem {
    /// A product whose stock was replenished
    Restocked { name: String, stock: i64 },
    /// A recent order that needs a reminder
    Reminder {
        order_id: String,
        contact: String,
        date: String,
    },
    /// A named aggregate value
    Metric { name: String, value: String },
}

impl fmt::Display for JobItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobItem::Restocked { name, stock } => write!(f, "{}: new stock = {}", name, stock),
            JobItem::Reminder {
                order_id,
                contact,
                date,
            } => write!(
                f,
                "Reminder: Order {} for {} (Date: {})",
                order_id, contact, date
            ),
            JobItem::Metric { name, value } => write!(f, "{} = {}", name, value),
        }
    }
}

/// Status, summary and items computed for a run, before it is stamped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub status: JobStatus,
    pub summary: String,
    pub items: Vec<JobItem>,
}

impl Outcome {
    pub fn success(summary: impl Into<String>, items: Vec<JobItem>) -> Self {
        Self {
            status: JobStatus::Success,
            summary: summary.into(),
            items,
        }
    }

    pub fn partial(summary: impl Into<String>, items: Vec<JobItem>) -> Self {
        Self {
            status: JobStatus::PartialFailure,
            summary: summary.into(),
            items,
        }
    }

    /// A failed run never carries items
    pub fn failure(summary: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failure,
            summary: summary.into(),
            items: Vec::new(),
        }
    }
}

/// The immutable outcome record of one job run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    run_id: Uuid,
    job_name: String,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    status: JobStatus,
    summary: String,
    items: Vec<JobItem>,
}

impl JobResult {
    /// Stamps an outcome with its run identity; `finished_at` is taken now
    pub fn new(
        run_id: Uuid,
        job_name: impl Into<String>,
        started_at: DateTime<Utc>,
        outcome: Outcome,
    ) -> Self {
        Self {
            run_id,
            job_name: job_name.into(),
            started_at,
            finished_at: Utc::now(),
            status: outcome.status,
            summary: outcome.summary,
            items: outcome.items,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn items(&self) -> &[JobItem] {
        &self.items
    }

    pub fn exit_code(&self) -> u8 {
        self.status.exit_code()
    }
}
