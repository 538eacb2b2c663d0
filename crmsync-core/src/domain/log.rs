//! Log domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::job::{JobResult, JobStatus};

/// One record in an append-only job log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub job_name: String,
    pub status: JobStatus,
    pub summary: String,
    pub item_lines: Vec<String>,
}

impl From<&JobResult> for LogEntry {
    fn from(result: &JobResult) -> Self {
        Self {
            timestamp: result.started_at(),
            job_name: result.job_name().to_string(),
            status: result.status(),
            summary: result.summary().to_string(),
            item_lines: result.items().iter().map(ToString::to_string).collect(),
        }
    }
}
