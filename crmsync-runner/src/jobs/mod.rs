//! Job definitions
//!
//! A job is a pure description: which remote operations to send, in what
//! order, and how to turn the responses into an outcome. Jobs never touch
//! the network or the log themselves; `JobRunner` does that.

mod heartbeat;
mod low_stock;
mod order_reminders;
mod usage_report;

pub use heartbeat::Heartbeat;
pub use low_stock::LowStockRestock;
pub use order_reminders::OrderReminders;
pub use usage_report::UsageReport;

use chrono::{DateTime, Utc};
use crmsync_core::domain::job::Outcome;
use crmsync_core::remote::{RemoteOperation, RemoteResponse, ShapeError};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::str::FromStr;

/// A named, schedulable unit of work against the remote service
pub trait JobDefinition: Send + Sync {
    /// Stable name used in logs and on the command line
    fn name(&self) -> &str;

    /// Upper bound on how many operations one run sends
    fn operation_count(&self) -> usize {
        1
    }

    /// The next operation to send, given the responses received so far
    ///
    /// Returns `None` once the sequence is complete.
    fn next_operation(&self, prior: &[RemoteResponse]) -> Option<RemoteOperation>;

    /// Turns the collected responses into an outcome
    fn interpret(&self, responses: &[RemoteResponse]) -> Result<Outcome, ShapeError>;
}

/// The jobs this crate knows how to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Heartbeat,
    LowStockRestock,
    OrderReminders,
    UsageReport,
}

impl JobKind {
    pub const ALL: [JobKind; 4] = [
        JobKind::Heartbeat,
        JobKind::LowStockRestock,
        JobKind::OrderReminders,
        JobKind::UsageReport,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            JobKind::Heartbeat => "heartbeat",
            JobKind::LowStockRestock => "low-stock-restock",
            JobKind::OrderReminders => "order-reminders",
            JobKind::UsageReport => "usage-report",
        }
    }

    /// Builds the job definition; `now` anchors time-relative queries
    pub fn definition(&self, now: DateTime<Utc>) -> Box<dyn JobDefinition> {
        match self {
            JobKind::Heartbeat => Box::new(Heartbeat),
            JobKind::LowStockRestock => Box::new(LowStockRestock),
            JobKind::OrderReminders => Box::new(OrderReminders::new(now)),
            JobKind::UsageReport => Box::new(UsageReport),
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("unknown job '{}'", s))
    }
}

/// The response at `index`, or a shape error if the run produced fewer
pub(crate) fn response_at(
    responses: &[RemoteResponse],
    index: usize,
    expected: usize,
) -> Result<&RemoteResponse, ShapeError> {
    responses.get(index).ok_or(ShapeError::MissingResponse {
        expected,
        actual: responses.len(),
    })
}

/// Record nodes of a list field
///
/// Accepts both a plain array of records and a relay-style connection
/// (`{ edges: [{ node: {...} }] }`). An edge without a node yields `null`
/// so that it fails to decode as a record.
pub(crate) fn list_nodes(response: &RemoteResponse, field: &str) -> Result<Vec<JsonValue>, ShapeError> {
    let value = response
        .field(field)
        .ok_or_else(|| ShapeError::MissingField(field.to_string()))?;

    match value {
        JsonValue::Array(records) => Ok(records.clone()),
        JsonValue::Object(connection) => match connection.get("edges") {
            Some(JsonValue::Array(edges)) => Ok(edges
                .iter()
                .map(|edge| edge.get("node").cloned().unwrap_or(JsonValue::Null))
                .collect()),
            Some(JsonValue::Null) | None => Err(ShapeError::MissingField(format!("{}/edges", field))),
            Some(_) => Err(ShapeError::unexpected(
                format!("{}/edges", field),
                "expected an array",
            )),
        },
        _ => Err(ShapeError::unexpected(field, "expected a list or a connection")),
    }
}

/// A count field, given either as a number or as `{ totalCount: n }`
pub(crate) fn count_field(response: &RemoteResponse, field: &str) -> Result<u64, ShapeError> {
    match response.field(field) {
        Some(JsonValue::Object(_)) => response.decode(&format!("/{}/totalCount", field)),
        Some(_) => response.decode(field),
        None => Err(ShapeError::MissingField(field.to_string())),
    }
}

/// Decodes each record independently, collecting the ones that fail
pub(crate) fn decode_records<T: DeserializeOwned>(nodes: Vec<JsonValue>) -> (Vec<T>, usize) {
    let mut decoded = Vec::with_capacity(nodes.len());
    let mut skipped = 0;
    for node in nodes {
        match serde_json::from_value::<T>(node) {
            Ok(record) => decoded.push(record),
            Err(_) => skipped += 1,
        }
    }
    (decoded, skipped)
}
