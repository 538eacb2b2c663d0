//! Log sinks
//!
//! A sink is where a job run's outcome is recorded. The runner writes
//! exactly one entry per run to its sink, and falls back to a second sink
//! (standard error by default) when the first cannot be written.

mod durable;
mod format;

pub use durable::DurableLogger;
pub use format::{LogFormat, parse, render};

use crmsync_core::domain::log::LogEntry;
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while writing or reading a destination
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("cannot write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode log entry: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Trait for log sinks
///
/// Implementations must make `append` atomic per call: a record is either
/// fully written or not at all, and concurrent appends never interleave.
pub trait LogSink: Send + Sync {
    /// Appends one entry, returning only once it is durable
    fn append(&self, entry: &LogEntry) -> Result<(), SinkError>;

    /// Human-readable name of the destination, for diagnostics
    fn describe(&self) -> String;
}

/// Sink that writes text records to standard error
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrSink;

impl LogSink for StderrSink {
    fn append(&self, entry: &LogEntry) -> Result<(), SinkError> {
        let record = render(entry, LogFormat::Text)?;
        let mut stderr = std::io::stderr().lock();
        stderr
            .write_all(record.as_bytes())
            .and_then(|_| stderr.flush())
            .map_err(|source| SinkError::Io {
                path: PathBuf::from("<stderr>"),
                source,
            })
    }

    fn describe(&self) -> String {
        "standard error".to_string()
    }
}
