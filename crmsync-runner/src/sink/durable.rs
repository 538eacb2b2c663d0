//! Append-only file destination

use crmsync_core::domain::log::LogEntry;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::format::{self, LogFormat};
use super::{LogSink, SinkError};

/// Appends job log entries to a file
///
/// Every append opens the file in append mode, writes the whole record
/// with a single `write_all`, and syncs it to disk before returning.
/// Existing content is never truncated or rewritten. `append` is
/// blocking file I/O; async callers should move it off the reactor.
#[derive(Debug, Clone)]
pub struct DurableLogger {
    path: PathBuf,
    format: LogFormat,
}

impl DurableLogger {
    /// Creates a logger for `path` using the text layout
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            format: LogFormat::Text,
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> LogFormat {
        self.format
    }

    fn io_error(&self, source: std::io::Error) -> SinkError {
        SinkError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Re-reads every entry in the destination
    ///
    /// A destination that does not exist yet holds no entries.
    pub fn read_entries(&self) -> Result<Vec<LogEntry>, SinkError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(e)),
        };
        Ok(format::parse(&contents, self.format))
    }
}

impl LogSink for DurableLogger {
    fn append(&self, entry: &LogEntry) -> Result<(), SinkError> {
        let record = format::render(entry, self.format)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;

        file.write_all(record.as_bytes())
            .map_err(|e| self.io_error(e))?;
        file.sync_data().map_err(|e| self.io_error(e))?;

        debug!(
            "Appended {} byte record to {}",
            record.len(),
            self.path.display()
        );
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crmsync_core::domain::job::JobStatus;
    use std::sync::Arc;

    fn entry(summary: &str) -> LogEntry {
        LogEntry {
            timestamp: Utc::now(),
            job_name: "heartbeat".to_string(),
            status: JobStatus::Success,
            summary: summary.to_string(),
            item_lines: Vec::new(),
        }
    }

    #[test]
    fn test_append_creates_file_and_parents() {
        let dir = tempfile::tempdir().unwrap();
        let logger = DurableLogger::new(dir.path().join("nested/dir/heartbeat.log"));

        logger.append(&entry("CRM is alive")).unwrap();

        let entries = logger.read_entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].summary, "CRM is alive");
    }

    #[test]
    fn test_append_never_truncates_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heartbeat.log");
        fs::write(&path, "pre-existing line written by someone else\n").unwrap();

        let logger = DurableLogger::new(&path);
        logger.append(&entry("first")).unwrap();
        logger.append(&entry("second")).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("pre-existing line written by someone else\n"));
        let first = contents.find("first").unwrap();
        let second = contents.find("second").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_read_entries_of_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let logger = DurableLogger::new(dir.path().join("absent.log"));
        assert!(logger.read_entries().unwrap().is_empty());
    }

    #[test]
    fn test_unwritable_destination_reports_io_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened for appending.
        let logger = DurableLogger::new(dir.path());

        let err = logger.append(&entry("lost?")).unwrap_err();
        assert!(matches!(err, SinkError::Io { ref path, .. } if path == dir.path()));
    }

    #[test]
    fn test_text_round_trip_preserves_multi_line_summary() {
        let dir = tempfile::tempdir().unwrap();
        let logger = DurableLogger::new(dir.path().join("low_stock.log"));
        let mut original = entry(
            "restock-low-stock: remote application error: HTTP 400: line one\nline two",
        );
        original.item_lines = vec!["<html>\r\n<body>".to_string()];

        logger.append(&original).unwrap();
        logger.append(&entry("next run")).unwrap();

        let entries = logger.read_entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].summary, original.summary);
        assert_eq!(entries[0].item_lines, original.item_lines);
        assert_eq!(entries[1].summary, "next run");
    }

    #[test]
    fn test_read_entries_skips_lines_from_other_writers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crm_heartbeat_log.txt");
        fs::write(&path, "08/05/2024-09:00:00 CRM is alive\n").unwrap();

        let logger = DurableLogger::new(&path);
        logger.append(&entry("CRM is alive; GraphQL hello response: ok")).unwrap();

        let entries = logger.read_entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].summary, "CRM is alive; GraphQL hello response: ok");
    }

    #[test]
    fn test_json_lines_round_trip_preserves_entry() {
        let dir = tempfile::tempdir().unwrap();
        let logger =
            DurableLogger::new(dir.path().join("report.jsonl")).with_format(LogFormat::JsonLines);
        let mut original = entry("Report: 5 customers, 3 orders, 30.50 revenue");
        original.item_lines = vec!["revenue = 30.50".to_string()];

        logger.append(&original).unwrap();

        assert_eq!(logger.read_entries().unwrap(), vec![original]);
    }

    #[test]
    fn test_concurrent_appends_do_not_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Arc::new(DurableLogger::new(dir.path().join("shared.log")));

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let logger = Arc::clone(&logger);
                std::thread::spawn(move || {
                    for n in 0..25 {
                        let mut e = entry(&format!("worker {} entry {}", worker, n));
                        e.item_lines = vec![format!("item of worker {} entry {}", worker, n)];
                        logger.append(&e).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let entries = logger.read_entries().unwrap();
        assert_eq!(entries.len(), 200);
        for e in entries {
            let suffix = e.summary.trim_start_matches("worker ");
            assert_eq!(e.item_lines, vec![format!("item of worker {}", suffix)]);
        }
    }
}
