//! Record layouts for log destinations
//!
//! Text records are one header line followed by one indented line per
//! item:
//!
//! ```text
//! 2024-05-08T09:00:00Z [low-stock-restock] SUCCESS 2 products restocked
//!     - Phone: new stock = 20
//!     - Laptop: new stock = 15
//! ```
//!
//! JSON-lines records are one serialized `LogEntry` per line.

use chrono::{DateTime, SecondsFormat, Utc};
use crmsync_core::domain::log::LogEntry;
use std::str::FromStr;
use tracing::debug;

use super::SinkError;

const ITEM_PREFIX: &str = "    - ";

/// How entries are laid out in a destination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    JsonLines,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" | "jsonl" | "json-lines" => Ok(LogFormat::JsonLines),
            other => Err(format!("unknown log format '{}' (expected text or json)", other)),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::JsonLines => write!(f, "json"),
        }
    }
}

/// Escapes record separators so a field stays on one line
///
/// Backslash, line feed and carriage return become `\\`, `\n` and `\r`.
/// `unescape` reverses it exactly.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Renders one complete record, including its trailing newline
pub fn render(entry: &LogEntry, format: LogFormat) -> Result<String, SinkError> {
    match format {
        LogFormat::Text => {
            let mut record = format!(
                "{} [{}] {} {}\n",
                entry.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true),
                escape(&entry.job_name),
                entry.status,
                escape(&entry.summary)
            );
            for line in &entry.item_lines {
                record.push_str(ITEM_PREFIX);
                record.push_str(&escape(line));
                record.push('\n');
            }
            Ok(record)
        }
        LogFormat::JsonLines => {
            let mut record = serde_json::to_string(entry)?;
            record.push('\n');
            Ok(record)
        }
    }
}

/// Parses every record in a destination's contents
///
/// Lines that are not part of a record (for example lines written by
/// other tools into the same file) are skipped.
pub fn parse(contents: &str, format: LogFormat) -> Vec<LogEntry> {
    match format {
        LogFormat::Text => parse_text(contents),
        LogFormat::JsonLines => contents
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(idx, line)| match serde_json::from_str(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!("Skipping line {}: {}", idx + 1, e);
                    None
                }
            })
            .collect(),
    }
}

fn parse_text(contents: &str) -> Vec<LogEntry> {
    let mut entries: Vec<LogEntry> = Vec::new();
    // Items belong to the header directly above them, if it parsed
    let mut in_record = false;

    for (idx, line) in contents.lines().enumerate() {
        if line.is_empty() {
            continue;
        }

        if let Some(item) = line.strip_prefix(ITEM_PREFIX) {
            match entries.last_mut() {
                Some(entry) if in_record => entry.item_lines.push(unescape(item)),
                _ => debug!("Skipping line {}: item outside a record", idx + 1),
            }
            continue;
        }

        match parse_header(line) {
            Ok(entry) => {
                entries.push(entry);
                in_record = true;
            }
            Err(reason) => {
                debug!("Skipping line {}: {}", idx + 1, reason);
                in_record = false;
            }
        }
    }

    entries
}

fn parse_header(line: &str) -> Result<LogEntry, String> {
    let (timestamp, rest) = line
        .split_once(' ')
        .ok_or_else(|| "missing timestamp".to_string())?;
    let timestamp = DateTime::parse_from_rfc3339(timestamp)
        .map_err(|e| format!("bad timestamp '{}': {}", timestamp, e))?
        .with_timezone(&Utc);

    let rest = rest
        .strip_prefix('[')
        .ok_or_else(|| "missing job name".to_string())?;
    let (job_name, rest) = rest
        .split_once("] ")
        .ok_or_else(|| "unterminated job name".to_string())?;

    let (status, summary) = rest.split_once(' ').unwrap_or((rest, ""));

    Ok(LogEntry {
        timestamp,
        job_name: unescape(job_name),
        status: status.parse()?,
        summary: unescape(summary),
        item_lines: Vec::new(),
    })
}
