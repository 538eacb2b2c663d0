//! Runner configuration
//!
//! Defines the remote endpoint, retry/timeout policy and log destinations
//! for job runs. Values come from defaults, then the environment; the CLI
//! may override individual fields afterwards.

use crmsync_client::RetryPolicy;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::jobs::JobKind;
use crate::sink::LogFormat;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000/graphql";

/// Errors found while loading or validating configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var}='{value}' is invalid: {reason}")]
    InvalidVar {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Invalid(String),
}

/// Log destination for each job family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destinations {
    pub heartbeat: PathBuf,
    pub low_stock: PathBuf,
    pub order_reminders: PathBuf,
    pub report: PathBuf,
}

impl Default for Destinations {
    fn default() -> Self {
        Self {
            heartbeat: PathBuf::from("/tmp/crm_heartbeat_log.txt"),
            low_stock: PathBuf::from("/tmp/low_stock_updates_log.txt"),
            order_reminders: PathBuf::from("/tmp/order_reminders_log.txt"),
            report: PathBuf::from("/tmp/crm_report_log.txt"),
        }
    }
}

/// Runner configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// GraphQL endpoint URL
    pub endpoint: String,

    /// Whether server certificates are verified
    pub verify_tls: bool,

    /// Fetch and cache the remote schema to flag unknown fields
    pub introspect: bool,

    /// Timeout for each attempt of each operation
    pub timeout: Duration,

    /// Total attempts per operation
    pub max_retries: u32,

    /// Bound on a whole run; derived from the retry policy when unset
    pub run_budget: Option<Duration>,

    /// Layout of every destination
    pub log_format: LogFormat,

    pub destinations: Destinations,
}

impl Config {
    /// Creates a configuration with defaults for everything but the endpoint
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            verify_tls: true,
            introspect: false,
            timeout: Duration::from_secs(5),
            max_retries: 3,
            run_budget: None,
            log_format: LogFormat::Text,
            destinations: Destinations::default(),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Recognized environment variables (all optional):
    /// - CRMSYNC_GRAPHQL_URL (default: http://localhost:8000/graphql)
    /// - CRMSYNC_TIMEOUT_SECS (default: 5)
    /// - CRMSYNC_MAX_RETRIES (default: 3)
    /// - CRMSYNC_INSECURE_SKIP_TLS_VERIFY (default: false)
    /// - CRMSYNC_INTROSPECT (default: false)
    /// - CRMSYNC_RUN_BUDGET_SECS (default: derived)
    /// - CRMSYNC_LOG_FORMAT (text or json, default: text)
    /// - CRMSYNC_HEARTBEAT_LOG, CRMSYNC_LOW_STOCK_LOG,
    ///   CRMSYNC_ORDER_REMINDERS_LOG, CRMSYNC_REPORT_LOG
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new(
            lookup("CRMSYNC_GRAPHQL_URL").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
        );

        if let Some(secs) = parse_var(&lookup, "CRMSYNC_TIMEOUT_SECS", parse_u64)? {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = parse_var(&lookup, "CRMSYNC_MAX_RETRIES", |s| {
            s.parse::<u32>().map_err(|e| e.to_string())
        })? {
            config.max_retries = retries;
        }
        if let Some(insecure) = parse_var(&lookup, "CRMSYNC_INSECURE_SKIP_TLS_VERIFY", parse_bool)? {
            config.verify_tls = !insecure;
        }
        if let Some(introspect) = parse_var(&lookup, "CRMSYNC_INTROSPECT", parse_bool)? {
            config.introspect = introspect;
        }
        if let Some(secs) = parse_var(&lookup, "CRMSYNC_RUN_BUDGET_SECS", parse_u64)? {
            config.run_budget = Some(Duration::from_secs(secs));
        }
        if let Some(format) = parse_var(&lookup, "CRMSYNC_LOG_FORMAT", |s| s.parse::<LogFormat>())? {
            config.log_format = format;
        }

        let destinations = &mut config.destinations;
        for (var, slot) in [
            ("CRMSYNC_HEARTBEAT_LOG", &mut destinations.heartbeat),
            ("CRMSYNC_LOW_STOCK_LOG", &mut destinations.low_stock),
            ("CRMSYNC_ORDER_REMINDERS_LOG", &mut destinations.order_reminders),
            ("CRMSYNC_REPORT_LOG", &mut destinations.report),
        ] {
            if let Some(path) = lookup(var).filter(|p| !p.is_empty()) {
                *slot = PathBuf::from(path);
            }
        }

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.is_empty() {
            return Err(ConfigError::Invalid("endpoint cannot be empty".to_string()));
        }

        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(ConfigError::Invalid(
                "endpoint must start with http:// or https://".to_string(),
            ));
        }

        if self.timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "timeout must be greater than 0".to_string(),
            ));
        }

        if self.run_budget.is_some_and(|budget| budget.is_zero()) {
            return Err(ConfigError::Invalid(
                "run budget must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Retry policy applied to every remote operation
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.timeout, self.max_retries)
    }

    /// Log destination for a job family
    pub fn destination(&self, kind: JobKind) -> &Path {
        match kind {
            JobKind::Heartbeat => &self.destinations.heartbeat,
            JobKind::LowStockRestock => &self.destinations.low_stock,
            JobKind::OrderReminders => &self.destinations.order_reminders,
            JobKind::UsageReport => &self.destinations.report,
        }
    }

    /// Replaces the log destination for a job family
    pub fn with_destination(mut self, kind: JobKind, path: impl Into<PathBuf>) -> Self {
        let slot = match kind {
            JobKind::Heartbeat => &mut self.destinations.heartbeat,
            JobKind::LowStockRestock => &mut self.destinations.low_stock,
            JobKind::OrderReminders => &mut self.destinations.order_reminders,
            JobKind::UsageReport => &mut self.destinations.report,
        };
        *slot = path.into();
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

fn parse_var<F, T, P>(lookup: &F, var: &'static str, parse: P) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Result<T, String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => parse(value.trim())
            .map(Some)
            .map_err(|reason| ConfigError::InvalidVar { var, value, reason }),
    }
}

fn parse_u64(s: &str) -> Result<u64, String> {
    s.parse::<u64>().map_err(|e| e.to_string())
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(format!("expected true or false, got '{}'", other)),
    }
}
