//! Command-line overrides
//!
//! Flags layered on top of `Config::from_env()`.

use anyhow::{Context, Result};
use clap::Args;
use crmsync_runner::{Config, LogFormat};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Flags that override environment configuration
#[derive(Args, Debug, Default)]
pub struct Overrides {
    /// GraphQL endpoint URL [env: CRMSYNC_GRAPHQL_URL]
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Timeout per attempt, in seconds [env: CRMSYNC_TIMEOUT_SECS]
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Total attempts per operation [env: CRMSYNC_MAX_RETRIES]
    #[arg(long, global = true)]
    pub max_retries: Option<u32>,

    /// Skip TLS certificate verification [env: CRMSYNC_INSECURE_SKIP_TLS_VERIFY]
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Check operations against the remote schema [env: CRMSYNC_INTROSPECT]
    #[arg(long, global = true)]
    pub introspect: bool,

    /// Log record layout: text or json [env: CRMSYNC_LOG_FORMAT]
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Append outcomes to this file instead of the per-job destination
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

impl Overrides {
    /// Loads configuration from the environment and applies the flags
    pub fn load(&self) -> Result<Config> {
        let config = Config::from_env().context("Failed to read configuration from environment")?;
        let config = self.apply(config);
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Applies the flags that were given to `config`
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = self.max_retries {
            config.max_retries = retries;
        }
        if self.insecure {
            config.verify_tls = false;
        }
        if self.introspect {
            config.introspect = true;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        if let Some(path) = &self.log_file {
            for kind in crmsync_runner::JobKind::ALL {
                config = config.with_destination(kind, path.clone());
            }
        }
        if !config.verify_tls {
            warn!("TLS certificate verification is disabled for {}", config.endpoint);
        }
        config
    }
}
