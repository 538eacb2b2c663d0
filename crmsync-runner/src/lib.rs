//! crmsync runner
//!
//! Runs scheduled sync jobs against the CRM's GraphQL endpoint and records
//! every run in an append-only log. The pieces:
//! - `config`: endpoint, retry policy and log destinations
//! - `jobs`: what each job asks the remote service and how it reads the answer
//! - `runner`: executes a job, containing every failure
//! - `sink`: where outcomes are written

pub mod config;
pub mod jobs;
pub mod runner;
pub mod sink;

pub use config::{Config, ConfigError};
pub use jobs::{JobDefinition, JobKind};
pub use runner::JobRunner;
pub use sink::{DurableLogger, LogFormat, LogSink, SinkError};
