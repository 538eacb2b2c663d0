//! Core domain types
//!
//! These types describe what a job run produced and how it is recorded.
//! They are shared between the runner (which builds them) and anything
//! that reads the logs back.

pub mod job;
pub mod log;
