//! crmsync Core
//!
//! Core types shared by the crmsync client and runner.
//!
//! This crate contains:
//! - Domain types: job outcomes and log entries
//! - Remote types: operation descriptors and decoded responses
//! - `Amount`: exact decimal arithmetic for monetary totals

pub mod amount;
pub mod domain;
pub mod remote;

pub use amount::{Amount, AmountError};
