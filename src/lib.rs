//! cadence - a stochastic engagement scheduler
//!
//! cadence decides which tracked profiles receive a bounded daily/weekly
//! quota of automated interactions and at what time of day. Hard rate
//! ceilings are never exceeded, every profile is revisited within a bounded
//! horizon, and the resulting activity rhythm is irregular enough to
//! resemble a human rather than a cron job.

pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod scheduler;
pub mod sources;
pub mod store;

pub use error::{CadenceError, Result};
