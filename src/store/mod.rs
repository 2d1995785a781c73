//! Persistence for the scheduler's plan and counters.

pub mod state_store;

pub use state_store::{ScheduleState, StateStore};
