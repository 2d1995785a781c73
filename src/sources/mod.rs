//! Collaborator interfaces for profile and tracking data.
//!
//! The system of record for profiles lives outside this crate; the
//! scheduler only ever reads through these two traits during plan
//! regeneration. Updating a profile's last-interaction timestamp after an
//! outcome is the collaborator's job, not ours.

pub mod file;

pub use file::FileSource;

use crate::domain::{ProfileRef, ProfileState};
use crate::error::Result;

/// Lists the profiles eligible for scheduling.
pub trait ProfileSource {
    fn list_profiles(&self) -> Result<Vec<ProfileRef>>;
}

/// Owns per-profile tracking state.
pub trait StateSource {
    /// Idempotently seed tracking records for profiles that have none.
    fn initialize_tracking(&self) -> Result<()>;

    /// All tracked per-profile states.
    fn tracked_states(&self) -> Result<Vec<ProfileState>>;
}
