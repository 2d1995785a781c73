//! Profile records as seen by the scheduler.
//!
//! `ProfileState` is the explicit schema for the loosely-shaped rows the
//! external tracker hands back: the id and status are required, everything
//! else is optional with its default stated here rather than at each call
//! site. The scheduler never mutates these records.

use serde::{Deserialize, Serialize};

/// A profile as listed by the profile source: identifier plus display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Tracked per-profile state owned by the external state source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileState {
    /// Stable identifier (URL or key) for the profile.
    pub id: String,
    /// Display name; may be empty, back-filled from the profile list.
    #[serde(default)]
    pub name: String,
    /// Raw last-interaction timestamp text. May be absent or unparseable;
    /// the scorer maps both cases to the overdue sentinel.
    #[serde(default)]
    pub last_engaged: Option<String>,
    /// Activity status; only `"active"` (case-insensitive) is scheduled.
    #[serde(default = "default_status")]
    pub status: String,
    /// Consecutive times the profile yielded nothing to interact with.
    #[serde(default)]
    pub consecutive_skips: u32,
}

fn default_status() -> String {
    "active".to_string()
}

impl ProfileState {
    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case("active")
    }
}

/// A profile after one scoring pass. Rebuilt fresh every pass, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredProfile {
    pub id: String,
    pub name: String,
    pub priority_score: f64,
    /// Whole days since the last interaction; 999.0 when unknown.
    pub days_since_last: f64,
    /// Overdue past the force threshold: selection must include this profile.
    pub forced: bool,
}
