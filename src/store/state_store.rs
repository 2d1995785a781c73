//! Single-document JSON persistence for schedule state.
//!
//! The whole scheduler state (counters plus the optional weekly plan)
//! lives in one JSON file, rewritten after every mutation so a crash loses
//! at most the delta since the last write. The store assumes a single
//! writer; concurrent processes over the same file are unsupported.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::domain::WeeklyPlan;
use crate::error::{CadenceError, Result};
use crate::scheduler::UsageCounters;

/// The persisted document: counters, a save stamp, and the plan when one
/// exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleState {
    pub counters: UsageCounters,
    pub saved_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<WeeklyPlan>,
}

impl ScheduleState {
    pub fn fresh(now: DateTime<Utc>, today: NaiveDate) -> Self {
        Self {
            counters: UsageCounters::new(now, today),
            saved_at: now,
            plan: None,
        }
    }
}

/// Loads and write-through-saves the schedule state file.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load persisted state. A missing file yields fresh state; a malformed
    /// file is logged and replaced by fresh state rather than aborting.
    /// Individual malformed fields inside an otherwise readable document
    /// fall back per field.
    pub fn load(&self, now: DateTime<Utc>, today: NaiveDate) -> ScheduleState {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "no schedule state file yet");
            return ScheduleState::fresh(now, today);
        }
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to read schedule state");
                return ScheduleState::fresh(now, today);
            }
        };
        let value: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "schedule state is not valid JSON");
                return ScheduleState::fresh(now, today);
            }
        };

        let counters = match value.get("counters") {
            Some(section) => UsageCounters::from_value(section, now, today),
            None => UsageCounters::new(now, today),
        };
        let saved_at = value
            .get("saved_at")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(now);
        let plan = value
            .get("plan")
            .filter(|p| !p.is_null())
            .map(|p| WeeklyPlan::from_value(p, today));

        ScheduleState {
            counters,
            saved_at,
            plan,
        }
    }

    /// Write the full state document, creating parent directories as
    /// needed.
    pub fn save(&self, state: &ScheduleState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CadenceError::Storage(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }
        let body = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, body)
            .map_err(|e| CadenceError::Storage(format!("failed to write {}: {}", self.path.display(), e)))?;
        Ok(())
    }
}
