//! The weekly plan: seven daily slots of scheduled engagements.
//!
//! Plans serialize into a single nested document (week metadata, then a
//! mapping of ISO date to slot to ordered engagements). Decoding is
//! defensive: malformed fields fall back to documented defaults and a
//! malformed day entry is skipped, so one bad record never discards the
//! rest of the plan.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::domain::engagement::{EngagementStatus, ScheduledEngagement};

/// One calendar day of the plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySlot {
    /// Carried by the plan's map key, not serialized inside the slot.
    #[serde(skip)]
    pub date: NaiveDate,
    pub budget: i64,
    pub is_burst_day: bool,
    /// Count of engagements that transitioned to `done`.
    pub completed: i64,
    pub engagements: Vec<ScheduledEngagement>,
}

impl DailySlot {
    /// Defensive decode of one slot keyed by `date_str`. An unparseable key
    /// falls back to `today`.
    pub fn from_value(date_str: &str, value: &Value, today: NaiveDate) -> Self {
        let date = date_str.parse::<NaiveDate>().unwrap_or_else(|_| {
            tracing::warn!(value = date_str, "invalid slot date, using today");
            today
        });
        let engagements = value
            .get("engagements")
            .and_then(Value::as_array)
            .map(|entries| entries.iter().map(ScheduledEngagement::from_value).collect())
            .unwrap_or_default();
        Self {
            date,
            budget: value.get("budget").and_then(Value::as_i64).unwrap_or(0),
            is_burst_day: value.get("is_burst_day").and_then(Value::as_bool).unwrap_or(false),
            completed: value.get("completed").and_then(Value::as_i64).unwrap_or(0),
            engagements,
        }
    }

    /// Pending engagements sorted by scheduled time.
    pub fn pending(&self) -> Vec<ScheduledEngagement> {
        let mut pending: Vec<ScheduledEngagement> = self
            .engagements
            .iter()
            .filter(|e| e.status == EngagementStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|e| e.scheduled_time);
        pending
    }
}

/// A full week of daily slots, keyed by ISO date string.
///
/// Created once per ISO calendar week; superseded whole when a new week
/// begins or today's date is missing, never merged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyPlan {
    pub week_start: NaiveDate,
    pub week_number: u32,
    /// Sum of the daily budgets at creation time.
    pub total_budget: i64,
    pub created_at: DateTime<Utc>,
    pub days: BTreeMap<String, DailySlot>,
}

impl WeeklyPlan {
    /// Defensive decode of a persisted plan. Field fallbacks keep the load
    /// alive; a plan whose dates cannot be trusted is simply regenerated on
    /// the next queue pull because its week will not match.
    pub fn from_value(value: &Value, today: NaiveDate) -> Self {
        let week_start = value
            .get("week_start")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<NaiveDate>().ok())
            .unwrap_or_else(|| {
                tracing::warn!("invalid week_start in persisted plan, using today");
                today
            });
        let created_at = value
            .get("created_at")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| {
                tracing::warn!("invalid created_at in persisted plan, using now");
                Utc::now()
            });
        let mut days = BTreeMap::new();
        if let Some(entries) = value.get("days").and_then(Value::as_object) {
            for (date_str, slot_value) in entries {
                if !slot_value.is_object() {
                    tracing::warn!(date = %date_str, "malformed daily slot, skipping");
                    continue;
                }
                days.insert(date_str.clone(), DailySlot::from_value(date_str, slot_value, today));
            }
        }
        Self {
            week_start,
            week_number: value.get("week_number").and_then(Value::as_u64).unwrap_or(0) as u32,
            total_budget: value.get("total_budget").and_then(Value::as_i64).unwrap_or(0),
            created_at,
            days,
        }
    }

    /// Look up the slot for a calendar date, if planned.
    pub fn slot_for(&self, date: NaiveDate) -> Option<&DailySlot> {
        self.days.get(&date.to_string())
    }

    pub fn slot_for_mut(&mut self, date: NaiveDate) -> Option<&mut DailySlot> {
        self.days.get_mut(&date.to_string())
    }

    /// Total `done` transitions across the week.
    pub fn total_completed(&self) -> i64 {
        self.days.values().map(|slot| slot.completed).sum()
    }
}
