//! Scheduled engagements and their status state machine.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Fallback for an unparseable scheduled time: the operating window start.
pub fn default_scheduled_time() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).expect("valid time")
}

/// Engagement status state machine.
///
/// Starts at `Pending` and transitions exactly once to a terminal value via
/// outcome reporting; a terminal status is never revisited.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EngagementStatus {
    /// Waiting in today's queue
    Pending,
    /// Interaction performed
    Done,
    /// Deliberately passed over
    Skipped,
    /// Attempt errored
    Failed,
    /// Target already carried our reaction
    AlreadyReacted,
    /// Target had nothing to interact with
    NoPosts,
}

impl EngagementStatus {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            EngagementStatus::Pending => "pending",
            EngagementStatus::Done => "done",
            EngagementStatus::Skipped => "skipped",
            EngagementStatus::Failed => "failed",
            EngagementStatus::AlreadyReacted => "already_reacted",
            EngagementStatus::NoPosts => "no_posts",
        }
    }

    /// Parse from the persisted string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(EngagementStatus::Pending),
            "done" => Some(EngagementStatus::Done),
            "skipped" => Some(EngagementStatus::Skipped),
            "failed" => Some(EngagementStatus::Failed),
            "already_reacted" => Some(EngagementStatus::AlreadyReacted),
            "no_posts" => Some(EngagementStatus::NoPosts),
            _ => None,
        }
    }

    /// Check if this status ends the engagement's lifecycle.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, EngagementStatus::Pending)
    }
}

impl std::fmt::Display for EngagementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EngagementStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            format!(
                "unknown status '{}' (expected pending, done, skipped, failed, already_reacted, or no_posts)",
                s
            )
        })
    }
}

/// One planned interaction: who, when, and how it went.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledEngagement {
    pub id: String,
    pub name: String,
    #[serde(serialize_with = "serialize_hhmm")]
    pub scheduled_time: NaiveTime,
    pub priority_score: f64,
    #[serde(rename = "days_since_last_interaction")]
    pub days_since_last: f64,
    pub forced: bool,
    pub status: EngagementStatus,
}

impl ScheduledEngagement {
    /// Defensive decode from a persisted JSON object. Malformed fields fall
    /// back to documented defaults with a warning instead of aborting the
    /// surrounding plan load.
    pub fn from_value(value: &Value) -> Self {
        let scheduled_time = match value.get("scheduled_time").and_then(Value::as_str) {
            Some(raw) => parse_hhmm(raw).unwrap_or_else(|| {
                tracing::warn!(value = raw, "invalid scheduled_time, using window start");
                default_scheduled_time()
            }),
            None => default_scheduled_time(),
        };
        let status = match value.get("status").and_then(Value::as_str) {
            Some(raw) => EngagementStatus::parse(raw).unwrap_or_else(|| {
                tracing::warn!(value = raw, "unknown engagement status, treating as pending");
                EngagementStatus::Pending
            }),
            None => EngagementStatus::Pending,
        };
        Self {
            id: string_field(value, "id"),
            name: string_field(value, "name"),
            scheduled_time,
            priority_score: value.get("priority_score").and_then(Value::as_f64).unwrap_or(0.0),
            days_since_last: value
                .get("days_since_last_interaction")
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
            forced: value.get("forced").and_then(Value::as_bool).unwrap_or(false),
            status,
        }
    }
}

fn string_field(value: &Value, key: &str) -> String {
    value.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

/// Format a time-of-day as "HH:MM".
pub fn format_hhmm(t: NaiveTime) -> String {
    format!("{:02}:{:02}", t.hour(), t.minute())
}

/// Parse "HH:MM" (seconds tolerated and ignored).
pub fn parse_hhmm(s: &str) -> Option<NaiveTime> {
    let mut parts = s.trim().splitn(3, ':');
    let hour: u32 = parts.next()?.parse().ok()?;
    let minute: u32 = match parts.next() {
        Some(m) => m.parse().ok()?,
        None => 0,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn serialize_hhmm<S: Serializer>(t: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_hhmm(*t))
}
