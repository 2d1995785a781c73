//! Hard-ceiling consumption counters.
//!
//! Three independent counters (hourly, daily, weekly) gate interaction
//! volume regardless of what the weekly plan says. Each has its own reset
//! boundary evaluated in the configured timezone: an elapsed hour, a
//! calendar date change, and a Monday crossing into a new ISO week.

use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, Utc, Weekday};
use serde::Serialize;
use serde_json::Value;

use crate::config::LimitsConfig;

/// Consumption counts plus the last reset boundary for each window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageCounters {
    pub daily_count: u32,
    pub weekly_count: u32,
    pub hourly_count: u32,
    pub hourly_reset_time: DateTime<Utc>,
    pub daily_reset_date: NaiveDate,
    pub weekly_reset_date: NaiveDate,
}

impl UsageCounters {
    /// Fresh counters anchored at the given instant.
    pub fn new(now: DateTime<Utc>, today: NaiveDate) -> Self {
        Self {
            daily_count: 0,
            weekly_count: 0,
            hourly_count: 0,
            hourly_reset_time: now,
            daily_reset_date: today,
            weekly_reset_date: today,
        }
    }

    /// Defensive decode from the persisted `counters` object. Malformed
    /// fields fall back to the given anchors with a warning.
    pub fn from_value(value: &Value, now: DateTime<Utc>, today: NaiveDate) -> Self {
        let mut counters = Self::new(now, today);
        counters.daily_count = value.get("daily_count").and_then(Value::as_u64).unwrap_or(0) as u32;
        counters.weekly_count = value.get("weekly_count").and_then(Value::as_u64).unwrap_or(0) as u32;
        counters.hourly_count = value.get("hourly_count").and_then(Value::as_u64).unwrap_or(0) as u32;
        if let Some(raw) = value.get("hourly_reset_time").and_then(Value::as_str) {
            match DateTime::parse_from_rfc3339(raw) {
                Ok(dt) => counters.hourly_reset_time = dt.with_timezone(&Utc),
                Err(_) => tracing::warn!(value = raw, "invalid hourly_reset_time, using now"),
            }
        }
        if let Some(raw) = value.get("daily_reset_date").and_then(Value::as_str) {
            match raw.parse::<NaiveDate>() {
                Ok(date) => counters.daily_reset_date = date,
                Err(_) => tracing::warn!(value = raw, "invalid daily_reset_date, using today"),
            }
        }
        if let Some(raw) = value.get("weekly_reset_date").and_then(Value::as_str) {
            match raw.parse::<NaiveDate>() {
                Ok(date) => counters.weekly_reset_date = date,
                Err(_) => tracing::warn!(value = raw, "invalid weekly_reset_date, using today"),
            }
        }
        counters
    }

    /// Reset any counter whose boundary has been crossed. `today` is the
    /// calendar date in the scheduling timezone.
    pub fn maybe_reset(&mut self, now: DateTime<Utc>, today: NaiveDate) {
        if now - self.hourly_reset_time >= TimeDelta::hours(1) {
            self.hourly_count = 0;
            self.hourly_reset_time = now;
            tracing::debug!("hourly counter reset");
        }
        if today > self.daily_reset_date {
            self.daily_count = 0;
            self.daily_reset_date = today;
            tracing::info!("daily counter reset");
        }
        if today.weekday() == Weekday::Mon && today > self.weekly_reset_date {
            self.weekly_count = 0;
            self.weekly_reset_date = today;
            tracing::info!("weekly counter reset");
        }
    }

    /// Evaluate the ceilings in order hourly, daily, weekly; the first
    /// violation names itself. Call `maybe_reset` first.
    pub fn check(&self, limits: &LimitsConfig) -> (bool, String) {
        if self.hourly_count >= limits.hourly {
            return (false, format!("hourly_limit ({}/{})", self.hourly_count, limits.hourly));
        }
        if self.daily_count >= limits.daily {
            return (false, format!("daily_limit ({}/{})", self.daily_count, limits.daily));
        }
        if self.weekly_count >= limits.weekly {
            return (false, format!("weekly_limit ({}/{})", self.weekly_count, limits.weekly));
        }
        (true, "ok".to_string())
    }

    /// Record `amount` consumed interactions against all three windows.
    pub fn consume(&mut self, amount: u32) {
        self.daily_count += amount;
        self.weekly_count += amount;
        self.hourly_count += amount;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchors() -> (DateTime<Utc>, NaiveDate) {
        let now: DateTime<Utc> = "2025-03-10T12:00:00Z".parse().unwrap();
        (now, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap())
    }

    #[test]
    fn test_fresh_counters_allow() {
        let (now, today) = anchors();
        let counters = UsageCounters::new(now, today);
        let (allowed, reason) = counters.check(&LimitsConfig::default());
        assert!(allowed);
        assert_eq!(reason, "ok");
    }

    #[test]
    fn test_consume_increments_all_windows() {
        let (now, today) = anchors();
        let mut counters = UsageCounters::new(now, today);
        counters.consume(2);
        counters.consume(1);
        assert_eq!(counters.hourly_count, 3);
        assert_eq!(counters.daily_count, 3);
        assert_eq!(counters.weekly_count, 3);
    }

    #[test]
    fn test_check_order_hourly_first() {
        let (now, today) = anchors();
        let limits = LimitsConfig::default();
        let mut counters = UsageCounters::new(now, today);
        counters.hourly_count = limits.hourly;
        counters.daily_count = limits.daily;
        counters.weekly_count = limits.weekly;
        let (allowed, reason) = counters.check(&limits);
        assert!(!allowed);
        assert_eq!(reason, "hourly_limit (5/5)");
    }

    #[test]
    fn test_check_daily_then_weekly() {
        let (now, today) = anchors();
        let limits = LimitsConfig::default();
        let mut counters = UsageCounters::new(now, today);
        counters.daily_count = limits.daily;
        counters.weekly_count = limits.weekly;
        let (_, reason) = counters.check(&limits);
        assert_eq!(reason, "daily_limit (20/20)");

        counters.daily_count = 0;
        let (_, reason) = counters.check(&limits);
        assert_eq!(reason, "weekly_limit (80/80)");
    }

    #[test]
    fn test_hourly_resets_after_an_hour() {
        let (now, today) = anchors();
        let mut counters = UsageCounters::new(now, today);
        counters.consume(5);

        counters.maybe_reset(now + TimeDelta::minutes(59), today);
        assert_eq!(counters.hourly_count, 5);

        counters.maybe_reset(now + TimeDelta::hours(1), today);
        assert_eq!(counters.hourly_count, 0);
        // Daily and weekly untouched by the hourly boundary.
        assert_eq!(counters.daily_count, 5);
        assert_eq!(counters.weekly_count, 5);
    }

    #[test]
    fn test_daily_resets_on_date_advance() {
        let (now, today) = anchors();
        let mut counters = UsageCounters::new(now, today);
        counters.consume(4);

        counters.maybe_reset(now, today);
        assert_eq!(counters.daily_count, 4);

        let tomorrow = today.succ_opt().unwrap();
        counters.maybe_reset(now + TimeDelta::days(1), tomorrow);
        assert_eq!(counters.daily_count, 0);
        assert_eq!(counters.daily_reset_date, tomorrow);
    }

    #[test]
    fn test_weekly_resets_only_on_new_monday() {
        let (now, today) = anchors();
        assert_eq!(today.weekday(), Weekday::Mon);
        let mut counters = UsageCounters::new(now, today);
        counters.consume(10);

        // Mid-week days never reset the weekly window.
        let wednesday = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
        counters.maybe_reset(now + TimeDelta::days(2), wednesday);
        assert_eq!(counters.weekly_count, 10);

        // The anchor Monday itself is not a new week.
        counters.maybe_reset(now, today);
        assert_eq!(counters.weekly_count, 10);

        let next_monday = NaiveDate::from_ymd_opt(2025, 3, 17).unwrap();
        counters.maybe_reset(now + TimeDelta::days(7), next_monday);
        assert_eq!(counters.weekly_count, 0);
        assert_eq!(counters.weekly_reset_date, next_monday);
    }

    #[test]
    fn test_from_value_roundtrip() {
        let (now, today) = anchors();
        let mut counters = UsageCounters::new(now, today);
        counters.consume(3);
        let json = serde_json::to_value(&counters).unwrap();
        let back = UsageCounters::from_value(&json, now + TimeDelta::hours(5), today.succ_opt().unwrap());
        assert_eq!(back, counters);
    }

    #[test]
    fn test_from_value_bad_fields_fall_back() {
        let (now, today) = anchors();
        let json = serde_json::json!({
            "daily_count": 2,
            "hourly_reset_time": "yesterday-ish",
            "daily_reset_date": 17,
            "weekly_reset_date": "not a date"
        });
        let counters = UsageCounters::from_value(&json, now, today);
        assert_eq!(counters.daily_count, 2);
        assert_eq!(counters.weekly_count, 0);
        assert_eq!(counters.hourly_reset_time, now);
        assert_eq!(counters.daily_reset_date, today);
        assert_eq!(counters.weekly_reset_date, today);
    }
}
