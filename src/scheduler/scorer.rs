//! Coverage-first priority scoring.
//!
//! A profile's score grows linearly with days since its last interaction,
//! capped so that long-overdue profiles compete on the jitter term instead
//! of starving everyone else. No recency bonus.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rand::Rng;

use crate::config::PriorityConfig;
use crate::domain::{ProfileState, ScoredProfile};

/// Sentinel for a missing or unparseable last-interaction date: treated as
/// the most overdue value a profile can have.
pub const DAYS_SINCE_UNKNOWN: f64 = 999.0;

/// Whole days between `today` and the profile's last interaction.
///
/// Accepts a bare date (`2025-03-10`), an RFC 3339 timestamp, or a naive
/// ISO timestamp. This is the single place the unknown-date default is
/// applied.
pub fn days_since_last(raw: Option<&str>, today: NaiveDate) -> f64 {
    let Some(raw) = raw else {
        return DAYS_SINCE_UNKNOWN;
    };
    match parse_date(raw) {
        Some(last) => (today - last).num_days() as f64,
        None => {
            tracing::debug!(value = raw, "unparseable last-interaction date");
            DAYS_SINCE_UNKNOWN
        }
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = raw.parse::<NaiveDate>() {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.date())
}

/// Score one profile: `min(days_since * weight, cap) + uniform(0, jitter)`,
/// floored at zero. Forced when overdue past the threshold.
pub fn score_profile<R: Rng>(
    state: &ProfileState,
    today: NaiveDate,
    config: &PriorityConfig,
    rng: &mut R,
) -> ScoredProfile {
    let days_since = days_since_last(state.last_engaged.as_deref(), today);
    let base = (days_since * config.days_weight).min(config.days_cap).max(0.0);
    let jitter = rng.random::<f64>() * config.jitter_max;
    ScoredProfile {
        id: state.id.clone(),
        name: state.name.clone(),
        priority_score: base + jitter,
        days_since_last: days_since,
        forced: days_since > config.force_threshold_days,
    }
}

/// Score every active profile and rank descending by score.
///
/// Inactive rows and rows without an id are skipped with a log entry; a
/// single bad profile never aborts the batch. The sort is stable, so ties
/// keep their input order.
pub fn score_all<R: Rng>(
    states: &[ProfileState],
    today: NaiveDate,
    config: &PriorityConfig,
    rng: &mut R,
) -> Vec<ScoredProfile> {
    let mut scored: Vec<ScoredProfile> = Vec::with_capacity(states.len());
    for state in states {
        if !state.is_active() {
            continue;
        }
        if state.id.is_empty() {
            tracing::warn!(name = %state.name, "profile row without an id, skipping");
            continue;
        }
        scored.push(score_profile(state, today, config, rng));
    }
    scored.sort_by(|a, b| {
        b.priority_score
            .partial_cmp(&a.priority_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored
}
