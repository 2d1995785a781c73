//! Day-level candidate selection.
//!
//! Forced entries (overdue past the threshold) are included
//! unconditionally up to a per-day cap; the rest of the budget is filled
//! by weighted random sampling without replacement from a truncated
//! top-of-ranking pool. A day's selection never repeats anyone touched
//! the previous day.

use std::collections::HashSet;

use rand::Rng;

use crate::config::{PriorityConfig, SelectionConfig};
use crate::domain::ScoredProfile;

/// Floor applied to sampling weights so a zero-scored profile still has a
/// nonzero chance of selection.
const WEIGHT_FLOOR: f64 = 0.01;

/// Pick one day's candidates from the score-ranked profile list.
///
/// `excluded` is the set of ids touched the previous day. The result never
/// exceeds `budget` entries and its order carries no meaning; times are
/// assigned later.
pub fn select_for_day<R: Rng>(
    ranked: &[ScoredProfile],
    budget: i64,
    excluded: &HashSet<String>,
    priority: &PriorityConfig,
    selection: &SelectionConfig,
    rng: &mut R,
) -> Vec<ScoredProfile> {
    if budget <= 0 {
        return vec![];
    }
    let budget = budget as usize;
    let pool_size = ranked.len().min(budget.saturating_mul(selection.pool_multiplier));

    let eligible: Vec<&ScoredProfile> = ranked.iter().filter(|p| !excluded.contains(&p.id)).collect();
    if eligible.is_empty() {
        tracing::warn!("no eligible profiles after previous-day exclusion");
        return vec![];
    }

    let pool = &eligible[..pool_size.min(eligible.len())];
    if pool.is_empty() {
        return vec![];
    }

    let mut selected: Vec<ScoredProfile> = pool
        .iter()
        .filter(|p| p.forced)
        .take(priority.force_max_per_day)
        .map(|p| (*p).clone())
        .collect();
    let forced_ids: HashSet<&str> = selected.iter().map(|p| p.id.as_str()).collect();

    if selected.len() >= budget {
        selected.truncate(budget);
        return selected;
    }

    let mut remainder: Vec<ScoredProfile> = pool
        .iter()
        .filter(|p| !forced_ids.contains(p.id.as_str()))
        .map(|p| (*p).clone())
        .collect();

    let slots_left = budget - selected.len();
    selected.extend(weighted_sample(&mut remainder, slots_left, rng));
    selected.truncate(budget);
    selected
}

/// Weighted sampling without replacement: draw up to `k` entries, weight
/// `max(0.01, score)`, removing each winner before the next draw.
fn weighted_sample<R: Rng>(pool: &mut Vec<ScoredProfile>, k: usize, rng: &mut R) -> Vec<ScoredProfile> {
    let mut picked = Vec::with_capacity(k.min(pool.len()));
    while picked.len() < k && !pool.is_empty() {
        let total: f64 = pool.iter().map(|p| weight(p)).sum();
        let mut roll = rng.random::<f64>() * total;
        let mut winner = pool.len() - 1;
        for (i, p) in pool.iter().enumerate() {
            roll -= weight(p);
            if roll <= 0.0 {
                winner = i;
                break;
            }
        }
        picked.push(pool.swap_remove(winner));
    }
    picked
}

fn weight(p: &ScoredProfile) -> f64 {
    p.priority_score.max(WEIGHT_FLOOR)
}
