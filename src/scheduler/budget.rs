//! Weekly budget sampling.
//!
//! Seven truncated-Gaussian draws are rescaled toward the weekly target,
//! drift-repaired in ±1 steps, then optionally bumped by independent
//! high/low burst days so the week never looks metronomic.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::config::BudgetConfig;

/// Lower band for the pre-burst weekly sum; raw sums under this are scaled
/// up toward `min(target, WEEKLY_LOWER_BAND)`.
pub const WEEKLY_LOWER_BAND: i64 = 70;

/// Sample one interaction quota per day for a calendar week.
///
/// Always returns exactly 7 values, each within
/// `[daily_min, daily_max]`. The pre-burst sum tracks `weekly_target`; the
/// bursts may push the final sum off target by up to their combined
/// magnitude.
pub fn sample_weekly_budgets<R: Rng>(config: &BudgetConfig, rng: &mut R) -> [i64; 7] {
    let lo = config.daily_min;
    let hi = config.daily_max;
    let target = config.weekly_target;

    let mut budgets = [0i64; 7];
    for slot in budgets.iter_mut() {
        let draw = gauss(rng, config.daily_mean, config.daily_std);
        *slot = (draw.round() as i64).clamp(lo, hi);
    }

    let total: i64 = budgets.iter().sum();
    if total > target {
        let scale = target as f64 / total as f64;
        for slot in budgets.iter_mut() {
            *slot = ((*slot as f64 * scale).round() as i64).clamp(lo, hi);
        }
    } else if total < WEEKLY_LOWER_BAND {
        let scale = target.min(WEEKLY_LOWER_BAND) as f64 / total.max(1) as f64;
        for slot in budgets.iter_mut() {
            *slot = ((*slot as f64 * scale).round() as i64).clamp(lo, hi);
        }
    }

    repair_drift(&mut budgets, target, lo, hi, rng);
    apply_bursts(&mut budgets, config, rng);
    budgets
}

/// Nudge random days by ±1 until the total hits the target or the per-day
/// bounds leave no room to move.
fn repair_drift<R: Rng>(budgets: &mut [i64; 7], target: i64, lo: i64, hi: i64, rng: &mut R) {
    let mut diff = target - budgets.iter().sum::<i64>();
    loop {
        if diff == 0 {
            return;
        }
        let mut indices: Vec<usize> = (0..7).collect();
        indices.shuffle(rng);
        let mut progressed = false;
        for i in indices {
            if diff == 0 {
                break;
            }
            let old = budgets[i];
            let new = (old + diff.signum()).clamp(lo, hi);
            if new != old {
                budgets[i] = new;
                diff -= new - old;
                progressed = true;
            }
        }
        if !progressed {
            tracing::debug!(remaining = diff, "budget repair stuck at bounds");
            return;
        }
    }
}

/// At most one upward and one downward burst, each gated by its own
/// probability draw. When both fire they hit different days.
fn apply_bursts<R: Rng>(budgets: &mut [i64; 7], config: &BudgetConfig, rng: &mut R) {
    let mut burst_idx = None;
    if rng.random::<f64>() < config.burst_probability {
        let idx = rng.random_range(0..7);
        let extra = rng.random_range(config.burst_extra_min..=config.burst_extra_max);
        budgets[idx] = (budgets[idx] + extra).min(config.daily_max);
        burst_idx = Some(idx);
    }
    if rng.random::<f64>() < config.burst_probability {
        let mut idx = rng.random_range(0..7);
        if Some(idx) == burst_idx {
            idx = (idx + 1) % 7;
        }
        let extra = rng.random_range(config.burst_extra_min..=config.burst_extra_max);
        budgets[idx] = (budgets[idx] - extra).max(config.daily_min);
    }
}

/// Box-Muller transform over two uniform draws; the pack carries `rand`
/// without a separate distributions crate.
fn gauss<R: Rng>(rng: &mut R, mean: f64, std: f64) -> f64 {
    let u1 = rng.random::<f64>().max(f64::MIN_POSITIVE);
    let u2 = rng.random::<f64>();
    mean + std * (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}
