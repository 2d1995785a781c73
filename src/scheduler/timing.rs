//! Intra-day timing via a non-homogeneous Poisson process.
//!
//! Candidate times are drawn uniformly over the operating window and
//! accepted with probability `rate(t) / max_rate` (thinning), where the
//! rate follows a piecewise-constant day shape: slow warmup, busy
//! mid-morning, lunch dip, afternoon peak, wind-down, quiet end of day.
//! Accepted times get independent jitter and a minimum-gap pass so two
//! interactions never land back to back.

use chrono::{NaiveTime, Timelike};
use rand::Rng;

use crate::config::TimingConfig;

/// Fixed segment boundaries (minutes of day) paired with the config rate
/// that applies inside them.
const SEGMENTS: [(i64, i64); 6] = [
    (9 * 60, 10 * 60),  // morning warmup
    (10 * 60, 12 * 60), // mid-morning
    (12 * 60, 13 * 60), // lunch dip
    (13 * 60, 15 * 60), // afternoon peak
    (15 * 60, 17 * 60), // afternoon wind-down
    (17 * 60, 18 * 60), // end of day
];

fn segment_rates(config: &TimingConfig) -> [f64; 6] {
    [
        config.rate_morning_warmup,
        config.rate_mid_morning,
        config.rate_lunch_dip,
        config.rate_afternoon_peak,
        config.rate_afternoon_wind,
        config.rate_end_of_day,
    ]
}

/// Relative rate at a minute of the day; minutes outside every segment use
/// the end-of-day rate.
pub fn rate_at(config: &TimingConfig, minute: i64) -> f64 {
    let rates = segment_rates(config);
    for (i, (start, end)) in SEGMENTS.iter().enumerate() {
        if (*start..*end).contains(&minute) {
            return rates[i];
        }
    }
    config.rate_end_of_day
}

fn max_rate(config: &TimingConfig) -> f64 {
    segment_rates(config).into_iter().fold(f64::MIN, f64::max)
}

fn minute_of(t: NaiveTime) -> i64 {
    (t.hour() * 60 + t.minute()) as i64
}

fn time_from_minute(m: i64) -> NaiveTime {
    let m = m.clamp(0, 24 * 60 - 1);
    NaiveTime::from_hms_opt((m / 60) as u32, (m % 60) as u32, 0)
        .unwrap_or_else(|| NaiveTime::from_hms_opt(9, 0, 0).expect("valid time"))
}

/// Generate `n` times of day inside `[window_start, window_end)`, sorted
/// ascending, with consecutive gaps of at least `min_gap_minutes` except
/// where the window-end clamp compresses the tail.
pub fn generate_daily_times<R: Rng>(
    n: usize,
    window_start: NaiveTime,
    window_end: NaiveTime,
    config: &TimingConfig,
    rng: &mut R,
) -> Vec<NaiveTime> {
    if n == 0 {
        return vec![];
    }

    let start_min = minute_of(window_start);
    let end_min = minute_of(window_end);
    let window = end_min - start_min;
    if window <= 0 {
        tracing::warn!(
            start = %window_start,
            end = %window_end,
            "operating window is empty, scheduling everything at the start"
        );
        return vec![window_start; n];
    }

    let mut ceiling = max_rate(config);
    if ceiling <= 0.0 {
        ceiling = 1.0;
    }

    let mut minutes: Vec<i64> = Vec::with_capacity(n);
    let max_attempts = n * 100;
    let mut attempts = 0;
    while minutes.len() < n && attempts < max_attempts {
        attempts += 1;
        let m = (start_min + (rng.random::<f64>() * window as f64) as i64).clamp(start_min, end_min - 1);
        if rng.random::<f64>() <= rate_at(config, m) / ceiling {
            let jitter = rng.random_range(-config.jitter_minutes..=config.jitter_minutes);
            minutes.push((m + jitter).clamp(start_min, end_min - 1));
        }
    }

    if minutes.len() < n {
        tracing::warn!(wanted = n, got = minutes.len(), "thinning under-filled, padding uniformly");
        while minutes.len() < n {
            let m = (start_min + (rng.random::<f64>() * window as f64) as i64).clamp(start_min, end_min - 1);
            minutes.push(m);
        }
    }

    minutes.sort_unstable();

    // Enforce the minimum gap with a forward pass, clamped below the window
    // end so the tail can compress.
    let mut last: Option<i64> = None;
    for m in minutes.iter_mut() {
        if let Some(prev) = last
            && *m - prev < config.min_gap_minutes
        {
            *m = (prev + config.min_gap_minutes).min(end_min - 1);
        }
        last = Some(*m);
    }
    minutes.sort_unstable();

    minutes.into_iter().map(time_from_minute).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn window() -> (NaiveTime, NaiveTime) {
        (
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_exact_count_sorted_in_window() {
        let config = TimingConfig::default();
        let (start, end) = window();
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let times = generate_daily_times(12, start, end, &config, &mut rng);
            assert_eq!(times.len(), 12);
            for t in &times {
                assert!(*t >= start && *t < end, "seed {}: {} outside window", seed, t);
            }
            for pair in times.windows(2) {
                assert!(pair[0] <= pair[1]);
            }
        }
    }

    #[test]
    fn test_minimum_gap_between_consecutive_times() {
        let config = TimingConfig::default();
        let (start, end) = window();
        let end_clamp = NaiveTime::from_hms_opt(17, 59, 0).unwrap();
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let times = generate_daily_times(10, start, end, &config, &mut rng);
            for pair in times.windows(2) {
                let gap = minute_of(pair[1]) - minute_of(pair[0]);
                assert!(
                    gap >= config.min_gap_minutes || pair[1] == end_clamp,
                    "seed {}: gap {} between {} and {}",
                    seed,
                    gap,
                    pair[0],
                    pair[1]
                );
            }
        }
    }

    #[test]
    fn test_zero_count_empty() {
        let config = TimingConfig::default();
        let (start, end) = window();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(generate_daily_times(0, start, end, &config, &mut rng).is_empty());
    }

    #[test]
    fn test_degenerate_window_repeats_start() {
        let config = TimingConfig::default();
        let start = NaiveTime::from_hms_opt(18, 0, 0).unwrap();
        let end = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        let times = generate_daily_times(4, start, end, &config, &mut rng);
        assert_eq!(times, vec![start; 4]);
    }

    #[test]
    fn test_rate_table_segments() {
        let config = TimingConfig::default();
        assert_eq!(rate_at(&config, 9 * 60 + 30), config.rate_morning_warmup);
        assert_eq!(rate_at(&config, 11 * 60), config.rate_mid_morning);
        assert_eq!(rate_at(&config, 12 * 60 + 15), config.rate_lunch_dip);
        assert_eq!(rate_at(&config, 14 * 60), config.rate_afternoon_peak);
        assert_eq!(rate_at(&config, 16 * 60), config.rate_afternoon_wind);
        assert_eq!(rate_at(&config, 17 * 60 + 30), config.rate_end_of_day);
        // Outside every segment falls back to the end-of-day rate.
        assert_eq!(rate_at(&config, 7 * 60), config.rate_end_of_day);
        assert_eq!(rate_at(&config, 20 * 60), config.rate_end_of_day);
    }

    #[test]
    fn test_dense_day_still_returns_exact_count() {
        // 60 slots in a 9 hour window with a 3 minute gap forces clamping.
        let config = TimingConfig::default();
        let (start, end) = window();
        let mut rng = StdRng::seed_from_u64(3);
        let times = generate_daily_times(60, start, end, &config, &mut rng);
        assert_eq!(times.len(), 60);
        assert!(times.iter().all(|t| *t >= start && *t < end));
    }

    #[test]
    fn test_same_seed_same_times() {
        let config = TimingConfig::default();
        let (start, end) = window();
        let a = generate_daily_times(8, start, end, &config, &mut StdRng::seed_from_u64(4));
        let b = generate_daily_times(8, start, end, &config, &mut StdRng::seed_from_u64(4));
        assert_eq!(a, b);
    }
}
