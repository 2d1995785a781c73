use chrono::NaiveTime;
use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::engagement::format_hhmm;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub limits: LimitsConfig,
    pub budget: BudgetConfig,
    pub priority: PriorityConfig,
    pub selection: SelectionConfig,
    pub timing: TimingConfig,
    pub scheduling: SchedulingConfig,
    pub source: SourceConfig,
    pub storage: StorageConfig,
}

/// Hard consumption ceilings, enforced independently of the weekly plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub hourly: u32,
    pub daily: u32,
    pub weekly: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            hourly: 5,
            daily: 20,
            weekly: 80,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub weekly_target: i64,
    pub daily_mean: f64,
    pub daily_std: f64,
    pub daily_min: i64,
    pub daily_max: i64,
    pub burst_probability: f64,
    pub burst_extra_min: i64,
    pub burst_extra_max: i64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            weekly_target: 80,
            daily_mean: 12.0,
            daily_std: 4.0,
            daily_min: 5,
            daily_max: 20,
            burst_probability: 0.15,
            burst_extra_min: 3,
            burst_extra_max: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityConfig {
    pub days_weight: f64,
    pub days_cap: f64,
    pub jitter_max: f64,
    pub force_threshold_days: f64,
    pub force_max_per_day: usize,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            days_weight: 0.8,
            days_cap: 12.0,
            jitter_max: 5.0,
            force_threshold_days: 12.0,
            force_max_per_day: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Candidate pool size is `budget * pool_multiplier` top-ranked entries.
    pub pool_multiplier: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self { pool_multiplier: 2 }
    }
}

/// Relative rates for the piecewise intra-day activity density, plus
/// spacing/jitter knobs. Rates are relative to each other, not absolute.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub rate_morning_warmup: f64,
    pub rate_mid_morning: f64,
    pub rate_lunch_dip: f64,
    pub rate_afternoon_peak: f64,
    pub rate_afternoon_wind: f64,
    pub rate_end_of_day: f64,
    pub min_gap_minutes: i64,
    pub jitter_minutes: i64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            rate_morning_warmup: 0.6,
            rate_mid_morning: 1.3,
            rate_lunch_dip: 0.8,
            rate_afternoon_peak: 1.2,
            rate_afternoon_wind: 0.7,
            rate_end_of_day: 0.4,
            min_gap_minutes: 3,
            jitter_minutes: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingConfig {
    /// IANA timezone name used for all counter resets and plan dates.
    pub timezone: String,
    #[serde(with = "hhmm")]
    pub operating_start: NaiveTime,
    #[serde(with = "hhmm")]
    pub operating_end: NaiveTime,
    /// Fixed RNG seed for reproducible plans. None = seed from the OS.
    pub seed: Option<u64>,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            timezone: "America/New_York".to_string(),
            operating_start: NaiveTime::from_hms_opt(9, 0, 0).expect("valid time"),
            operating_end: NaiveTime::from_hms_opt(18, 0, 0).expect("valid time"),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Path to the JSON profile/tracking document for the file-backed source.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub state_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_file: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("cadence")
                .join("schedule_state.json"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            limits: LimitsConfig::default(),
            budget: BudgetConfig::default(),
            priority: PriorityConfig::default(),
            selection: SelectionConfig::default(),
            timing: TimingConfig::default(),
            scheduling: SchedulingConfig::default(),
            source: SourceConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            let config = Self::load_from_file(path)
                .context(format!("Failed to load config from {}", path.display()))?;
            config.validate()?;
            return Ok(config);
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let project_name = env!("CARGO_PKG_NAME");
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => {
                        config.validate()?;
                        return Ok(config);
                    }
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => {
                    config.validate()?;
                    return Ok(config);
                }
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Check cross-field constraints once at startup so every consumer can
    /// assume a coherent value.
    pub fn validate(&self) -> Result<()> {
        self.scheduling
            .timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|_| eyre!("unknown timezone: {}", self.scheduling.timezone))?;
        if self.scheduling.operating_end <= self.scheduling.operating_start {
            return Err(eyre!(
                "operating window is empty: {} >= {}",
                format_hhmm(self.scheduling.operating_start),
                format_hhmm(self.scheduling.operating_end)
            ));
        }
        if self.budget.daily_min > self.budget.daily_max {
            return Err(eyre!(
                "budget.daily_min ({}) exceeds budget.daily_max ({})",
                self.budget.daily_min,
                self.budget.daily_max
            ));
        }
        if self.budget.burst_extra_min > self.budget.burst_extra_max {
            return Err(eyre!("budget.burst_extra_min exceeds budget.burst_extra_max"));
        }
        if self.budget.daily_std < 0.0 {
            return Err(eyre!("budget.daily_std must be non-negative"));
        }
        if self.selection.pool_multiplier == 0 {
            return Err(eyre!("selection.pool_multiplier must be at least 1"));
        }
        if self.timing.min_gap_minutes < 0 || self.timing.jitter_minutes < 0 {
            return Err(eyre!("timing.min_gap_minutes and timing.jitter_minutes must be non-negative"));
        }
        Ok(())
    }
}

/// Serde adapter for "HH:MM" times in YAML config.
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    use crate::domain::engagement::{format_hhmm, parse_hhmm};

    pub fn serialize<S: Serializer>(t: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_hhmm(*t))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_hhmm(&s).ok_or_else(|| D::Error::custom(format!("invalid HH:MM time: {}", s)))
    }
}
