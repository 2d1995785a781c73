//! Scheduler orchestration: weekly plan lifecycle, daily queue extraction,
//! and counter-based hard limits.
//!
//! The scheduler never sleeps and never performs an interaction itself. An
//! external driver asks for today's queue, does the slow real-world work,
//! and reports outcomes back; every mutation here is written through to the
//! state file immediately.

use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, NaiveDate, TimeDelta, Utc};
use chrono_tz::Tz;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use crate::config::Config;
use crate::domain::{DailySlot, EngagementStatus, ProfileState, ScheduledEngagement, WeeklyPlan};
use crate::error::Result;
use crate::scheduler::budget::sample_weekly_budgets;
use crate::scheduler::counters::UsageCounters;
use crate::scheduler::scorer::score_all;
use crate::scheduler::select::select_for_day;
use crate::scheduler::timing::generate_daily_times;
use crate::sources::{ProfileSource, StateSource};
use crate::store::{ScheduleState, StateStore};

/// Point-in-time snapshot of consumption and plan state.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub hourly: CounterWindow,
    pub daily: CounterWindow,
    pub weekly: CounterWindow,
    pub plan_exists: bool,
    pub plan_week: Option<u32>,
    pub plan_total_budget: Option<i64>,
    pub plan_completed: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CounterWindow {
    pub used: u32,
    pub limit: u32,
}

/// Owns the weekly plan, the consumption counters, and the injected
/// randomness; talks to the profile/state collaborators only during plan
/// regeneration.
pub struct Scheduler {
    config: Config,
    tz: Tz,
    store: StateStore,
    counters: UsageCounters,
    plan: Option<WeeklyPlan>,
    profiles: Box<dyn ProfileSource>,
    tracker: Box<dyn StateSource>,
    rng: StdRng,
}

impl Scheduler {
    /// Build a scheduler from config and collaborators, loading any
    /// persisted state.
    pub fn new(config: Config, profiles: Box<dyn ProfileSource>, tracker: Box<dyn StateSource>) -> Self {
        let tz: Tz = config.scheduling.timezone.parse().unwrap_or_else(|_| {
            tracing::warn!(
                timezone = %config.scheduling.timezone,
                "unknown timezone, falling back to America/New_York"
            );
            chrono_tz::America::New_York
        });
        let rng = match config.scheduling.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let store = StateStore::new(config.storage.state_file.clone());
        let now = Utc::now();
        let today = now.with_timezone(&tz).date_naive();
        let state = store.load(now, today);
        Self {
            config,
            tz,
            store,
            counters: state.counters,
            plan: state.plan,
            profiles,
            tracker,
            rng,
        }
    }

    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.tz).date_naive()
    }

    /// The current weekly plan, if one is loaded.
    pub fn plan(&self) -> Option<&WeeklyPlan> {
        self.plan.as_ref()
    }

    /// Refresh reset boundaries, then evaluate the hourly, daily, and
    /// weekly ceilings in that order. Returns `(true, "ok")` or the first
    /// violated limit's description.
    pub fn check_limits(&mut self) -> (bool, String) {
        self.counters.maybe_reset(Utc::now(), self.today());
        self.counters.check(&self.config.limits)
    }

    /// Record `amount` consumed interactions and persist. Callers are
    /// expected to run `check_limits` first; this does not gate.
    pub fn consume(&mut self, amount: u32) -> Result<()> {
        self.counters.consume(amount);
        self.save_state()?;
        tracing::info!(
            amount,
            hourly = self.counters.hourly_count,
            daily = self.counters.daily_count,
            weekly = self.counters.weekly_count,
            "consumption recorded"
        );
        Ok(())
    }

    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            hourly: CounterWindow {
                used: self.counters.hourly_count,
                limit: self.config.limits.hourly,
            },
            daily: CounterWindow {
                used: self.counters.daily_count,
                limit: self.config.limits.daily,
            },
            weekly: CounterWindow {
                used: self.counters.weekly_count,
                limit: self.config.limits.weekly,
            },
            plan_exists: self.plan.is_some(),
            plan_week: self.plan.as_ref().map(|p| p.week_number),
            plan_total_budget: self.plan.as_ref().map(|p| p.total_budget),
            plan_completed: self.plan.as_ref().map(WeeklyPlan::total_completed),
        }
    }

    /// Build and persist a plan for the current ISO week from the given
    /// tracked states: score, sample budgets, select day by day with the
    /// previous day's ids excluded, and assign intra-day times.
    pub fn generate_weekly_plan(&mut self, states: &[ProfileState]) -> Result<()> {
        let today = self.today();
        let week_start = today - TimeDelta::days(today.weekday().num_days_from_monday() as i64);
        let week_number = today.iso_week().week();

        let scored = score_all(states, today, &self.config.priority, &mut self.rng);
        if scored.is_empty() {
            tracing::warn!("no active profiles to score, planning an empty week");
            self.plan = Some(WeeklyPlan {
                week_start,
                week_number,
                total_budget: 0,
                created_at: Utc::now(),
                days: BTreeMap::new(),
            });
            self.save_state()?;
            return Ok(());
        }

        let budgets = sample_weekly_budgets(&self.config.budget, &mut self.rng);

        let mut days = BTreeMap::new();
        let mut yesterday: HashSet<String> = HashSet::new();
        for offset in 0..7i64 {
            let slot_date = week_start + TimeDelta::days(offset);
            let day_budget = budgets[offset as usize];

            let selected = select_for_day(
                &scored,
                day_budget,
                &yesterday,
                &self.config.priority,
                &self.config.selection,
                &mut self.rng,
            );
            yesterday = selected.iter().map(|p| p.id.clone()).collect();

            let times = generate_daily_times(
                selected.len(),
                self.config.scheduling.operating_start,
                self.config.scheduling.operating_end,
                &self.config.timing,
                &mut self.rng,
            );
            let engagements: Vec<ScheduledEngagement> = selected
                .into_iter()
                .zip(times)
                .map(|(profile, scheduled_time)| ScheduledEngagement {
                    id: profile.id,
                    name: profile.name,
                    scheduled_time,
                    priority_score: profile.priority_score,
                    days_since_last: profile.days_since_last,
                    forced: profile.forced,
                    status: EngagementStatus::Pending,
                })
                .collect();

            days.insert(
                slot_date.to_string(),
                DailySlot {
                    date: slot_date,
                    budget: day_budget,
                    is_burst_day: day_budget >= self.config.budget.daily_max - 2,
                    completed: 0,
                    engagements,
                },
            );
        }

        let total_budget: i64 = budgets.iter().sum();
        self.plan = Some(WeeklyPlan {
            week_start,
            week_number,
            total_budget,
            created_at: Utc::now(),
            days,
        });
        self.save_state()?;
        tracing::info!(week_number, total_budget, "weekly plan generated");
        Ok(())
    }

    /// Today's pending engagements sorted by scheduled time, lazily
    /// regenerating the plan when it is missing, from another ISO week, or
    /// lacks today's date. A collaborator failure yields an empty queue and
    /// leaves any loaded plan alone.
    pub fn todays_queue(&mut self) -> Vec<ScheduledEngagement> {
        let today = self.today();
        let current_week = today.iso_week().week();

        let needs_plan = match &self.plan {
            None => {
                tracing::info!("no plan loaded, generating");
                true
            }
            Some(plan) if plan.week_number != current_week => {
                tracing::info!(plan_week = plan.week_number, current_week, "plan is stale");
                true
            }
            Some(plan) if plan.slot_for(today).is_none() => {
                tracing::info!(today = %today, "today is not in the plan");
                true
            }
            _ => false,
        };

        if needs_plan && let Err(e) = self.refresh_plan() {
            tracing::error!(error = %e, "failed to generate weekly plan");
            return vec![];
        }

        self.plan
            .as_ref()
            .and_then(|plan| plan.slot_for(today))
            .map(DailySlot::pending)
            .unwrap_or_default()
    }

    /// Record an engagement outcome against today's slot. The first
    /// pending entry for the id takes the terminal status; a missing id or
    /// an already-terminal entry is a logged no-op.
    pub fn mark_outcome(&mut self, id: &str, outcome: EngagementStatus) -> Result<()> {
        if !outcome.is_terminal() {
            tracing::warn!(id, "refusing to mark an engagement back to pending");
            return Ok(());
        }
        let today = self.today();
        let Some(plan) = self.plan.as_mut() else {
            tracing::debug!(id, "no plan loaded, outcome dropped");
            return Ok(());
        };
        let Some(slot) = plan.slot_for_mut(today) else {
            tracing::debug!(id, "no slot for today, outcome dropped");
            return Ok(());
        };
        let Some(engagement) = slot
            .engagements
            .iter_mut()
            .find(|e| e.id == id && e.status == EngagementStatus::Pending)
        else {
            tracing::debug!(id, "engagement not found for outcome");
            return Ok(());
        };
        engagement.status = outcome;
        if outcome == EngagementStatus::Done {
            slot.completed += 1;
        }
        self.save_state()?;
        tracing::info!(id, outcome = %outcome, "outcome marked");
        Ok(())
    }

    /// Pull fresh data from the collaborators and rebuild the plan.
    pub fn refresh_plan(&mut self) -> Result<()> {
        let profiles = self.profiles.list_profiles()?;
        self.tracker.initialize_tracking()?;
        let mut states = self.tracker.tracked_states()?;

        // Tracking rows may lack display names; the profile list has them.
        let names: std::collections::HashMap<&str, &str> =
            profiles.iter().map(|p| (p.id.as_str(), p.name.as_str())).collect();
        for state in states.iter_mut() {
            if state.name.is_empty()
                && let Some(name) = names.get(state.id.as_str())
            {
                state.name = (*name).to_string();
            }
        }

        self.generate_weekly_plan(&states)
    }

    fn save_state(&self) -> Result<()> {
        let state = ScheduleState {
            counters: self.counters.clone(),
            saved_at: Utc::now(),
            plan: self.plan.clone(),
        };
        self.store.save(&state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::FileSource;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_source_file(path: &Path, count: usize, days_ago: i64, tz: &Tz) {
        let today = Utc::now().with_timezone(tz).date_naive();
        let last = (today - TimeDelta::days(days_ago)).to_string();
        let profiles: Vec<serde_json::Value> = (0..count)
            .map(|i| {
                serde_json::json!({
                    "id": format!("https://example.com/in/user{}", i),
                    "name": format!("User {}", i),
                })
            })
            .collect();
        let tracking: Vec<serde_json::Value> = (0..count)
            .map(|i| {
                serde_json::json!({
                    "id": format!("https://example.com/in/user{}", i),
                    "last_engaged": last,
                    "status": "active",
                })
            })
            .collect();
        let body = serde_json::json!({"profiles": profiles, "tracking": tracking});
        fs::write(path, serde_json::to_string_pretty(&body).unwrap()).unwrap();
    }

    fn scheduler_in(temp: &TempDir, seed: u64) -> Scheduler {
        let source_path = temp.path().join("profiles.json");
        let mut config = Config::default();
        config.scheduling.seed = Some(seed);
        config.storage.state_file = temp.path().join("schedule_state.json");
        let tz: Tz = config.scheduling.timezone.parse().unwrap();
        if !source_path.exists() {
            write_source_file(&source_path, 40, 7, &tz);
        }
        Scheduler::new(
            config,
            Box::new(FileSource::new(&source_path)),
            Box::new(FileSource::new(&source_path)),
        )
    }

    #[test]
    fn test_generate_weekly_plan_shape() {
        let temp = TempDir::new().unwrap();
        let mut scheduler = scheduler_in(&temp, 1);
        let states = scheduler.tracker.tracked_states().unwrap();
        scheduler.generate_weekly_plan(&states).unwrap();

        let config = Config::default();
        let plan = scheduler.plan().unwrap();
        assert_eq!(plan.days.len(), 7);
        assert_eq!(plan.week_start.weekday(), chrono::Weekday::Mon);
        let mut budget_sum = 0;
        for slot in plan.days.values() {
            assert!(slot.budget >= config.budget.daily_min && slot.budget <= config.budget.daily_max);
            assert!(slot.engagements.len() as i64 <= slot.budget);
            budget_sum += slot.budget;
            for e in &slot.engagements {
                assert!(e.scheduled_time >= config.scheduling.operating_start);
                assert!(e.scheduled_time < config.scheduling.operating_end);
                assert_eq!(e.status, EngagementStatus::Pending);
            }
        }
        assert_eq!(plan.total_budget, budget_sum);
    }

    #[test]
    fn test_no_profile_repeats_on_consecutive_days() {
        let temp = TempDir::new().unwrap();
        let mut scheduler = scheduler_in(&temp, 2);
        let states = scheduler.tracker.tracked_states().unwrap();
        scheduler.generate_weekly_plan(&states).unwrap();

        let plan = scheduler.plan().unwrap();
        let mut by_date: Vec<(&String, &DailySlot)> = plan.days.iter().collect();
        by_date.sort_by_key(|(date, _)| (*date).clone());
        for pair in by_date.windows(2) {
            let earlier: HashSet<&str> = pair[0].1.engagements.iter().map(|e| e.id.as_str()).collect();
            for e in &pair[1].1.engagements {
                assert!(
                    !earlier.contains(e.id.as_str()),
                    "{} appears on consecutive days",
                    e.id
                );
            }
        }
    }

    #[test]
    fn test_todays_queue_generates_and_sorts() {
        let temp = TempDir::new().unwrap();
        let mut scheduler = scheduler_in(&temp, 3);
        let queue = scheduler.todays_queue();
        assert!(!queue.is_empty());
        for pair in queue.windows(2) {
            assert!(pair[0].scheduled_time <= pair[1].scheduled_time);
        }
        assert!(queue.iter().all(|e| e.status == EngagementStatus::Pending));
    }

    #[test]
    fn test_collaborator_failure_yields_empty_queue() {
        let temp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.scheduling.seed = Some(4);
        config.storage.state_file = temp.path().join("schedule_state.json");
        let missing = temp.path().join("missing.json");
        let mut scheduler = Scheduler::new(
            config,
            Box::new(FileSource::new(&missing)),
            Box::new(FileSource::new(&missing)),
        );
        assert!(scheduler.todays_queue().is_empty());
        assert!(scheduler.plan().is_none());
    }

    #[test]
    fn test_mark_outcome_transitions_once() {
        let temp = TempDir::new().unwrap();
        let mut scheduler = scheduler_in(&temp, 5);
        let queue = scheduler.todays_queue();
        let target = queue[0].id.clone();

        scheduler.mark_outcome(&target, EngagementStatus::Done).unwrap();
        let today = scheduler.today();
        let slot = scheduler.plan().unwrap().slot_for(today).unwrap();
        assert_eq!(slot.completed, 1);
        let marked = slot.engagements.iter().find(|e| e.id == target).unwrap();
        assert_eq!(marked.status, EngagementStatus::Done);

        // Second call against a terminal engagement is a no-op.
        scheduler.mark_outcome(&target, EngagementStatus::Skipped).unwrap();
        let slot = scheduler.plan().unwrap().slot_for(today).unwrap();
        assert_eq!(slot.completed, 1);
        let marked = slot.engagements.iter().find(|e| e.id == target).unwrap();
        assert_eq!(marked.status, EngagementStatus::Done);
    }

    #[test]
    fn test_mark_outcome_unknown_id_is_noop() {
        let temp = TempDir::new().unwrap();
        let mut scheduler = scheduler_in(&temp, 6);
        scheduler.todays_queue();
        let before = scheduler.plan().unwrap().clone();
        scheduler
            .mark_outcome("https://example.com/in/nobody", EngagementStatus::Failed)
            .unwrap();
        assert_eq!(scheduler.plan().unwrap(), &before);
    }

    #[test]
    fn test_mark_outcome_rejects_pending() {
        let temp = TempDir::new().unwrap();
        let mut scheduler = scheduler_in(&temp, 7);
        let queue = scheduler.todays_queue();
        let target = queue[0].id.clone();
        scheduler.mark_outcome(&target, EngagementStatus::Pending).unwrap();
        let today = scheduler.today();
        let slot = scheduler.plan().unwrap().slot_for(today).unwrap();
        let entry = slot.engagements.iter().find(|e| e.id == target).unwrap();
        assert_eq!(entry.status, EngagementStatus::Pending);
    }

    #[test]
    fn test_queue_shrinks_as_outcomes_land() {
        let temp = TempDir::new().unwrap();
        let mut scheduler = scheduler_in(&temp, 8);
        let queue = scheduler.todays_queue();
        let initial = queue.len();
        assert!(initial >= 2);
        scheduler.mark_outcome(&queue[0].id, EngagementStatus::Done).unwrap();
        scheduler.mark_outcome(&queue[1].id, EngagementStatus::NoPosts).unwrap();
        assert_eq!(scheduler.todays_queue().len(), initial - 2);
    }

    #[test]
    fn test_check_limits_and_consume() {
        let temp = TempDir::new().unwrap();
        let mut scheduler = scheduler_in(&temp, 9);
        let (allowed, reason) = scheduler.check_limits();
        assert!(allowed);
        assert_eq!(reason, "ok");

        let hourly = scheduler.config.limits.hourly;
        scheduler.consume(hourly).unwrap();
        let (allowed, reason) = scheduler.check_limits();
        assert!(!allowed);
        assert!(reason.starts_with("hourly_limit"));
    }

    #[test]
    fn test_state_survives_restart() {
        let temp = TempDir::new().unwrap();
        let first_queue;
        {
            let mut scheduler = scheduler_in(&temp, 10);
            first_queue = scheduler.todays_queue();
            scheduler.consume(3).unwrap();
            scheduler
                .mark_outcome(&first_queue[0].id, EngagementStatus::Done)
                .unwrap();
        }
        let mut scheduler = scheduler_in(&temp, 10);
        assert_eq!(scheduler.counters.daily_count, 3);
        let plan = scheduler.plan().unwrap();
        assert_eq!(plan.total_completed(), 1);
        // The reloaded plan is current, so the queue comes straight from it.
        let queue = scheduler.todays_queue();
        assert_eq!(queue.len(), first_queue.len() - 1);
    }

    #[test]
    fn test_status_snapshot() {
        let temp = TempDir::new().unwrap();
        let mut scheduler = scheduler_in(&temp, 11);
        scheduler.todays_queue();
        scheduler.consume(2).unwrap();
        let status = scheduler.status();
        assert_eq!(status.daily.used, 2);
        assert_eq!(status.daily.limit, 20);
        assert!(status.plan_exists);
        assert!(status.plan_week.is_some());
    }

    #[test]
    fn test_empty_tracking_plans_empty_week() {
        let temp = TempDir::new().unwrap();
        let source_path = temp.path().join("profiles.json");
        fs::write(&source_path, r#"{"profiles": [], "tracking": []}"#).unwrap();
        let mut scheduler = scheduler_in(&temp, 12);
        assert!(scheduler.todays_queue().is_empty());
        let plan = scheduler.plan().unwrap();
        assert_eq!(plan.total_budget, 0);
        assert!(plan.days.is_empty());
    }
}
