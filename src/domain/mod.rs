//! Domain types: profiles, engagements, and the weekly plan.

pub mod engagement;
pub mod plan;
pub mod profile;

pub use engagement::{EngagementStatus, ScheduledEngagement};
pub use plan::{DailySlot, WeeklyPlan};
pub use profile::{ProfileRef, ProfileState, ScoredProfile};
