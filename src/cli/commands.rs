//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - queue: show today's pending engagements
//! - plan: force regeneration of the weekly plan
//! - status: counters and plan summary
//! - check: evaluate the hard rate ceilings
//! - mark: record an engagement outcome
//! - consume: record consumed interactions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::domain::EngagementStatus;

/// cadence - stochastic engagement scheduler
#[derive(Parser, Debug)]
#[command(name = "cadence")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the JSON profile/tracking source file
    #[arg(short, long, global = true)]
    pub source: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show today's pending engagement queue
    Queue,

    /// Force regeneration of the weekly plan
    Plan,

    /// Show consumption counters and plan summary
    Status,

    /// Check the hourly/daily/weekly ceilings; exits 1 when blocked
    Check,

    /// Record an outcome for a scheduled engagement
    Mark {
        /// Profile identifier of the engagement
        id: String,

        /// Outcome: done, skipped, failed, already_reacted, no_posts
        outcome: EngagementStatus,
    },

    /// Record consumed interactions against all counters
    Consume {
        /// How many interactions to record
        #[arg(default_value_t = 1)]
        amount: u32,
    },
}
