use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use log::info;
use std::fs;
use std::path::PathBuf;

use cadence::cli::Cli;
use cadence::cli::commands::Commands;
use cadence::config::Config;
use cadence::domain::EngagementStatus;
use cadence::scheduler::Scheduler;
use cadence::sources::FileSource;

fn setup_logging() -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cadence")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("cadence.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn build_scheduler(cli: &Cli, config: &Config) -> Result<Scheduler> {
    let source_path = cli
        .source
        .clone()
        .or_else(|| config.source.path.clone())
        .ok_or_else(|| eyre!("no profile source configured; pass --source or set source.path"))?;

    Ok(Scheduler::new(
        config.clone(),
        Box::new(FileSource::new(&source_path)),
        Box::new(FileSource::new(&source_path)),
    ))
}

fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Queue => handle_queue_command(cli, config),
        Commands::Plan => handle_plan_command(cli, config),
        Commands::Status => handle_status_command(cli, config),
        Commands::Check => handle_check_command(cli, config),
        Commands::Mark { id, outcome } => handle_mark_command(cli, config, id, *outcome),
        Commands::Consume { amount } => handle_consume_command(cli, config, *amount),
    }
}

fn handle_queue_command(cli: &Cli, config: &Config) -> Result<()> {
    let mut scheduler = build_scheduler(cli, config)?;
    let queue = scheduler.todays_queue();

    if queue.is_empty() {
        println!("{}", "Nothing scheduled for today.".yellow());
        return Ok(());
    }

    println!("{}", "TODAY'S ENGAGEMENT QUEUE".bold());
    for (i, engagement) in queue.iter().enumerate() {
        let name = if engagement.name.is_empty() {
            engagement.id.as_str()
        } else {
            engagement.name.as_str()
        };
        let flag = if engagement.forced { " [forced]".red().to_string() } else { String::new() };
        println!(
            "{:>3}. {:<30} score {:>5.1} @ {}{}",
            i + 1,
            name,
            engagement.priority_score,
            engagement.scheduled_time.format("%H:%M").to_string().cyan(),
            flag
        );
    }
    Ok(())
}

fn handle_plan_command(cli: &Cli, config: &Config) -> Result<()> {
    let mut scheduler = build_scheduler(cli, config)?;
    scheduler.refresh_plan().context("plan regeneration failed")?;

    let plan = scheduler
        .plan()
        .ok_or_else(|| eyre!("plan regeneration produced no plan"))?;
    println!(
        "{} week {} (starting {}), total budget {}",
        "Planned".green(),
        plan.week_number,
        plan.week_start,
        plan.total_budget
    );
    for (date, slot) in &plan.days {
        let burst = if slot.is_burst_day { " burst".magenta().to_string() } else { String::new() };
        println!(
            "  {}  budget {:>2}  scheduled {:>2}{}",
            date,
            slot.budget,
            slot.engagements.len(),
            burst
        );
    }
    Ok(())
}

fn handle_status_command(cli: &Cli, config: &Config) -> Result<()> {
    let scheduler = build_scheduler(cli, config)?;
    let status = scheduler.status();

    println!("{}", "Counters".bold());
    println!("  hourly: {}/{}", status.hourly.used, status.hourly.limit);
    println!("  daily:  {}/{}", status.daily.used, status.daily.limit);
    println!("  weekly: {}/{}", status.weekly.used, status.weekly.limit);
    if status.plan_exists {
        println!(
            "{} week {:?}, budget {:?}, completed {:?}",
            "Plan".bold(),
            status.plan_week.unwrap_or(0),
            status.plan_total_budget.unwrap_or(0),
            status.plan_completed.unwrap_or(0)
        );
    } else {
        println!("{}", "No weekly plan loaded.".yellow());
    }
    Ok(())
}

fn handle_check_command(cli: &Cli, config: &Config) -> Result<()> {
    let mut scheduler = build_scheduler(cli, config)?;
    let (allowed, reason) = scheduler.check_limits();
    if allowed {
        println!("{}", "ok".green());
        Ok(())
    } else {
        println!("{} {}", "blocked:".red(), reason);
        std::process::exit(1);
    }
}

fn handle_mark_command(cli: &Cli, config: &Config, id: &str, outcome: EngagementStatus) -> Result<()> {
    let mut scheduler = build_scheduler(cli, config)?;
    scheduler.mark_outcome(id, outcome).context("failed to record outcome")?;
    println!("{} {} -> {}", "Marked".green(), id, outcome);
    Ok(())
}

fn handle_consume_command(cli: &Cli, config: &Config, amount: u32) -> Result<()> {
    let mut scheduler = build_scheduler(cli, config)?;
    scheduler.consume(amount).context("failed to record consumption")?;
    let status = scheduler.status();
    println!(
        "{} {} (hourly {}/{}, daily {}/{}, weekly {}/{})",
        "Consumed".green(),
        amount,
        status.hourly.used,
        status.hourly.limit,
        status.daily.used,
        status.daily.limit,
        status.weekly.used,
        status.weekly.limit
    );
    Ok(())
}

fn main() -> Result<()> {
    setup_logging()?;

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref())?;

    run_application(&cli, &config)
}
