//! # PulseHub - School Administration CLI
//!
//! A command-line tracker for the day-to-day records of a school administrator:
//! compliance tasks, meetings, decisions and classroom observations.
//!
//! ## Key Features
//!
//! - **Compliance tasks**: due dates, priorities, categories and nested subtasks.
//!   A task with subtasks counts as complete only when all of them are.
//! - **Meetings**: attendees, durations and follow-up tasks that track the
//!   meeting's status.
//! - **Decisions**: impact levels and a later review of how each one worked out.
//! - **Classroom observations**: rubric component scores averaged into a
//!   four-level rating band.
//! - **Dashboard**: counts and period-over-period trends by day, week, month or year.
//! - **Widgets**: JSON snapshots for status bars and home-screen summaries.
//!
//! ## Quick Start
//!
//! ```bash
//! # Load some sample data
//! ph seed
//!
//! # Add a compliance task
//! ph task add "Fire drill log" --due friday --type compliance --category Safety
//!
//! # See what is due, grouped by urgency
//! ph task list --grouped
//!
//! # Weekly overview
//! ph dashboard --range week
//! ```
//!
//! Data is stored locally in `~/.pulsehub/pulsehub.json` (override with `--db`
//! or `PULSEHUB_DB`). Logs are written to `~/.pulsehub/logs/`.

use chrono::Local;
use clap::Parser;
use log::info;

pub mod cli;
pub mod cmd;
pub mod config;
pub mod db;
pub mod decision;
pub mod error;
pub mod fields;
pub mod grouping;
pub mod logging;
pub mod meeting;
pub mod observation;
pub mod query;
pub mod samples;
pub mod stats;
pub mod task;
pub mod widget;

use cli::Cli;
use cmd::*;
use config::Config;
use db::Database;

fn main() {
    let cli = Cli::parse();
    let config = Config::from_env(cli.db.clone(), cli.log_level.clone(), cli.log_dir.clone());

    if let Err(e) = config.ensure_dirs() {
        eprintln!("Failed to create data directory {}: {}", config.data_dir.display(), e);
        std::process::exit(1);
    }
    if let Err(e) = logging::init_logging(&config.log_level, &config.log_dir) {
        eprintln!("Failed to initialise logging: {e}");
        std::process::exit(1);
    }
    info!("event=command_start db={}", config.db_path.display());

    let now = Local::now().naive_local();
    let db_path = config.db_path.as_path();

    // Commands that never touch the store, or only read it permissively.
    match &cli.command {
        Commands::Completions { shell } => {
            cmd_completions(*shell);
            return;
        }
        Commands::Backup => {
            cmd_backup(db_path);
            return;
        }
        Commands::Widget { kind, hide_count } => {
            let db = Database::load_or_default(db_path);
            cmd_widget(&db, *kind, *hide_count, now);
            return;
        }
        _ => {}
    }

    let mut db = load_or_exit(db_path);

    match cli.command {
        Commands::Completions { .. } | Commands::Backup | Commands::Widget { .. } => {
            unreachable!("handled above")
        }
        Commands::Task { action } => cmd_task(&mut db, db_path, now, action),
        Commands::Category { action } => cmd_category(&mut db, db_path, action),
        Commands::Meeting { action } => cmd_meeting(&mut db, db_path, now, action),
        Commands::Decision { action } => cmd_decision(&mut db, db_path, now, action),
        Commands::Observation { action } => cmd_observation(&mut db, db_path, now, action),
        Commands::Dashboard { range } => cmd_dashboard(&db, range, now),
        Commands::Search { query, category, sort } => cmd_search(&db, query, category, sort, now),
        Commands::Seed => cmd_seed(&mut db, db_path, now),
        Commands::Export { output, all } => cmd_export(&db, output, all),
    }
}
