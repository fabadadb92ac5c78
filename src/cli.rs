use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// School administration tracker: compliance tasks, meetings, decisions and
/// classroom observations in a single JSON file.
#[derive(Parser)]
#[command(name = "ph", version, about = "PulseHub school administration CLI")]
pub struct Cli {
    /// Path to the JSON database file.
    #[arg(long, global = true, env = "PULSEHUB_DB")]
    pub db: Option<PathBuf>,

    /// Log level: trace | debug | info | warn | error | off.
    #[arg(long, global = true, env = "PULSEHUB_LOG")]
    pub log_level: Option<String>,

    /// Directory for log files (defaults to `logs/` next to the database).
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}
