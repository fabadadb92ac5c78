//! Runtime paths and log settings resolved from flags and the environment.

use std::path::{Path, PathBuf};

use crate::logging::default_log_level;

pub const DATA_DIR_NAME: &str = ".pulsehub";
pub const DB_FILE_NAME: &str = "pulsehub.json";
pub const LOG_DIR_NAME: &str = "logs";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: String,
}

impl Config {
    /// Resolve settings. Without `--db` the store lives in `$HOME/.pulsehub`;
    /// with it, the data directory is the store file's parent. Relative paths
    /// are anchored at `cwd` so the log directory is always absolute.
    pub fn resolve(
        db: Option<PathBuf>,
        log_level: Option<String>,
        log_dir: Option<PathBuf>,
        home: Option<PathBuf>,
        cwd: &Path,
    ) -> Config {
        let absolute = |p: PathBuf| if p.is_absolute() { p } else { cwd.join(p) };

        let (data_dir, db_path) = match db {
            Some(path) => {
                let path = absolute(path);
                let dir = path.parent().map(Path::to_path_buf).unwrap_or_else(|| cwd.to_path_buf());
                (dir, path)
            }
            None => {
                let dir = absolute(home.unwrap_or_else(|| PathBuf::from("."))).join(DATA_DIR_NAME);
                let path = dir.join(DB_FILE_NAME);
                (dir, path)
            }
        };
        let log_dir = log_dir.map(absolute).unwrap_or_else(|| data_dir.join(LOG_DIR_NAME));
        let log_level = log_level
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| default_log_level().to_string());

        Config { data_dir, db_path, log_dir, log_level }
    }

    /// Resolve against the process environment.
    pub fn from_env(db: Option<PathBuf>, log_level: Option<String>, log_dir: Option<PathBuf>) -> Config {
        let home = std::env::var_os("HOME").map(PathBuf::from);
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        Config::resolve(db, log_level, log_dir, home, &cwd)
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)
    }
}
