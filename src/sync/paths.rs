use anyhow::Result;
use std::env;
use std::path::{Path, PathBuf};

pub const LEDGER_FILE: &str = "created_playlists.csv";
const LOCK_FILE: &str = "monthsync.lock";

#[derive(Debug, Clone)]
pub struct SyncPaths {
    pub home: PathBuf,
    pub ledger_file: PathBuf,
    pub logs_dir: PathBuf,
    pub lock_file: PathBuf,
}

fn required_home_dir() -> Result<PathBuf> {
    if let Some(home) = dirs::home_dir() {
        return Ok(home);
    }
    Err(anyhow::anyhow!("HOME directory could not be resolved"))
}

fn env_path(var: &str) -> Option<PathBuf> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(PathBuf::from(v.trim())),
        _ => None,
    }
}

pub fn default_home(user_home: &Path) -> PathBuf {
    user_home.join(".monthsync")
}

fn lock_path_for(ledger_file: &Path) -> PathBuf {
    match ledger_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(LOCK_FILE),
        _ => PathBuf::from(LOCK_FILE),
    }
}

pub fn paths_under(
    home: PathBuf,
    ledger_override: Option<PathBuf>,
    logs_override: Option<PathBuf>,
) -> SyncPaths {
    let ledger_file = ledger_override.unwrap_or_else(|| home.join(LEDGER_FILE));
    let logs_dir = logs_override.unwrap_or_else(|| home.join("logs"));
    let lock_file = lock_path_for(&ledger_file);
    SyncPaths {
        home,
        ledger_file,
        logs_dir,
        lock_file,
    }
}

pub fn resolve_paths() -> Result<SyncPaths> {
    let home = match env_path("MONTHSYNC_HOME") {
        Some(home) => home,
        None => default_home(&required_home_dir()?),
    };
    Ok(paths_under(
        home,
        env_path("MONTHSYNC_LEDGER_PATH"),
        env_path("MONTHSYNC_LOGS_DIR"),
    ))
}
