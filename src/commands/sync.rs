use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::commands::CommandReport;
use crate::error::SyncError;
use crate::spotify::api::SpotifyClient;
use crate::spotify::auth::{access_token, credentials_from_env};
use crate::sync::audit;
use crate::sync::client::LibraryClient;
use crate::sync::config::{SyncConfig, load_config};
use crate::sync::ledger::Ledger;
use crate::sync::lock::RunLock;
use crate::sync::month::MonthKey;
use crate::sync::paths::{SyncPaths, resolve_paths};
use crate::sync::pipeline::run_sync;
use crate::sync::reconcile::ReconcileOptions;

#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// First month to consider, `YYYY-MM`.
    pub start: Option<String>,
}

/// The explicit start month, or the month before `now`.
pub fn resolve_start(raw: Option<&str>, now: &DateTime<Utc>) -> Result<MonthKey, SyncError> {
    match raw {
        Some(raw) => raw.parse(),
        None => Ok(MonthKey::previous(now)),
    }
}

pub fn run(opts: &SyncOptions) -> Result<CommandReport> {
    let start = resolve_start(opts.start.as_deref(), &Utc::now())?;
    let cfg = load_config()?;
    let paths = resolve_paths()?;

    let creds = credentials_from_env()?;
    let token = access_token(&cfg.spotify, &creds)?;
    let client =
        SpotifyClient::new(&cfg.spotify, token)?.with_public_playlists(cfg.playlists.public);

    execute(&client, &paths, &cfg, start)
}

/// Sync against `client` while holding the run lock on `paths`.
pub fn execute<C: LibraryClient + ?Sized>(
    client: &C,
    paths: &SyncPaths,
    cfg: &SyncConfig,
    start: MonthKey,
) -> Result<CommandReport> {
    let mut report = CommandReport::new("sync");
    report.detail(format!("First month: {start}"));

    let lock = RunLock::acquire(&paths.lock_file)?;
    debug!(lock = %lock.path().display(), "acquired run lock");
    let mut ledger = Ledger::open(&paths.ledger_file)?;
    debug!(entries = ledger.len(), "ledger ready");
    let opts = ReconcileOptions {
        name_format: cfg.playlists.name_format.clone(),
    };
    let summary = run_sync(client, &mut ledger, start, &opts)?;
    info!(
        months = summary.months.len(),
        writes = summary.writes(),
        "sync finished"
    );

    report.detail(format!("Liked songs fetched ({})", summary.fetched));
    if summary.months.is_empty() {
        report.detail("No months with liked songs since the first month");
    }
    for outcome in &summary.months {
        report.detail(outcome.describe());
    }

    if let Err(err) = audit::append_outcomes(&paths.logs_dir, &summary.start, &summary.months) {
        warn!(error = %format!("{err:#}"), "failed to write audit log");
    }

    Ok(report)
}
