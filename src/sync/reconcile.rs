use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info};

use crate::sync::client::{LibraryClient, LikedItem};
use crate::sync::feed::collect_collection_items;
use crate::sync::ledger::Ledger;
use crate::sync::month::{DEFAULT_LABEL_FORMAT, MonthKey};
use crate::sync::partition::MonthBuckets;

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// strftime pattern applied to the first day of the month.
    pub name_format: String,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            name_format: DEFAULT_LABEL_FORMAT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum MonthAction {
    Created { playlist_id: String, added: usize },
    Updated { playlist_id: String, added: usize },
    UpToDate { playlist_id: String },
    SkippedEmpty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthOutcome {
    pub month: String,
    pub label: String,
    #[serde(flatten)]
    pub action: MonthAction,
}

impl MonthOutcome {
    pub fn wrote(&self) -> bool {
        matches!(
            self.action,
            MonthAction::Created { .. } | MonthAction::Updated { .. }
        )
    }

    /// One-line progress text shown to the user.
    pub fn describe(&self) -> String {
        match &self.action {
            MonthAction::Created { added, .. } => format!(
                "{}: no record of existing playlist; created and added liked songs ({added})",
                self.label
            ),
            MonthAction::Updated { added, .. } => format!(
                "{}: playlist already exists; added new liked songs ({added})",
                self.label
            ),
            MonthAction::UpToDate { .. } => {
                format!("{}: playlist already exists; up to date", self.label)
            }
            MonthAction::SkippedEmpty => {
                format!("{}: no liked songs; not creating playlist", self.label)
            }
        }
    }
}

/// Bring every month's playlist up to date, oldest month first.
///
/// Only ever creates or adds. A month already in the ledger is never created
/// again, even when its bucket is now empty.
pub fn reconcile<C: LibraryClient + ?Sized>(
    client: &C,
    ledger: &mut Ledger,
    buckets: &MonthBuckets,
    opts: &ReconcileOptions,
) -> Result<Vec<MonthOutcome>> {
    let mut owner: Option<String> = None;
    let mut outcomes = Vec::with_capacity(buckets.len());

    for (&key, bucket) in buckets {
        let label = key.label(&opts.name_format);
        let action = match ledger.lookup(key).map(str::to_owned) {
            None if bucket.is_empty() => MonthAction::SkippedEmpty,
            None => {
                let owner_id = resolve_owner(client, &mut owner)?;
                create_month(client, ledger, key, &label, &owner_id, bucket)?
            }
            Some(playlist_id) => update_month(client, key, &playlist_id, bucket)?,
        };

        let outcome = MonthOutcome {
            month: key.to_string(),
            label,
            action,
        };
        info!(month = %key, "{}", outcome.describe());
        outcomes.push(outcome);
    }

    Ok(outcomes)
}

/// Current user id, fetched on first use and cached in `cached`.
fn resolve_owner<C: LibraryClient + ?Sized>(
    client: &C,
    cached: &mut Option<String>,
) -> Result<String> {
    if let Some(id) = cached {
        return Ok(id.clone());
    }
    let id = client
        .current_user_id()
        .context("failed to resolve current user")?;
    *cached = Some(id.clone());
    Ok(id)
}

fn create_month<C: LibraryClient + ?Sized>(
    client: &C,
    ledger: &mut Ledger,
    key: MonthKey,
    label: &str,
    owner: &str,
    bucket: &[LikedItem],
) -> Result<MonthAction> {
    let playlist_id = client
        .create_collection(owner, label)
        .with_context(|| format!("failed to create playlist `{label}` for {key}"))?;
    // record before adding: a failed add is repaired by the next run's update
    // path instead of producing a second playlist
    ledger
        .record(key, &playlist_id)
        .with_context(|| format!("created playlist {playlist_id} but could not record it"))?;

    let uris: Vec<String> = bucket.iter().map(|item| item.uri.clone()).collect();
    client
        .add_items(&playlist_id, &uris)
        .with_context(|| format!("failed to add liked songs to playlist {playlist_id}"))?;

    Ok(MonthAction::Created {
        playlist_id,
        added: uris.len(),
    })
}

fn update_month<C: LibraryClient + ?Sized>(
    client: &C,
    key: MonthKey,
    playlist_id: &str,
    bucket: &[LikedItem],
) -> Result<MonthAction> {
    let members = collect_collection_items(client, playlist_id)
        .with_context(|| format!("failed to read playlist {playlist_id} for {key}"))?;
    let to_add = missing_uris(bucket, &members);
    debug!(
        month = %key,
        members = members.len(),
        liked = bucket.len(),
        missing = to_add.len(),
        "diffed playlist membership"
    );

    if to_add.is_empty() {
        return Ok(MonthAction::UpToDate {
            playlist_id: playlist_id.to_string(),
        });
    }

    client
        .add_items(playlist_id, &to_add)
        .with_context(|| format!("failed to add liked songs to playlist {playlist_id}"))?;
    Ok(MonthAction::Updated {
        playlist_id: playlist_id.to_string(),
        added: to_add.len(),
    })
}

/// Bucket uris absent from `members`, deduplicated, in bucket order.
pub fn missing_uris(bucket: &[LikedItem], members: &[String]) -> Vec<String> {
    let mut seen: HashSet<&str> = members.iter().map(String::as_str).collect();
    bucket
        .iter()
        .filter(|item| seen.insert(item.uri.as_str()))
        .map(|item| item.uri.clone())
        .collect()
}
