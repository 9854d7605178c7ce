use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::sync::client::LibraryClient;
use crate::sync::feed::collect_liked_since;
use crate::sync::ledger::Ledger;
use crate::sync::month::MonthKey;
use crate::sync::partition::partition_by_month;
use crate::sync::reconcile::{MonthOutcome, ReconcileOptions, reconcile};

#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub start: String,
    pub fetched: usize,
    pub months: Vec<MonthOutcome>,
}

impl SyncSummary {
    pub fn writes(&self) -> usize {
        self.months.iter().filter(|m| m.wrote()).count()
    }
}

/// Fetch likes back to `start`, bucket them by month, and reconcile each
/// month's playlist against the ledger.
pub fn run_sync<C: LibraryClient + ?Sized>(
    client: &C,
    ledger: &mut Ledger,
    start: MonthKey,
    opts: &ReconcileOptions,
) -> Result<SyncSummary> {
    let liked = collect_liked_since(client, start.first_instant())?;
    info!(start = %start, fetched = liked.len(), "liked songs fetched");

    let buckets = partition_by_month(&liked, start);
    let months = reconcile(client, ledger, &buckets, opts)?;

    Ok(SyncSummary {
        start: start.to_string(),
        fetched: liked.len(),
        months,
    })
}
