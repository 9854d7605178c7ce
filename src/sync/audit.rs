use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::sync::reconcile::MonthOutcome;

#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent<'a> {
    pub at: DateTime<Utc>,
    pub run_start: &'a str,
    #[serde(flatten)]
    pub outcome: &'a MonthOutcome,
}

/// Append one JSON line per month outcome to `logs_dir/audit.log`.
pub fn append_outcomes(
    logs_dir: &Path,
    run_start: &str,
    outcomes: &[MonthOutcome],
) -> Result<()> {
    if outcomes.is_empty() {
        return Ok(());
    }
    fs::create_dir_all(logs_dir)
        .with_context(|| format!("failed to create {}", logs_dir.display()))?;

    let at = Utc::now();
    let mut lines = String::new();
    for outcome in outcomes {
        let event = AuditEvent {
            at,
            run_start,
            outcome,
        };
        lines.push_str(&serde_json::to_string(&event)?);
        lines.push('\n');
    }

    let path = logs_dir.join("audit.log");
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    file.write_all(lines.as_bytes())?;
    Ok(())
}
