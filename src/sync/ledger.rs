use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::SyncError;
use crate::sync::month::MonthKey;

const HEADER: &str = "year,month,id";

/// Append-only month → playlist id table.
///
/// A file-backed ledger is loaded fully on open and every `record` is
/// appended to disk before it becomes visible in memory. An in-memory ledger
/// behaves the same without touching the filesystem.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    entries: BTreeMap<MonthKey, String>,
    path: Option<PathBuf>,
}

impl Ledger {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the ledger at `path`, creating it with only a header row when absent.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            create_with_header(path)?;
        }

        let raw =
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        if raw.trim().is_empty() {
            fs::write(path, format!("{HEADER}\n"))
                .with_context(|| format!("failed to write {}", path.display()))?;
        } else if !raw.ends_with('\n') {
            append_line(path, "")?;
        }

        let entries = parse_ledger(path, &raw)?;
        debug!(path = %path.display(), entries = entries.len(), "loaded ledger");
        Ok(Self {
            entries,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn lookup(&self, key: MonthKey) -> Option<&str> {
        self.entries.get(&key).map(String::as_str)
    }

    /// Append a new entry. Never overwrites: an existing key is an error.
    pub fn record(&mut self, key: MonthKey, collection_id: &str) -> Result<()> {
        if let Some(existing) = self.entries.get(&key) {
            return Err(SyncError::DuplicateMonth {
                key,
                existing: existing.clone(),
            }
            .into());
        }
        let id = collection_id.trim();
        if id.is_empty() || id.contains([',', '\n', '\r']) {
            anyhow::bail!("refusing to record unusable playlist id {collection_id:?} for {key}");
        }

        if let Some(path) = &self.path {
            append_line(path, &format!("{},{},{id}", key.year(), key.month()))?;
        }
        self.entries.insert(key, id.to_string());
        info!(month = %key, playlist = id, "recorded ledger entry");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn create_with_header(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    match fs::OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => {
            file.write_all(format!("{HEADER}\n").as_bytes())
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "created empty ledger");
            Ok(())
        }
        Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(()),
        Err(err) => Err(err).with_context(|| format!("failed to create {}", path.display())),
    }
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut file = fs::OpenOptions::new()
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    file.write_all(format!("{line}\n").as_bytes())
        .with_context(|| format!("failed to append to {}", path.display()))?;
    Ok(())
}

fn parse_ledger(path: &Path, raw: &str) -> Result<BTreeMap<MonthKey, String>> {
    let corrupt = |line: usize, reason: String| SyncError::LedgerCorrupt {
        path: path.to_path_buf(),
        line,
        reason,
    };

    let mut entries = BTreeMap::new();
    let mut saw_header = false;
    for (idx, line) in raw.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !saw_header {
            if trimmed.replace(' ', "") != HEADER {
                return Err(corrupt(line_no, format!("expected header `{HEADER}`")).into());
            }
            saw_header = true;
            continue;
        }

        let cols: Vec<&str> = trimmed.split(',').map(str::trim).collect();
        let [year, month, id] = cols.as_slice() else {
            return Err(corrupt(line_no, format!("expected 3 columns, found {}", cols.len())).into());
        };
        let year = year
            .parse::<i32>()
            .map_err(|_| corrupt(line_no, format!("invalid year `{year}`")))?;
        let month = month
            .parse::<u32>()
            .map_err(|_| corrupt(line_no, format!("invalid month `{month}`")))?;
        let key = MonthKey::new(year, month)
            .map_err(|_| corrupt(line_no, format!("month out of range `{year}-{month}`")))?;
        if id.is_empty() {
            return Err(corrupt(line_no, "empty playlist id".to_string()).into());
        }
        if entries.insert(key, (*id).to_string()).is_some() {
            return Err(corrupt(line_no, format!("duplicate entry for {key}")).into());
        }
    }
    Ok(entries)
}
