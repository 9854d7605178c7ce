use std::path::PathBuf;

use thiserror::Error;

use crate::sync::month::MonthKey;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("spotify request failed ({status}): {message}")]
    Transport { status: String, message: String },
    #[error("ledger already has a playlist for {key}: {existing}")]
    DuplicateMonth { key: MonthKey, existing: String },
    #[error("invalid month `{0}`: expected YYYY-MM")]
    InvalidMonth(String),
    #[error("ledger {} is corrupt at line {line}: {reason}", path.display())]
    LedgerCorrupt {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    #[error("pagination cursor did not advance: {0}")]
    StalledCursor(String),
    #[error("spotify credentials missing: {0}")]
    MissingCredentials(String),
    #[error("another monthsync run holds {}", .0.display())]
    RunInProgress(PathBuf),
}

impl SyncError {
    pub fn transport(status: impl ToString, message: impl Into<String>) -> Self {
        Self::Transport {
            status: status.to_string(),
            message: message.into(),
        }
    }
}
