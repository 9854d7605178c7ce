use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc};
use std::fmt;
use std::str::FromStr;

use crate::error::SyncError;

pub const DEFAULT_LABEL_FORMAT: &str = "%b %y";

/// Calendar month used as both partition key and ledger key.
///
/// Field order matters: the derived `Ord` sorts by year, then month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Result<Self, SyncError> {
        if !(1..=9999).contains(&year) || !(1..=12).contains(&month) {
            return Err(SyncError::InvalidMonth(format!("{year}-{month}")));
        }
        Ok(Self { year, month })
    }

    pub fn year(self) -> i32 {
        self.year
    }

    pub fn month(self) -> u32 {
        self.month
    }

    /// Month containing `at`, evaluated in UTC.
    pub fn of(at: &DateTime<Utc>) -> Self {
        Self {
            year: at.year(),
            month: at.month(),
        }
    }

    /// The month before the one containing `now`.
    pub fn previous(now: &DateTime<Utc>) -> Self {
        Self::of(now).pred()
    }

    pub fn succ(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn pred(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn first_day(self) -> NaiveDate {
        // year and month are range-checked on construction
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    /// Midnight UTC on the first day of the month.
    pub fn first_instant(self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.first_day().and_time(NaiveTime::default()))
    }

    /// Human-readable playlist name, `May 23` with the default format.
    ///
    /// `format` must have passed [`is_valid_label_format`].
    pub fn label(self, format: &str) -> String {
        self.first_day().format(format).to_string()
    }

    /// Every month from `from` through `to`, both inclusive. Empty when `to < from`.
    pub fn range_inclusive(from: Self, to: Self) -> Vec<Self> {
        let mut out = Vec::new();
        let mut cursor = from;
        while cursor <= to {
            out.push(cursor);
            cursor = cursor.succ();
        }
        out
    }
}

pub fn is_valid_label_format(format: &str) -> bool {
    !format.trim().is_empty()
        && !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = SyncError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || SyncError::InvalidMonth(raw.to_string());
        let trimmed = raw.trim();
        let (year, month) = trimmed.split_once('-').ok_or_else(invalid)?;
        let all_digits = |s: &str| !s.is_empty() && s.chars().all(|ch| ch.is_ascii_digit());
        if year.len() != 4 || !all_digits(year) || month.len() > 2 || !all_digits(month) {
            return Err(invalid());
        }
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}
