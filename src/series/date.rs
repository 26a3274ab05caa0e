//! Calendar date value type.
//!
//! A `Date` is exactly a (year, month, day) triple. Equality and ordering are
//! derived field by field in that order, so time-of-day can never leak into
//! comparisons. Calendar arithmetic goes through `chrono::NaiveDate`.

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{HedgeError, Result};

/// Days per year of the Actual/365 day count.
pub const DAYS_PER_YEAR: f64 = 365.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Date {
    year: i32,
    month: u32,
    day: u32,
}

impl Date {
    /// Builds a date, rejecting impossible calendar days (e.g. 30 February).
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self::from_naive)
            .ok_or_else(|| {
                HedgeError::invalid(format!(
                    "{day:02}/{month:02}/{year} is not a calendar date"
                ))
            })
    }

    /// Parses `dd/mm/yyyy` (the row format of the price files) or ISO `yyyy-mm-dd`.
    ///
    /// Surrounding whitespace and a leading UTF-8 byte-order mark are ignored.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim_start_matches('\u{feff}').trim();
        NaiveDate::parse_from_str(trimmed, "%d/%m/%Y")
            .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y-%m-%d"))
            .map(Self::from_naive)
            .map_err(|e| HedgeError::Parse {
                input: text.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn from_naive(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    fn naive(&self) -> NaiveDate {
        // Fields only ever come from a valid NaiveDate.
        NaiveDate::from_ymd_opt(self.year, self.month, self.day).unwrap_or_default()
    }

    /// The following calendar day.
    pub fn succ(&self) -> Option<Self> {
        self.naive().succ_opt().map(Self::from_naive)
    }

    /// The preceding calendar day.
    pub fn pred(&self) -> Option<Self> {
        self.naive().pred_opt().map(Self::from_naive)
    }

    /// Moves by `days` calendar days (negative moves backwards).
    pub fn add_days(&self, days: i64) -> Option<Self> {
        let base = self.naive();
        let shifted = if days >= 0 {
            base.checked_add_days(Days::new(days.unsigned_abs()))
        } else {
            base.checked_sub_days(Days::new(days.unsigned_abs()))
        };
        shifted.map(Self::from_naive)
    }

    /// Moves by `months` calendar months. The day is clamped to the end of the
    /// target month (31 March minus one month is 28 or 29 February).
    pub fn add_months(&self, months: i32) -> Option<Self> {
        let base = self.naive();
        let shifted = if months >= 0 {
            base.checked_add_months(Months::new(months.unsigned_abs()))
        } else {
            base.checked_sub_months(Months::new(months.unsigned_abs()))
        };
        shifted.map(Self::from_naive)
    }

    /// Signed number of calendar days from `self` to `other`.
    pub fn days_until(&self, other: &Date) -> i64 {
        other.naive().signed_duration_since(self.naive()).num_days()
    }

    /// Actual/365 year fraction from `self` to `other`.
    pub fn year_fraction(&self, other: &Date) -> f64 {
        self.days_until(other) as f64 / DAYS_PER_YEAR
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:02}/{:04}", self.day, self.month, self.year)
    }
}

impl FromStr for Date {
    type Err = HedgeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<NaiveDate> for Date {
    fn from(date: NaiveDate) -> Self {
        Self::from_naive(date)
    }
}
