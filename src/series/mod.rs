//! Calendar-indexed price series.
//!
//! A [`DatedSeries`] is an immutable, strictly ascending sequence of
//! `(date, value)` observations addressed by 1-based indices. Besides index and
//! exact-date lookups it resolves arbitrary calendar dates to the nearest
//! observation and shifts dates by whole months or days.

pub mod date;
pub mod loader;

pub use date::{Date, DAYS_PER_YEAR};
pub use loader::{from_rows, load_csv, load_csv_sized, parse_value};

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::{debug, warn};

use crate::error::{HedgeError, Result};

/// Unit of a calendar shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShiftUnit {
    Months,
    Days,
}

/// Whether a shift moves before or after its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Before,
    After,
}

/// Which observation to pick when a shifted date has no row of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fallback {
    /// First observation on or after the date.
    Next,
    /// Last observation on or before the date.
    Previous,
}

impl Fallback {
    fn is_forward(self) -> bool {
        matches!(self, Fallback::Next)
    }
}

/// Starting point of a shift: a 1-based index or a calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Index(usize),
    Date(Date),
}

impl From<usize> for Anchor {
    fn from(index: usize) -> Self {
        Anchor::Index(index)
    }
}

impl From<Date> for Anchor {
    fn from(date: Date) -> Self {
        Anchor::Date(date)
    }
}

/// Descriptive statistics of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub len: usize,
    pub first_date: Date,
    pub last_date: Date,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatedSeries {
    name: String,
    dates: Vec<Date>,
    values: Vec<f64>,
}

impl DatedSeries {
    /// Creates a series from parallel date and value vectors.
    ///
    /// # Errors
    ///
    /// * [`HedgeError::SizeMismatch`] if the vectors differ in length
    /// * [`HedgeError::InvalidParameter`] if the series is empty or the dates are
    ///   not strictly ascending
    pub fn new(name: impl Into<String>, dates: Vec<Date>, values: Vec<f64>) -> Result<Self> {
        let name = name.into();
        if dates.len() != values.len() {
            return Err(HedgeError::SizeMismatch {
                expected: dates.len(),
                actual: values.len(),
            }
            .traced());
        }
        if dates.is_empty() {
            return Err(HedgeError::invalid(format!("series {name} has no observations")).traced());
        }
        if let Some(pos) = dates.windows(2).position(|w| w[0] >= w[1]) {
            return Err(HedgeError::invalid(format!(
                "series {name}: date {} at index {} does not follow {}",
                dates[pos + 1],
                pos + 2,
                dates[pos]
            ))
            .traced());
        }
        debug!(series = %name, len = dates.len(), "series created");
        Ok(Self {
            name,
            dates,
            values,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        let name = name.into();
        debug!(from = %self.name, to = %name, "series renamed");
        self.name = name;
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Always false: a series holds at least one observation.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn first_date(&self) -> Date {
        self.dates[0]
    }

    pub fn last_date(&self) -> Date {
        self.dates[self.dates.len() - 1]
    }

    pub fn dates(&self) -> &[Date] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Iterates `(index, date, value)` with 1-based indices.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Date, f64)> + '_ {
        self.dates
            .iter()
            .zip(&self.values)
            .enumerate()
            .map(|(i, (d, v))| (i + 1, *d, *v))
    }

    fn check_index(&self, index: usize) -> Result<usize> {
        if index < 1 || index > self.len() {
            return Err(HedgeError::out_of_range(format!(
                "index {index} outside 1..={} of series {}",
                self.len(),
                self.name
            ))
            .traced());
        }
        Ok(index - 1)
    }

    pub fn value_at(&self, index: usize) -> Result<f64> {
        self.check_index(index).map(|i| self.values[i])
    }

    pub fn date_at(&self, index: usize) -> Result<Date> {
        self.check_index(index).map(|i| self.dates[i])
    }

    /// Index of the observation dated exactly `date`.
    pub fn index_of(&self, date: Date) -> Result<usize> {
        self.dates.binary_search(&date).map(|i| i + 1).map_err(|_| {
            HedgeError::not_found(format!("no observation on {date} in series {}", self.name))
                .traced()
        })
    }

    /// Value observed exactly on `date`.
    pub fn value_on(&self, date: Date) -> Result<f64> {
        self.index_of(date).and_then(|i| self.value_at(i))
    }

    /// Resolves `date` to the nearest observation in the requested direction.
    ///
    /// Dates past the last observation resolve to the last index, dates before
    /// the first to the first index. Otherwise the date is moved one calendar
    /// day at a time until it hits an observation, so the cost grows with the
    /// calendar gap between observations rather than their count.
    pub fn approx_index(&self, date: Date, forward: bool) -> usize {
        if date > self.last_date() {
            if forward {
                warn!(
                    series = %self.name,
                    %date,
                    "date after last observation, clamped to last index"
                );
            }
            return self.len();
        }
        if date < self.first_date() {
            if !forward {
                warn!(
                    series = %self.name,
                    %date,
                    "date before first observation, clamped to first index"
                );
            }
            return 1;
        }

        let mut candidate = date;
        loop {
            if let Ok(i) = self.dates.binary_search(&candidate) {
                return i + 1;
            }
            let step = if forward { candidate.succ() } else { candidate.pred() };
            match step {
                Some(next) => candidate = next,
                // Unreachable inside [first, last]; stay within the series anyway.
                None => return if forward { self.len() } else { 1 },
            }
        }
    }

    /// Shifts `anchor` by `count` months or days and resolves the result with
    /// [`approx_index`](Self::approx_index).
    pub fn shift(
        &self,
        anchor: impl Into<Anchor>,
        count: u32,
        unit: ShiftUnit,
        direction: Direction,
        fallback: Fallback,
    ) -> Result<usize> {
        let base = match anchor.into() {
            Anchor::Index(index) => self.date_at(index)?,
            Anchor::Date(date) => date,
        };
        let signed = match direction {
            Direction::After => i64::from(count),
            Direction::Before => -i64::from(count),
        };
        let shifted = match unit {
            ShiftUnit::Days => base.add_days(signed),
            ShiftUnit::Months => i32::try_from(signed)
                .ok()
                .and_then(|months| base.add_months(months)),
        };
        let target = shifted.ok_or_else(|| {
            HedgeError::invalid(format!(
                "shifting {base} by {count} {unit:?} {direction:?} leaves the calendar"
            ))
            .traced()
        })?;
        Ok(self.approx_index(target, fallback.is_forward()))
    }

    pub fn shift_months(
        &self,
        anchor: impl Into<Anchor>,
        months: u32,
        direction: Direction,
        fallback: Fallback,
    ) -> Result<usize> {
        self.shift(anchor, months, ShiftUnit::Months, direction, fallback)
    }

    pub fn shift_days(
        &self,
        anchor: impl Into<Anchor>,
        days: u32,
        direction: Direction,
        fallback: Fallback,
    ) -> Result<usize> {
        self.shift(anchor, days, ShiftUnit::Days, direction, fallback)
    }

    pub fn summary(&self) -> SeriesSummary {
        SeriesSummary {
            len: self.len(),
            first_date: self.first_date(),
            last_date: self.last_date(),
            min: Statistics::min(self.values.iter()),
            max: Statistics::max(self.values.iter()),
            mean: Statistics::mean(self.values.iter()),
        }
    }

    /// Annualised realised volatility of log returns between two indices
    /// (Actual/365), i.e. `sqrt(sum(ln(S_i/S_{i-1})^2) / T)`.
    pub fn realized_vol(&self, start: usize, end: usize) -> Result<f64> {
        let s = self.check_index(start)?;
        let e = self.check_index(end)?;
        if s >= e {
            return Err(HedgeError::invalid(format!(
                "realized vol needs start < end, got {start} - {end}"
            ))
            .traced());
        }
        let years = self.dates[s].year_fraction(&self.dates[e]);
        let quadratic_variation: f64 = self.values[s..=e]
            .windows(2)
            .map(|w| (w[1] / w[0]).ln().powi(2))
            .sum();
        Ok((quadratic_variation / years).sqrt())
    }
}
