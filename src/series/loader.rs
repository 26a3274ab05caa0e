//! Building series from `(date, value)` text rows.
//!
//! Price files are `;`-delimited, one `dd/mm/yyyy;value` row per line and no
//! header. Values that do not parse are read as `0.0`.

use std::path::Path;

use anyhow::{Context, Result as AnyResult};
use csv::ReaderBuilder;
use tracing::{info, warn};

use super::{Date, DatedSeries};
use crate::error::{HedgeError, Result};

/// Parses a value cell, falling back to `0.0` for text that is not a number.
pub fn parse_value(text: &str) -> f64 {
    match text.trim().parse::<f64>() {
        Ok(v) => v,
        Err(_) => {
            warn!(input = %text, "unparsable value read as 0.0");
            0.0
        }
    }
}

/// Builds a series from exactly `declared_size` rows.
///
/// # Errors
///
/// * [`HedgeError::SizeMismatch`] if the number of rows differs from `declared_size`
/// * [`HedgeError::Parse`] if a date cell cannot be read
/// * any error of [`DatedSeries::new`] (empty input, unordered dates)
pub fn from_rows<I, D, V>(name: &str, declared_size: usize, rows: I) -> Result<DatedSeries>
where
    I: IntoIterator<Item = (D, V)>,
    D: AsRef<str>,
    V: AsRef<str>,
{
    let rows: Vec<(D, V)> = rows.into_iter().collect();
    if rows.len() != declared_size {
        return Err(HedgeError::SizeMismatch {
            expected: declared_size,
            actual: rows.len(),
        }
        .traced());
    }

    let mut dates = Vec::with_capacity(rows.len());
    let mut values = Vec::with_capacity(rows.len());
    for (date, value) in &rows {
        dates.push(Date::parse(date.as_ref()).map_err(HedgeError::traced)?);
        values.push(parse_value(value.as_ref()));
    }
    DatedSeries::new(name, dates, values)
}

fn read_rows(path: &Path) -> AnyResult<Vec<(String, String)>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening price file {}", path.display()))?;

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record =
            record.with_context(|| format!("reading line {} of {}", line + 1, path.display()))?;
        let date = record.get(0).unwrap_or_default();
        if date.trim().is_empty() {
            continue;
        }
        let value = record.get(1).unwrap_or_default();
        rows.push((date.to_string(), value.to_string()));
    }
    Ok(rows)
}

/// Loads every row of a `;`-delimited price file.
pub fn load_csv(path: impl AsRef<Path>, name: &str) -> AnyResult<DatedSeries> {
    let path = path.as_ref();
    let rows = read_rows(path)?;
    let size = rows.len();
    let series = from_rows(name, size, rows)
        .with_context(|| format!("building series {name} from {}", path.display()))?;
    info!(series = %name, len = size, file = %path.display(), "series loaded");
    Ok(series)
}

/// Loads a price file that must contain exactly `declared_size` rows.
pub fn load_csv_sized(
    path: impl AsRef<Path>,
    name: &str,
    declared_size: usize,
) -> AnyResult<DatedSeries> {
    let path = path.as_ref();
    let rows = read_rows(path)?;
    let series = from_rows(name, declared_size, rows)
        .with_context(|| format!("building series {name} from {}", path.display()))?;
    info!(series = %name, len = declared_size, file = %path.display(), "series loaded");
    Ok(series)
}
