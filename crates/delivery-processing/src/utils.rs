//! Shared utilities for delivery-record processing.
//!
//! Value parsing, column extraction and small statistics helpers used by the
//! preprocessor, the KPI calculator and the chart builders.

use crate::error::{ProcessingError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is a datetime type.
#[inline]
pub fn is_datetime_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Datetime(_, _) | DataType::Date)
}

// =============================================================================
// String Parsing Utilities
// =============================================================================

/// Common missing value markers in delivery exports.
pub const MISSING_MARKERS: [&str; 10] = [
    "", "nan", "null", "none", "n/a", "na", "#n/a", "missing", "error", "unknown",
];

/// Check if a string is a missing value marker.
///
/// ```rust
/// use delivery_processing::utils::is_missing_marker;
///
/// assert!(is_missing_marker("  N/A "));
/// assert!(is_missing_marker(""));
/// assert!(!is_missing_marker("42"));
/// ```
pub fn is_missing_marker(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    MISSING_MARKERS.iter().any(|&marker| lower == marker)
}

/// Parse a string as a finite f64.
///
/// Only plain decimal or scientific notation is accepted; anything else
/// (units, currency, `inf`) is treated as missing.
pub fn parse_numeric_string(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if is_missing_marker(trimmed) {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Datetime layouts accepted for naive (offset-free) timestamps.
const DATETIME_FORMATS: [&str; 9] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
];

/// Date-only layouts, interpreted as midnight.
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Parse a timestamp string into wall-clock milliseconds since the epoch.
///
/// Timestamps carrying an offset keep their local wall-clock time. Integer
/// strings are read as epoch seconds or milliseconds depending on magnitude.
pub fn parse_timestamp_millis(s: &str) -> Option<i64> {
    let trimmed = s.trim();
    if is_missing_marker(trimmed) {
        return None;
    }

    if let Ok(with_offset) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(with_offset.naive_local().and_utc().timestamp_millis());
    }
    if let Ok(with_offset) = DateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(with_offset.naive_local().and_utc().timestamp_millis());
    }
    if let Ok(with_offset) = DateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(with_offset.naive_local().and_utc().timestamp_millis());
    }

    // A trailing "UTC" or "Z" is common in exports that are otherwise naive.
    let naive_part = trimmed
        .strip_suffix(" UTC")
        .or_else(|| trimmed.strip_suffix('Z'))
        .unwrap_or(trimmed);

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(naive_part, format) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(naive_part, format) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|naive| naive.and_utc().timestamp_millis());
        }
    }

    trimmed.parse::<i64>().ok().and_then(epoch_to_millis)
}

/// Interpret an integer epoch as seconds or milliseconds.
///
/// Only values that land between 2001 and 2033 are accepted; anything else
/// is too ambiguous to guess.
pub fn epoch_to_millis(timestamp: i64) -> Option<i64> {
    if timestamp > 1_000_000_000 && timestamp < 2_000_000_000 {
        Some(timestamp * 1000)
    } else if timestamp > 1_000_000_000_000 && timestamp < 2_000_000_000_000 {
        Some(timestamp)
    } else {
        None
    }
}

// =============================================================================
// Column Extraction Utilities
// =============================================================================

/// Read a column as optional f64 values, one per row.
///
/// NaN is reported as missing. Non-numeric columns are cast non-strictly,
/// so unparseable cells also come back as `None`.
pub fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| ProcessingError::ColumnNotFound(name.to_string()))?;
    let casted = column.as_materialized_series().cast(&DataType::Float64)?;
    Ok(casted
        .f64()?
        .into_iter()
        .map(|value| value.filter(|v| !v.is_nan()))
        .collect())
}

/// Read a column as optional strings, one per row.
pub fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .map_err(|_| ProcessingError::ColumnNotFound(name.to_string()))?;
    let casted = column.as_materialized_series().cast(&DataType::String)?;
    Ok(casted
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect())
}

/// Read a datetime column as wall-clock milliseconds since the epoch.
pub fn datetime_millis(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>> {
    let column = df
        .column(name)
        .map_err(|_| ProcessingError::ColumnNotFound(name.to_string()))?;
    let series = column.as_materialized_series();
    let millis = match series.dtype() {
        DataType::Datetime(_, _) => series
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
            .cast(&DataType::Int64)?,
        _ => return Ok(vec![None; series.len()]),
    };
    Ok(millis.i64()?.into_iter().collect())
}

// =============================================================================
// Statistics Utilities
// =============================================================================

/// Arithmetic mean, NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Linearly interpolated quantile of an ascending slice, NaN when empty.
///
/// Uses the `(n - 1) * q` rank definition, matching numpy's default.
pub fn quantile_sorted(values: &[f64], quantile: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let pos = quantile.clamp(0.0, 1.0) * (values.len() as f64 - 1.0);
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        return values[lower];
    }
    let weight = pos - lower as f64;
    values[lower] + (values[upper] - values[lower]) * weight
}

/// Sort values ascending. NaN is not expected here; callers filter it out.
pub fn sort_values(values: &mut [f64]) {
    values.sort_by(|a, b| a.total_cmp(b));
}
