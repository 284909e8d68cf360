//! Type normalization and categorical filtering of delivery records.
//!
//! [`normalize`] turns a raw, all-string table into typed columns without
//! ever failing on a bad cell. [`filter`] applies a [`FilterSelection`] and
//! returns a new frame, leaving its input untouched.

mod converters;

use crate::error::{ProcessingError, Result, ResultExt};
use crate::types::{FilterSelection, columns};
use crate::utils::string_values;
use polars::prelude::*;
use std::collections::BTreeSet;
use tracing::debug;

/// Coerce numeric columns, parse timestamps and stringify categories.
///
/// Columns that are absent are skipped, so a dataset without one of the
/// optional timestamp columns normalizes fine. The row count never changes.
pub fn normalize(df: &DataFrame) -> Result<DataFrame> {
    let mut normalized = df.clone();

    for name in columns::NUMERIC {
        if let Ok(column) = df.column(name) {
            let series = column.as_materialized_series();
            let converted = converters::to_float64(series)?;
            debug!(
                column = name,
                nulls_before = series.null_count(),
                nulls_after = converted.null_count(),
                "Coerced numeric column"
            );
            normalized
                .with_column(converted)
                .context(format!("Replacing column '{name}'"))?;
        }
    }

    for name in columns::TIMESTAMPS {
        match df.column(name) {
            Ok(column) => {
                let series = column.as_materialized_series();
                let converted = converters::to_datetime(series)?;
                debug!(
                    column = name,
                    unparsed = converted.null_count(),
                    "Parsed timestamp column"
                );
                normalized
                    .with_column(converted)
                    .context(format!("Replacing column '{name}'"))?;
            }
            Err(_) => debug!(column = name, "Timestamp column absent, skipping"),
        }
    }

    for name in columns::CATEGORICAL {
        if let Ok(column) = df.column(name) {
            let converted = converters::to_category_string(column.as_materialized_series())?;
            normalized
                .with_column(converted)
                .context(format!("Replacing column '{name}'"))?;
        }
    }

    Ok(normalized)
}

/// Keep the rows matching every restricted dimension of `selection`.
///
/// Row order is preserved. A fully unrestricted selection returns a copy of
/// the input. Restricting on a column the table does not have is an error.
pub fn filter(df: &DataFrame, selection: &FilterSelection) -> Result<DataFrame> {
    if selection.is_unrestricted() {
        return Ok(df.clone());
    }

    let mut keep = vec![true; df.height()];
    for (name, restriction) in selection.dimensions() {
        if restriction.is_unrestricted() {
            continue;
        }
        let values = string_values(df, name)?;
        for (flag, value) in keep.iter_mut().zip(values.iter()) {
            *flag = *flag && restriction.allows(value.as_deref());
        }
    }

    let mask = Series::new("mask".into(), keep);
    let filtered = df.filter(mask.bool()?)?;
    debug!(
        rows_before = df.height(),
        rows_after = filtered.height(),
        "Applied filter selection"
    );
    Ok(filtered)
}

/// Sorted distinct non-null values of a categorical column.
pub fn distinct_values(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    if df.column(name).is_err() {
        return Err(ProcessingError::ColumnNotFound(name.to_string()));
    }
    let distinct: BTreeSet<String> = string_values(df, name)?.into_iter().flatten().collect();
    Ok(distinct.into_iter().collect())
}
