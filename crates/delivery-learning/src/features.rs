//! Raw model features derived from a normalized delivery table.
//!
//! [`prepare`] keeps the rows usable for training (valid ATD within the
//! configured bounds), derives the time and distance features and returns
//! them as a column-major [`FeatureMatrix`] alongside the targets. Missing
//! values stay missing here; imputation happens in
//! [`FeaturePreprocessor`](crate::FeaturePreprocessor).

use crate::config::TrainerConfig;
use crate::error::{LearningError, Result};
use chrono::{DateTime, Datelike, Timelike};
use delivery_processing::{ProcessingError, columns};
use delivery_processing::utils::{datetime_millis, f64_values, string_values};
use polars::prelude::DataFrame;
use serde::Serialize;
use tracing::debug;

/// Numeric model features, in encoding order.
pub const NUMERIC_FEATURES: [&str; 6] = [
    "pickup_distance",
    "dropoff_distance",
    "total_distance_km",
    "hour_of_day",
    "day_of_week",
    "is_weekend",
];

/// Categorical model features, in encoding order.
pub const CATEGORICAL_FEATURES: [&str; 4] = [
    columns::TERRITORY,
    columns::COURIER_FLOW,
    columns::MERCHANT_SURFACE,
    columns::GEO_ARCHETYPE,
];

/// Raw feature values, one vector per feature, aligned by row.
///
/// `numeric[i]` holds [`NUMERIC_FEATURES`]`[i]` and `categorical[j]` holds
/// [`CATEGORICAL_FEATURES`]`[j]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureMatrix {
    pub(crate) numeric: Vec<Vec<Option<f64>>>,
    pub(crate) categorical: Vec<Vec<Option<String>>>,
    rows: usize,
}

impl FeatureMatrix {
    /// Build a matrix from per-feature columns.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::ShapeMismatch`] if the number of columns does
    /// not match the feature lists or the columns differ in length.
    pub fn new(
        numeric: Vec<Vec<Option<f64>>>,
        categorical: Vec<Vec<Option<String>>>,
    ) -> Result<Self> {
        if numeric.len() != NUMERIC_FEATURES.len() || categorical.len() != CATEGORICAL_FEATURES.len()
        {
            return Err(LearningError::ShapeMismatch {
                expected: format!(
                    "{} numeric and {} categorical columns",
                    NUMERIC_FEATURES.len(),
                    CATEGORICAL_FEATURES.len()
                ),
                actual: format!(
                    "{} numeric and {} categorical columns",
                    numeric.len(),
                    categorical.len()
                ),
            });
        }

        let rows = numeric.first().map_or(0, Vec::len);
        let lengths_match = numeric.iter().all(|c| c.len() == rows)
            && categorical.iter().all(|c| c.len() == rows);
        if !lengths_match {
            return Err(LearningError::ShapeMismatch {
                expected: format!("{rows} rows in every column"),
                actual: "columns of differing length".to_string(),
            });
        }

        Ok(Self {
            numeric,
            categorical,
            rows,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Values of a numeric feature by name.
    pub fn numeric_column(&self, name: &str) -> Option<&[Option<f64>]> {
        NUMERIC_FEATURES
            .iter()
            .position(|&feature| feature == name)
            .map(|idx| self.numeric[idx].as_slice())
    }

    /// Values of a categorical feature by name.
    pub fn categorical_column(&self, name: &str) -> Option<&[Option<String>]> {
        CATEGORICAL_FEATURES
            .iter()
            .position(|&feature| feature == name)
            .map(|idx| self.categorical[idx].as_slice())
    }

    /// A new matrix with the given rows, in the given order.
    pub(crate) fn select(&self, indices: &[usize]) -> Self {
        Self {
            numeric: self
                .numeric
                .iter()
                .map(|column| indices.iter().map(|&i| column[i]).collect())
                .collect(),
            categorical: self
                .categorical
                .iter()
                .map(|column| indices.iter().map(|&i| column[i].clone()).collect())
                .collect(),
            rows: indices.len(),
        }
    }
}

/// Features and targets of the rows usable for training.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub features: FeatureMatrix,
    pub targets: Vec<f64>,
}

/// Keep trainable rows and derive the model features.
///
/// A row is trainable when its ATD is present and within
/// `[config.atd_min, config.atd_max]`. Hour of day and day of week (Monday
/// is 0) come from the order's final-state local timestamp; an unparsed
/// timestamp leaves both missing and the weekend flag 0. Total distance
/// treats a missing leg as zero.
///
/// # Errors
///
/// Returns [`LearningError::ColumnNotFound`] if ATD, a distance column or a
/// categorical column is absent. An absent timestamp column is treated as
/// all-missing.
pub fn prepare(df: &DataFrame, config: &TrainerConfig) -> Result<PreparedData> {
    let atd = f64_values(df, columns::ATD).map_err(column_error)?;
    let keep: Vec<usize> = atd
        .iter()
        .enumerate()
        .filter_map(|(idx, value)| {
            value
                .filter(|v| *v >= config.atd_min && *v <= config.atd_max)
                .map(|_| idx)
        })
        .collect();
    let targets: Vec<f64> = keep.iter().filter_map(|&i| atd[i]).collect();

    let pickup = numeric_rows(df, columns::PICKUP_DISTANCE, &keep)?;
    let dropoff = numeric_rows(df, columns::DROPOFF_DISTANCE, &keep)?;
    let total: Vec<Option<f64>> = pickup
        .iter()
        .zip(&dropoff)
        .map(|(p, d)| Some(p.unwrap_or(0.0) + d.unwrap_or(0.0)))
        .collect();

    let timestamps: Vec<Option<i64>> = match datetime_millis(df, columns::ORDER_FINAL_STATE_TIMESTAMP) {
        Ok(millis) => keep.iter().map(|&i| millis[i]).collect(),
        Err(ProcessingError::ColumnNotFound(_)) => vec![None; keep.len()],
        Err(other) => return Err(other.into()),
    };
    let hour: Vec<Option<f64>> = timestamps
        .iter()
        .map(|ts| ts.and_then(DateTime::from_timestamp_millis).map(|dt| f64::from(dt.hour())))
        .collect();
    let day: Vec<Option<f64>> = timestamps
        .iter()
        .map(|ts| {
            ts.and_then(DateTime::from_timestamp_millis)
                .map(|dt| f64::from(dt.weekday().num_days_from_monday()))
        })
        .collect();
    let weekend: Vec<Option<f64>> = day
        .iter()
        .map(|d| Some(if matches!(d, Some(v) if *v >= 5.0) { 1.0 } else { 0.0 }))
        .collect();

    let mut categorical = Vec::with_capacity(CATEGORICAL_FEATURES.len());
    for name in CATEGORICAL_FEATURES {
        let values = string_values(df, name).map_err(column_error)?;
        categorical.push(keep.iter().map(|&i| values[i].clone()).collect());
    }

    let features = FeatureMatrix::new(
        vec![pickup, dropoff, total, hour, day, weekend],
        categorical,
    )?;
    debug!(
        input_rows = df.height(),
        trainable_rows = features.rows(),
        "Prepared model features"
    );

    Ok(PreparedData { features, targets })
}

fn numeric_rows(df: &DataFrame, name: &str, keep: &[usize]) -> Result<Vec<Option<f64>>> {
    let values = f64_values(df, name).map_err(column_error)?;
    Ok(keep.iter().map(|&i| values[i]).collect())
}

fn column_error(err: ProcessingError) -> LearningError {
    match err {
        ProcessingError::ColumnNotFound(name) => LearningError::ColumnNotFound(name),
        other => other.into(),
    }
}
