//! Model explanation: evaluation metrics, feature importance and partial
//! dependence.
//!
//! Partial dependence works on *encoded* columns. For a numeric feature the
//! grid is reported back in the feature's original units; for a one-hot
//! indicator such as `territory_A` the grid is `0` and `1`.

use crate::error::{LearningError, Result};
use crate::features::FeatureMatrix;
use crate::model::TrainedModel;
use crate::preprocessing::EncodedColumn;
use delivery_processing::utils::{quantile_sorted, sort_values};
use serde::Serialize;
use tracing::debug;

/// Grids larger than this are replaced by evenly spaced percentile points.
pub const MAX_GRID_POINTS: usize = 100;

// =============================================================================
// Evaluation
// =============================================================================

/// Regression metrics on held-out rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegressionMetrics {
    pub mae: f64,
    pub rmse: f64,
    /// NaN when the targets have zero variance.
    pub r2: f64,
}

impl RegressionMetrics {
    /// MAE, RMSE and R² of `y_pred` against `y_true`.
    ///
    /// Empty input gives NaN for every metric. Only the common prefix is
    /// used if the slices differ in length.
    pub fn compute(y_true: &[f64], y_pred: &[f64]) -> Self {
        let n = y_true.len().min(y_pred.len());
        if n == 0 {
            return Self {
                mae: f64::NAN,
                rmse: f64::NAN,
                r2: f64::NAN,
            };
        }
        let (y_true, y_pred) = (&y_true[..n], &y_pred[..n]);

        let mut abs_sum = 0.0;
        let mut sq_sum = 0.0;
        for (t, p) in y_true.iter().zip(y_pred) {
            abs_sum += (t - p).abs();
            sq_sum += (t - p).powi(2);
        }

        let mean = y_true.iter().sum::<f64>() / n as f64;
        let total: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
        let r2 = if total > 0.0 {
            1.0 - sq_sum / total
        } else {
            f64::NAN
        };

        Self {
            mae: abs_sum / n as f64,
            rmse: (sq_sum / n as f64).sqrt(),
            r2,
        }
    }
}

/// Human-readable evaluation summary shown next to the model charts.
pub fn evaluation_text(y_true: &[f64], y_pred: &[f64]) -> String {
    let metrics = RegressionMetrics::compute(y_true, y_pred);
    format!(
        "MAE: {:.2} minutes\n\
         R-squared: {:.3}\n\
         \n\
         Interpretation:\n\
         - MAE = average prediction error.\n\
         - Higher R² means better ability to explain ATD variation.\n\
         - Random Forest models capture non-linear effects and interactions.\n",
        metrics.mae, metrics.r2
    )
}

// =============================================================================
// Feature Importance
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Importance of every encoded feature, most important first.
///
/// The sort is stable: equal importances keep encoding order.
pub fn feature_importance(model: &TrainedModel) -> Vec<FeatureImportance> {
    let mut ranked: Vec<FeatureImportance> = model
        .feature_names()
        .iter()
        .zip(model.importances())
        .map(|(feature, &importance)| FeatureImportance {
            feature: feature.clone(),
            importance,
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    ranked
}

// =============================================================================
// Partial Dependence
// =============================================================================

/// Average model prediction as one encoded feature is swept over a grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartialDependence {
    pub feature: String,
    /// Grid values in the feature's original units.
    pub grid: Vec<f64>,
    /// Mean predicted ATD at each grid value.
    pub average: Vec<f64>,
}

impl PartialDependence {
    /// `(grid, average)` pairs, ready for a line chart.
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.grid.iter().copied().zip(self.average.iter().copied()).collect()
    }
}

/// Partial dependence of the model's prediction on one encoded feature.
///
/// The grid is the distinct values the encoded column takes in `features`,
/// or [`MAX_GRID_POINTS`] evenly spaced points between its 5th and 95th
/// percentiles when there are more distinct values than that. At each grid
/// value the column is overwritten for every row and the forest predictions
/// are averaged.
///
/// # Errors
///
/// - [`LearningError::FeatureNotFound`] if `feature_name` is not an encoded
///   feature of the model
/// - [`LearningError::DegenerateFeature`] if the column has fewer than two
///   distinct values in `features`
pub fn partial_dependence(
    model: &TrainedModel,
    features: &FeatureMatrix,
    feature_name: &str,
) -> Result<PartialDependence> {
    let preprocessor = model.preprocessor();
    let (column, kind) = preprocessor
        .encoded_column(feature_name)
        .ok_or_else(|| LearningError::FeatureNotFound(feature_name.to_string()))?;

    let mut encoded = preprocessor.transform(features);
    let mut values: Vec<f64> = encoded.column(column).to_vec();
    sort_values(&mut values);
    let mut distinct = values.clone();
    distinct.dedup();

    if distinct.len() < 2 {
        return Err(LearningError::DegenerateFeature {
            feature: feature_name.to_string(),
            distinct: distinct.len(),
        });
    }

    let grid = if distinct.len() > MAX_GRID_POINTS {
        linspace(
            quantile_sorted(&values, 0.05),
            quantile_sorted(&values, 0.95),
            MAX_GRID_POINTS,
        )
    } else {
        distinct
    };

    let mut average = Vec::with_capacity(grid.len());
    for &value in &grid {
        encoded.column_mut(column).fill(value);
        let predictions = model.predict_encoded(&encoded)?;
        average.push(predictions.iter().sum::<f64>() / predictions.len() as f64);
    }

    let grid = match kind {
        EncodedColumn::Numeric(idx) => {
            let transform = &preprocessor.numeric_transforms()[idx];
            grid.into_iter().map(|v| transform.invert(v)).collect()
        }
        EncodedColumn::Indicator => grid,
    };

    debug!(
        feature = feature_name,
        grid_points = grid.len(),
        "Computed partial dependence"
    );

    Ok(PartialDependence {
        feature: feature_name.to_string(),
        grid,
        average,
    })
}

fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    if count < 2 {
        return vec![start; count];
    }
    let step = (end - start) / (count - 1) as f64;
    (0..count).map(|i| start + step * i as f64).collect()
}
