//! Feature preprocessing: imputation, scaling and one-hot encoding.
//!
//! [`FeaturePreprocessor::fit`] learns, from the training rows only:
//!
//! - per numeric feature: the median used to fill missing values, then the
//!   mean and population standard deviation of the filled column (a zero
//!   deviation scales by 1)
//! - per categorical feature: the most frequent value used to fill missing
//!   values (ties go to the lexicographically smallest) and the sorted set of
//!   categories observed
//!
//! [`FeaturePreprocessor::transform`] applies those statistics to any
//! [`FeatureMatrix`], producing the dense encoded matrix the forest consumes.
//! Encoded columns are the numeric features in order, followed by one
//! indicator per `(categorical feature, category)` named
//! `<feature>_<category>`. A category not seen in training encodes as all
//! zeros.

use crate::error::{LearningError, Result};
use crate::features::{CATEGORICAL_FEATURES, FeatureMatrix, NUMERIC_FEATURES};
use delivery_processing::utils::{mean, quantile_sorted, sort_values};
use ndarray::Array2;
use serde::Serialize;
use std::collections::BTreeMap;

/// Fitted imputation and scaling statistics of one numeric feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericTransform {
    pub feature: String,
    pub median: f64,
    pub mean: f64,
    pub scale: f64,
}

impl NumericTransform {
    fn fit(feature: &str, values: &[Option<f64>]) -> Result<Self> {
        let mut observed: Vec<f64> = values.iter().flatten().copied().collect();
        if observed.is_empty() {
            return Err(LearningError::EmptyFeature(feature.to_string()));
        }
        sort_values(&mut observed);
        let median = quantile_sorted(&observed, 0.5);

        let filled: Vec<f64> = values.iter().map(|v| v.unwrap_or(median)).collect();
        let center = mean(&filled);
        let variance =
            filled.iter().map(|v| (v - center).powi(2)).sum::<f64>() / filled.len() as f64;
        let std = variance.sqrt();

        Ok(Self {
            feature: feature.to_string(),
            median,
            mean: center,
            scale: if std > 0.0 { std } else { 1.0 },
        })
    }

    fn apply(&self, value: Option<f64>) -> f64 {
        (value.unwrap_or(self.median) - self.mean) / self.scale
    }

    /// Map an encoded value back to the feature's original units.
    pub fn invert(&self, encoded: f64) -> f64 {
        encoded * self.scale + self.mean
    }
}

/// Fitted imputation value and categories of one categorical feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoricalTransform {
    pub feature: String,
    pub fill: String,
    /// Sorted ascending.
    pub categories: Vec<String>,
}

impl CategoricalTransform {
    fn fit(feature: &str, values: &[Option<String>]) -> Result<Self> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for value in values.iter().flatten() {
            *counts.entry(value.as_str()).or_default() += 1;
        }

        // BTreeMap iterates in ascending order, so a strict comparison keeps
        // the smallest value among equally frequent ones.
        let mut fill: Option<(&str, usize)> = None;
        for (&value, &count) in &counts {
            if fill.is_none_or(|(_, best)| count > best) {
                fill = Some((value, count));
            }
        }
        let Some((fill, _)) = fill else {
            return Err(LearningError::EmptyFeature(feature.to_string()));
        };

        Ok(Self {
            feature: feature.to_string(),
            fill: fill.to_string(),
            categories: counts.keys().map(|c| c.to_string()).collect(),
        })
    }

    fn category_index(&self, value: Option<&str>) -> Option<usize> {
        let value = value.unwrap_or(&self.fill);
        self.categories
            .binary_search_by(|c| c.as_str().cmp(value))
            .ok()
    }

    fn encoded_names(&self) -> impl Iterator<Item = String> + '_ {
        self.categories
            .iter()
            .map(move |c| format!("{}_{}", self.feature, c))
    }
}

/// Which kind of encoded column a feature name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EncodedColumn {
    Numeric(usize),
    Indicator,
}

/// Learned preprocessing for the model's raw features.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeaturePreprocessor {
    numeric: Vec<NumericTransform>,
    categorical: Vec<CategoricalTransform>,
    feature_names: Vec<String>,
}

impl FeaturePreprocessor {
    /// Learn imputation, scaling and encoding from the training rows.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::EmptyFeature`] naming the first feature with
    /// no observed value.
    pub fn fit(features: &FeatureMatrix) -> Result<Self> {
        let numeric = NUMERIC_FEATURES
            .iter()
            .zip(&features.numeric)
            .map(|(name, values)| NumericTransform::fit(name, values))
            .collect::<Result<Vec<_>>>()?;
        let categorical = CATEGORICAL_FEATURES
            .iter()
            .zip(&features.categorical)
            .map(|(name, values)| CategoricalTransform::fit(name, values))
            .collect::<Result<Vec<_>>>()?;

        let feature_names = numeric
            .iter()
            .map(|t| t.feature.clone())
            .chain(categorical.iter().flat_map(CategoricalTransform::encoded_names))
            .collect();

        Ok(Self {
            numeric,
            categorical,
            feature_names,
        })
    }

    /// Encode a feature matrix into a dense `rows x n_features` matrix.
    pub fn transform(&self, features: &FeatureMatrix) -> Array2<f64> {
        let mut encoded = Array2::<f64>::zeros((features.rows(), self.n_features()));

        for (col, (transform, values)) in self.numeric.iter().zip(&features.numeric).enumerate() {
            for (row, value) in values.iter().enumerate() {
                encoded[[row, col]] = transform.apply(*value);
            }
        }

        let mut offset = self.numeric.len();
        for (transform, values) in self.categorical.iter().zip(&features.categorical) {
            for (row, value) in values.iter().enumerate() {
                if let Some(idx) = transform.category_index(value.as_deref()) {
                    encoded[[row, offset + idx]] = 1.0;
                }
            }
            offset += transform.categories.len();
        }

        encoded
    }

    /// Encoded column names, in matrix column order.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn numeric_transforms(&self) -> &[NumericTransform] {
        &self.numeric
    }

    pub fn categorical_transforms(&self) -> &[CategoricalTransform] {
        &self.categorical
    }

    /// Index and kind of an encoded column, by name.
    pub(crate) fn encoded_column(&self, name: &str) -> Option<(usize, EncodedColumn)> {
        let idx = self.feature_names.iter().position(|n| n == name)?;
        let kind = if idx < self.numeric.len() {
            EncodedColumn::Numeric(idx)
        } else {
            EncodedColumn::Indicator
        };
        Some((idx, kind))
    }
}
