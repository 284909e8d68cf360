//! The ATD model trainer.
//!
//! [`train`] runs the whole flow on a normalized, filtered delivery table:
//!
//! 1. keep rows with a valid ATD inside the configured bounds
//! 2. report [`TrainingOutcome::InsufficientData`] below `min_rows`
//! 3. derive features and split 80/20 with the configured seed
//! 4. fit the [`FeaturePreprocessor`] and the forest on the training part
//! 5. predict the held-out part
//!
//! The fitted [`TrainedModel`] lives only in memory and is rebuilt on every
//! call.
//!
//! # Example
//!
//! ```rust,ignore
//! use delivery_learning::{TrainerConfig, TrainingOutcome, train};
//!
//! match train(&df, &TrainerConfig::default())? {
//!     TrainingOutcome::Trained(result) => {
//!         println!("{} trees fitted on {} rows", result.model.n_trees(), result.train_rows);
//!     }
//!     TrainingOutcome::InsufficientData { rows, required } => {
//!         println!("Only {rows} usable rows, {required} needed");
//!     }
//! }
//! ```

use crate::config::TrainerConfig;
use crate::error::Result;
use crate::features::{self, FeatureMatrix};
use crate::forest::{ForestParams, RandomForestRegressor};
use crate::preprocessing::FeaturePreprocessor;
use crate::split::train_eval_split;
use ndarray::Array2;
use polars::prelude::DataFrame;
use tracing::{debug, info};

/// A fitted preprocessor and forest, bound to the feature schema they were
/// trained on.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    preprocessor: FeaturePreprocessor,
    forest: RandomForestRegressor,
}

impl TrainedModel {
    /// Predict ATD, in minutes, for every row of `features`.
    pub fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>> {
        self.forest.predict(&self.preprocessor.transform(features))
    }

    /// Predict from an already encoded matrix.
    pub fn predict_encoded(&self, encoded: &Array2<f64>) -> Result<Vec<f64>> {
        self.forest.predict(encoded)
    }

    /// Encoded feature names, aligned with [`TrainedModel::importances`].
    pub fn feature_names(&self) -> &[String] {
        self.preprocessor.feature_names()
    }

    /// Raw importances per encoded column, in column order.
    pub fn importances(&self) -> &[f64] {
        self.forest.feature_importances()
    }

    pub fn preprocessor(&self) -> &FeaturePreprocessor {
        &self.preprocessor
    }

    pub fn n_trees(&self) -> usize {
        self.forest.n_trees()
    }
}

/// Everything a successful training run produces.
#[derive(Debug, Clone)]
pub struct TrainingResult {
    pub model: TrainedModel,
    /// Raw features of the held-out rows.
    pub eval_features: FeatureMatrix,
    pub eval_targets: Vec<f64>,
    pub eval_predictions: Vec<f64>,
    pub train_rows: usize,
    pub eval_rows: usize,
}

/// Result of [`train`]: a fitted model, or the reason none was fitted.
#[derive(Debug, Clone)]
#[allow(clippy::large_enum_variant)]
pub enum TrainingOutcome {
    Trained(TrainingResult),
    InsufficientData { rows: usize, required: usize },
}

/// Train the ATD model on a normalized delivery table.
///
/// # Errors
///
/// Returns an error when a required column is absent or a feature has no
/// observed value in the training rows. Too few usable rows is not an error;
/// see [`TrainingOutcome::InsufficientData`].
pub fn train(df: &DataFrame, config: &TrainerConfig) -> Result<TrainingOutcome> {
    let prepared = features::prepare(df, config)?;
    let rows = prepared.features.rows();
    if rows < config.min_rows {
        info!(rows, required = config.min_rows, "Not enough rows to train ATD model");
        return Ok(TrainingOutcome::InsufficientData {
            rows,
            required: config.min_rows,
        });
    }

    let split = train_eval_split(rows, config.test_fraction, config.seed);
    let train_features = prepared.features.select(&split.train);
    let train_targets: Vec<f64> = split.train.iter().map(|&i| prepared.targets[i]).collect();
    let eval_features = prepared.features.select(&split.eval);
    let eval_targets: Vec<f64> = split.eval.iter().map(|&i| prepared.targets[i]).collect();
    debug!(
        train_rows = split.train.len(),
        eval_rows = split.eval.len(),
        "Split training data"
    );

    let preprocessor = FeaturePreprocessor::fit(&train_features)?;
    let encoded = preprocessor.transform(&train_features);

    let mut forest = RandomForestRegressor::new(ForestParams {
        n_estimators: config.n_estimators,
        max_depth: config.max_depth,
        min_samples_split: config.min_samples_split,
        min_samples_leaf: config.min_samples_leaf,
        seed: config.seed,
    });
    forest.fit(&encoded, &train_targets)?;

    let model = TrainedModel {
        preprocessor,
        forest,
    };
    let eval_predictions = model.predict(&eval_features)?;

    info!(
        train_rows = split.train.len(),
        eval_rows = split.eval.len(),
        features = model.feature_names().len(),
        trees = model.n_trees(),
        "Trained ATD model"
    );

    Ok(TrainingOutcome::Trained(TrainingResult {
        model,
        train_rows: split.train.len(),
        eval_rows: split.eval.len(),
        eval_features,
        eval_targets,
        eval_predictions,
    }))
}
