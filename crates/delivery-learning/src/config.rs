//! Configuration for the ATD model trainer.
//!
//! This module provides [`TrainerConfig`] and its builder. The defaults
//! reproduce the dashboard's model: 120 trees of depth at most 12, at least
//! 10 samples to split, an 80/20 split seeded with 42, trained only on rows
//! with 5 <= ATD <= 180 and only when at least 200 such rows exist.
//!
//! # Example
//!
//! ```
//! use delivery_learning::TrainerConfig;
//!
//! let config = TrainerConfig::builder()
//!     .n_estimators(60)
//!     .seed(7)
//!     .build()
//!     .expect("valid config");
//! assert_eq!(config.max_depth, 12);
//! ```

use crate::error::LearningError;
use serde::{Deserialize, Serialize};

/// Configuration for [`train`](crate::train).
///
/// Use [`TrainerConfig::builder()`] to construct a configuration with the
/// builder pattern.
///
/// # Validation
///
/// The builder validates the following constraints on
/// [`build()`](TrainerConfigBuilder::build):
/// - `test_fraction` must be in range `(0.0, 1.0)` (exclusive)
/// - `n_estimators` must be at least 1
/// - `max_depth` must be at least 1
/// - `min_samples_split` must be at least 2
/// - `min_samples_leaf` must be at least 1
/// - `min_rows` must be at least 2
/// - `atd_min` must not exceed `atd_max`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Seed for the train/eval shuffle; tree `i` is seeded with `seed + i`
    /// (default: 42).
    pub seed: u64,

    /// Fraction of rows held out for evaluation (default: 0.2).
    ///
    /// The held-out count is `ceil(test_fraction * rows)`.
    pub test_fraction: f64,

    /// Number of trees in the forest (default: 120).
    pub n_estimators: usize,

    /// Maximum depth of each tree (default: 12).
    pub max_depth: usize,

    /// Minimum samples a node needs to be split (default: 10).
    pub min_samples_split: usize,

    /// Minimum samples in each leaf (default: 1).
    pub min_samples_leaf: usize,

    /// Minimum number of usable rows to train at all (default: 200).
    ///
    /// Fewer rows produce
    /// [`TrainingOutcome::InsufficientData`](crate::TrainingOutcome).
    pub min_rows: usize,

    /// Lower bound of the ATD values used for training, inclusive (default: 5).
    pub atd_min: f64,

    /// Upper bound of the ATD values used for training, inclusive (default: 180).
    pub atd_max: f64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            test_fraction: 0.2,
            n_estimators: 120,
            max_depth: 12,
            min_samples_split: 10,
            min_samples_leaf: 1,
            min_rows: 200,
            atd_min: 5.0,
            atd_max: 180.0,
        }
    }
}

impl TrainerConfig {
    /// Create a new builder for `TrainerConfig`.
    #[must_use]
    pub fn builder() -> TrainerConfigBuilder {
        TrainerConfigBuilder::default()
    }
}

/// Builder for [`TrainerConfig`].
///
/// Created via [`TrainerConfig::builder()`]. All setters return `self` to
/// allow method chaining.
#[derive(Debug, Clone, Default)]
pub struct TrainerConfigBuilder {
    config: TrainerConfig,
}

impl TrainerConfigBuilder {
    /// Set the random seed (default: 42).
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Set the held-out fraction (default: 0.2).
    ///
    /// [`build()`](Self::build) returns an error if `fraction <= 0.0` or
    /// `fraction >= 1.0`.
    #[must_use]
    pub fn test_fraction(mut self, fraction: f64) -> Self {
        self.config.test_fraction = fraction;
        self
    }

    /// Set the number of trees (default: 120).
    #[must_use]
    pub fn n_estimators(mut self, n: usize) -> Self {
        self.config.n_estimators = n;
        self
    }

    /// Set the maximum tree depth (default: 12).
    #[must_use]
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.max_depth = depth;
        self
    }

    /// Set the minimum samples to split a node (default: 10).
    #[must_use]
    pub fn min_samples_split(mut self, n: usize) -> Self {
        self.config.min_samples_split = n;
        self
    }

    /// Set the minimum samples per leaf (default: 1).
    #[must_use]
    pub fn min_samples_leaf(mut self, n: usize) -> Self {
        self.config.min_samples_leaf = n;
        self
    }

    /// Set the minimum number of usable rows (default: 200).
    #[must_use]
    pub fn min_rows(mut self, n: usize) -> Self {
        self.config.min_rows = n;
        self
    }

    /// Set the inclusive ATD bounds of training rows (default: 5 to 180).
    #[must_use]
    pub fn atd_bounds(mut self, min: f64, max: f64) -> Self {
        self.config.atd_min = min;
        self.config.atd_max = max;
        self
    }

    /// Build the configuration, validating all settings.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidConfig`] naming the first invalid
    /// setting.
    pub fn build(self) -> Result<TrainerConfig, LearningError> {
        let config = self.config;

        if !(config.test_fraction > 0.0 && config.test_fraction < 1.0) {
            return Err(LearningError::InvalidConfig(
                "test_fraction must be between 0.0 and 1.0 (exclusive)".to_string(),
            ));
        }

        if config.n_estimators == 0 {
            return Err(LearningError::InvalidConfig(
                "n_estimators must be at least 1".to_string(),
            ));
        }

        if config.max_depth == 0 {
            return Err(LearningError::InvalidConfig(
                "max_depth must be at least 1".to_string(),
            ));
        }

        if config.min_samples_split < 2 {
            return Err(LearningError::InvalidConfig(
                "min_samples_split must be at least 2".to_string(),
            ));
        }

        if config.min_samples_leaf == 0 {
            return Err(LearningError::InvalidConfig(
                "min_samples_leaf must be at least 1".to_string(),
            ));
        }

        // Both partitions of the split need at least one row.
        if config.min_rows < 2 {
            return Err(LearningError::InvalidConfig(
                "min_rows must be at least 2".to_string(),
            ));
        }

        if config.atd_min.is_nan() || config.atd_max.is_nan() || config.atd_min > config.atd_max {
            return Err(LearningError::InvalidConfig(
                "atd_min must not exceed atd_max".to_string(),
            ));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TrainerConfig::default();
        assert_eq!(config.seed, 42);
        assert_eq!(config.n_estimators, 120);
        assert_eq!(config.max_depth, 12);
        assert_eq!(config.min_samples_split, 10);
        assert_eq!(config.min_samples_leaf, 1);
        assert_eq!(config.min_rows, 200);
        assert_eq!(config.test_fraction, 0.2);
        assert_eq!((config.atd_min, config.atd_max), (5.0, 180.0));
    }

    #[test]
    fn test_builder_defaults_are_valid() {
        assert_eq!(TrainerConfig::builder().build().unwrap(), TrainerConfig::default());
    }

    #[test]
    fn test_invalid_test_fraction() {
        for fraction in [0.0, 1.0, -0.1, 1.5, f64::NAN] {
            let result = TrainerConfig::builder().test_fraction(fraction).build();
            assert!(result.unwrap_err().to_string().contains("test_fraction"));
        }
    }

    #[test]
    fn test_invalid_forest_settings() {
        let result = TrainerConfig::builder().n_estimators(0).build();
        assert!(result.unwrap_err().to_string().contains("n_estimators"));

        let result = TrainerConfig::builder().max_depth(0).build();
        assert!(result.unwrap_err().to_string().contains("max_depth"));

        let result = TrainerConfig::builder().min_samples_split(1).build();
        assert!(result.unwrap_err().to_string().contains("min_samples_split"));

        let result = TrainerConfig::builder().min_samples_leaf(0).build();
        assert!(result.unwrap_err().to_string().contains("min_samples_leaf"));
    }

    #[test]
    fn test_invalid_atd_bounds() {
        let result = TrainerConfig::builder().atd_bounds(100.0, 10.0).build();
        assert!(result.unwrap_err().to_string().contains("atd_min"));
    }

    #[test]
    fn test_builder_chaining() {
        let config = TrainerConfig::builder()
            .seed(7)
            .test_fraction(0.25)
            .n_estimators(10)
            .max_depth(4)
            .min_samples_split(4)
            .min_samples_leaf(2)
            .min_rows(50)
            .atd_bounds(0.0, 120.0)
            .build()
            .unwrap();

        assert_eq!(config.seed, 7);
        assert!((config.test_fraction - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.n_estimators, 10);
        assert_eq!(config.max_depth, 4);
        assert_eq!(config.min_rows, 50);
        assert_eq!(config.atd_max, 120.0);
    }

    #[test]
    fn test_config_serialization() {
        let config = TrainerConfig::builder().seed(3).build().unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: TrainerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }
}
