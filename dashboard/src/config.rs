//! Dashboard configuration.
//!
//! [`DashboardConfig`] holds what the dashboard needs beyond the filter
//! selection: where the dataset lives, the on-time threshold, whether to fit
//! the ATD model and how many model charts to show. The on-time threshold
//! follows the slider it replaces: 10 to 90 minutes in steps of 5, starting
//! at 35.
//!
//! # Example
//!
//! ```
//! use delivery_dashboard::DashboardConfig;
//!
//! let config = DashboardConfig::builder()
//!     .data_path("data/delivery_weekly.csv")
//!     .on_time_threshold(45)
//!     .train_model(true)
//!     .build()
//!     .expect("valid config");
//! assert_eq!(config.pdp_features, 3);
//! ```

use delivery_learning::TrainerConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Lowest selectable on-time threshold, minutes.
pub const MIN_THRESHOLD: u32 = 10;

/// Highest selectable on-time threshold, minutes.
pub const MAX_THRESHOLD: u32 = 90;

/// Threshold step, minutes.
pub const THRESHOLD_STEP: u32 = 5;

pub const DEFAULT_THRESHOLD: u32 = 35;

pub const DEFAULT_DATA_PATH: &str = "data/delivery_weekly.csv";

/// Configuration for one dashboard session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// CSV file with the delivery records (default: `data/delivery_weekly.csv`).
    pub data_path: PathBuf,

    /// Deliveries at or under this many minutes count as on time (default: 35).
    pub on_time_threshold: u32,

    /// Fit and explain the ATD model on the filtered rows (default: false).
    pub train_model: bool,

    /// Number of top features that get a partial-dependence chart (default: 3).
    pub pdp_features: usize,

    /// Number of bars in the importance chart (default: 15).
    pub importance_top_n: usize,

    /// Settings for the model trainer.
    pub trainer: TrainerConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            on_time_threshold: DEFAULT_THRESHOLD,
            train_model: false,
            pdp_features: 3,
            importance_top_n: delivery_processing::charts::DEFAULT_IMPORTANCE_TOP_N,
            trainer: TrainerConfig::default(),
        }
    }
}

impl DashboardConfig {
    pub fn builder() -> DashboardConfigBuilder {
        DashboardConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        validate_threshold(self.on_time_threshold)?;

        if self.importance_top_n == 0 {
            return Err(ConfigValidationError::InvalidChartSize {
                field: "importance_top_n".to_string(),
            });
        }

        if self.data_path.as_os_str().is_empty() {
            return Err(ConfigValidationError::EmptyDataPath);
        }

        Ok(())
    }
}

/// Check an on-time threshold against the slider's range and step.
pub fn validate_threshold(minutes: u32) -> Result<(), ConfigValidationError> {
    if (MIN_THRESHOLD..=MAX_THRESHOLD).contains(&minutes) && minutes % THRESHOLD_STEP == 0 {
        Ok(())
    } else {
        Err(ConfigValidationError::InvalidThreshold(minutes))
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigValidationError {
    #[error(
        "Invalid on-time threshold: {0} (must be between {MIN_THRESHOLD} and {MAX_THRESHOLD} in steps of {THRESHOLD_STEP})"
    )]
    InvalidThreshold(u32),

    #[error("Invalid chart size for '{field}' (must be at least 1)")]
    InvalidChartSize { field: String },

    #[error("Data path must not be empty")]
    EmptyDataPath,
}

/// Builder for [`DashboardConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct DashboardConfigBuilder {
    data_path: Option<PathBuf>,
    on_time_threshold: Option<u32>,
    train_model: Option<bool>,
    pdp_features: Option<usize>,
    importance_top_n: Option<usize>,
    trainer: Option<TrainerConfig>,
}

impl DashboardConfigBuilder {
    pub fn data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = Some(path.into());
        self
    }

    pub fn on_time_threshold(mut self, minutes: u32) -> Self {
        self.on_time_threshold = Some(minutes);
        self
    }

    pub fn train_model(mut self, enabled: bool) -> Self {
        self.train_model = Some(enabled);
        self
    }

    /// Number of partial-dependence charts; 0 disables them.
    pub fn pdp_features(mut self, count: usize) -> Self {
        self.pdp_features = Some(count);
        self
    }

    pub fn importance_top_n(mut self, count: usize) -> Self {
        self.importance_top_n = Some(count);
        self
    }

    pub fn trainer(mut self, trainer: TrainerConfig) -> Self {
        self.trainer = Some(trainer);
        self
    }

    /// Build the configuration, validating all parameters.
    pub fn build(self) -> Result<DashboardConfig, ConfigValidationError> {
        let defaults = DashboardConfig::default();
        let config = DashboardConfig {
            data_path: self.data_path.unwrap_or(defaults.data_path),
            on_time_threshold: self.on_time_threshold.unwrap_or(defaults.on_time_threshold),
            train_model: self.train_model.unwrap_or(defaults.train_model),
            pdp_features: self.pdp_features.unwrap_or(defaults.pdp_features),
            importance_top_n: self.importance_top_n.unwrap_or(defaults.importance_top_n),
            trainer: self.trainer.unwrap_or(defaults.trainer),
        };

        config.validate()?;
        Ok(config)
    }
}
