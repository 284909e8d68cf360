//! Error types for the delivery-learning crate.
//!
//! This module defines [`LearningError`], the error type used throughout the
//! crate. All public API functions return `Result<T, LearningError>`.
//!
//! Not having enough rows to train is *not* an error: [`train`](crate::train)
//! reports it as [`TrainingOutcome::InsufficientData`](crate::TrainingOutcome).
//! The variants below cover invalid configuration, unusable data and misuse
//! of a fitted model.
//!
//! # Example
//!
//! ```
//! use delivery_learning::{LearningError, TrainerConfig};
//!
//! fn config() -> Result<TrainerConfig, LearningError> {
//!     // Errors are automatically propagated with ?
//!     let config = TrainerConfig::builder().n_estimators(50).build()?;
//!     Ok(config)
//! }
//! # config().unwrap();
//! ```

use delivery_processing::ProcessingError;
use thiserror::Error;

/// The main error type for delivery-learning operations.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LearningError {
    /// Invalid configuration provided to the trainer.
    ///
    /// Check the error message for which value is invalid and what values
    /// are accepted.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid data provided for training or prediction.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A column required to build features is missing from the table.
    #[error("Column '{0}' not found")]
    ColumnNotFound(String),

    /// A feature has no observed values in the training rows, so it cannot
    /// be imputed.
    #[error("Feature '{0}' has no observed values in the training data")]
    EmptyFeature(String),

    /// An encoded feature name is not part of the model's schema.
    #[error("Feature '{0}' is not part of the model")]
    FeatureNotFound(String),

    /// A feature takes fewer than two distinct values in the evaluation rows,
    /// so there is no curve to draw.
    #[error("Feature '{feature}' has {distinct} distinct value(s); at least 2 are needed")]
    DegenerateFeature {
        /// Encoded feature name.
        feature: String,
        /// Number of distinct values observed.
        distinct: usize,
    },

    /// Matrix dimensions do not match what the model was trained on.
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Expected shape description.
        expected: String,
        /// Actual shape description.
        actual: String,
    },

    /// The model was used before being fitted.
    #[error("Model has not been fitted")]
    ModelNotFitted,

    /// Failure while reading or normalizing records.
    #[error(transparent)]
    Processing(#[from] ProcessingError),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

impl LearningError {
    /// Short machine-readable code for frontend handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::InvalidData(_) => "INVALID_DATA",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::EmptyFeature(_) => "EMPTY_FEATURE",
            Self::FeatureNotFound(_) => "FEATURE_NOT_FOUND",
            Self::DegenerateFeature { .. } => "DEGENERATE_FEATURE",
            Self::ShapeMismatch { .. } => "SHAPE_MISMATCH",
            Self::ModelNotFitted => "MODEL_NOT_FITTED",
            Self::Processing(inner) => inner.error_code(),
            Self::Polars(_) => "POLARS_ERROR",
        }
    }
}

/// Result type alias for learning operations.
pub type Result<T> = std::result::Result<T, LearningError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LearningError::EmptyFeature("hour_of_day".to_string());
        assert!(err.to_string().contains("hour_of_day"));

        let err = LearningError::DegenerateFeature {
            feature: "is_weekend".to_string(),
            distinct: 1,
        };
        assert_eq!(
            err.to_string(),
            "Feature 'is_weekend' has 1 distinct value(s); at least 2 are needed"
        );
    }

    #[test]
    fn test_processing_error_is_transparent() {
        let err: LearningError = ProcessingError::ColumnNotFound("ATD".to_string()).into();
        assert_eq!(err.to_string(), "Column 'ATD' not found in dataset");
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
    }

    #[test]
    fn test_error_is_send_sync() {
        static_assertions::assert_impl_all!(LearningError: Send, Sync);
    }
}
