//! delivery-learning: ATD model training and explanation.
//!
//! This crate fits a bagged ensemble of regression trees that explains Actual
//! Time of Delivery (ATD) from distances, time of day and the categorical
//! context of each delivery, and explains the fitted model with a
//! feature-importance ranking and partial-dependence curves.
//!
//! # Features
//!
//! - **Feature preparation**: trainable-row selection and derived time and
//!   distance features ([`features`])
//! - **Preprocessing**: median/mode imputation, standard scaling and one-hot
//!   encoding learned from training rows only ([`FeaturePreprocessor`])
//! - **Random forest**: bootstrap-sampled CART trees with the MSE criterion,
//!   fit in parallel and reproducible for a fixed seed
//! - **Explainability**: evaluation metrics, impurity-based importance and
//!   partial dependence ([`explain`])
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use delivery_learning::{TrainerConfig, TrainingOutcome, explain, train};
//!
//! let config = TrainerConfig::builder().seed(42).build()?;
//!
//! if let TrainingOutcome::Trained(result) = train(&df, &config)? {
//!     println!("{}", explain::evaluation_text(&result.eval_targets, &result.eval_predictions));
//!
//!     let ranking = explain::feature_importance(&result.model);
//!     for entry in ranking.iter().take(3) {
//!         let pdp = explain::partial_dependence(&result.model, &result.eval_features, &entry.feature)?;
//!         println!("{}: {} grid points", pdp.feature, pdp.grid.len());
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  DataFrame ──► features::prepare ──► FeatureMatrix + targets     │
//! │                                            │                     │
//! │                     train_eval_split ◄─────┘                     │
//! │                            │                                     │
//! │       FeaturePreprocessor::fit ──► RandomForestRegressor::fit    │
//! │                            │                                     │
//! │                      TrainedModel ──► explain                    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod explain;
pub mod features;
pub mod forest;
pub mod model;
pub mod preprocessing;
pub mod split;

pub use config::{TrainerConfig, TrainerConfigBuilder};
pub use error::{LearningError, Result};
pub use explain::{
    FeatureImportance, PartialDependence, RegressionMetrics, evaluation_text, feature_importance,
    partial_dependence,
};
pub use features::{CATEGORICAL_FEATURES, FeatureMatrix, NUMERIC_FEATURES};
pub use model::{TrainedModel, TrainingOutcome, TrainingResult, train};
pub use preprocessing::FeaturePreprocessor;

static_assertions::assert_impl_all!(TrainedModel: Send, Sync);
static_assertions::assert_impl_all!(TrainerConfig: Send, Sync);
