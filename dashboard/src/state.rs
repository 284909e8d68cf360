//! Dashboard state.
//!
//! All state the dashboard keeps between refreshes lives here. The loaded
//! dataset is the only expensive thing worth keeping, so the state is one
//! [`DatasetCache`] plus the active configuration. Both are safe to share
//! across threads.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                DashboardState                │
//! ├──────────────────────┬───────────────────────┤
//! │  cache: DatasetCache │  config: RwLock       │
//! │  (path -> DataFrame) │  DashboardConfig      │
//! └──────────────────────┴───────────────────────┘
//! ```
//!
//! Trained models are never stored: every refresh that asks for the model
//! fits a fresh one on the filtered rows.

use crate::config::{ConfigValidationError, DashboardConfig};
use delivery_processing::DatasetCache;
use parking_lot::RwLock;
use polars::prelude::DataFrame;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct DashboardState {
    cache: DatasetCache,
    config: RwLock<DashboardConfig>,
}

impl DashboardState {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            cache: DatasetCache::new(),
            config: RwLock::new(config),
        }
    }

    /// A copy of the active configuration.
    pub fn config(&self) -> DashboardConfig {
        self.config.read().clone()
    }

    /// Replace the active configuration after validating it.
    ///
    /// Pointing at a different data file does not reload anything until the
    /// next refresh.
    pub fn set_config(&self, config: DashboardConfig) -> Result<(), ConfigValidationError> {
        config.validate()?;
        *self.config.write() = config;
        Ok(())
    }

    /// The raw table at the configured path, loaded at most once.
    pub fn dataset(&self) -> delivery_processing::ProcessingResult<Arc<DataFrame>> {
        let path = self.config.read().data_path.clone();
        self.cache.get_or_load(path)
    }

    pub fn cache(&self) -> &DatasetCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_config_validates() {
        let state = DashboardState::default();
        let mut bad = state.config();
        bad.on_time_threshold = 33;
        assert!(state.set_config(bad).is_err());
        assert_eq!(state.config().on_time_threshold, 35);

        let good = DashboardConfig::builder().on_time_threshold(60).build().unwrap();
        state.set_config(good).unwrap();
        assert_eq!(state.config().on_time_threshold, 60);
    }

    #[test]
    fn test_missing_dataset_is_an_error() {
        let config = DashboardConfig::builder()
            .data_path("/definitely/not/here.csv")
            .build()
            .unwrap();
        let state = DashboardState::new(config);
        assert!(state.dataset().is_err());
        assert!(state.cache().cached_path().is_none());
    }
}
