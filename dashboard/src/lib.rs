//! Delivery ATD Dashboard
//!
//! The presentation-layer core of the dashboard. It owns the process-wide
//! state (the dataset cache and the active configuration) and answers
//! refresh requests with a serializable view: KPIs, four charts and, when
//! asked for, an explained ATD model.
//!
//! # Architecture Overview
//!
//! ```text
//! -------------------------------------------------------------------
//! |                     delivery-dashboard                          |
//! |                                                                 |
//! |  ---------------  ---------------  ---------------------------  |
//! |  |   Config    |  |    State    |  |        Commands         |  |
//! |  |  threshold  |  |  dataset    |  |  - filter_options       |  |
//! |  |  trainer    |  |  cache      |  |  - refresh              |  |
//! |  ---------------  ---------------  ---------------------------  |
//! |                           |                                     |
//! |       delivery-processing | delivery-learning                   |
//! |   load, normalize, filter | train, importance, PDP              |
//! |       KPIs, chart specs   |                                     |
//! -------------------------------------------------------------------
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use delivery_dashboard::{DashboardConfig, DashboardRequest, DashboardState, refresh};
//!
//! let config = DashboardConfig::builder().data_path("data/delivery_weekly.csv").build()?;
//! let state = DashboardState::new(config.clone());
//! let view = refresh(&state, &DashboardRequest::from_config(&config))?;
//! println!("{}", serde_json::to_string_pretty(&view)?);
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod state;

pub use commands::{
    DashboardCharts, DashboardReport, DashboardRequest, DashboardView, FilterOptions,
    ModelReport, ModelSection, PartialDependencePanel, SkippedFeature, filter_options, refresh,
};
pub use config::{ConfigValidationError, DashboardConfig, DashboardConfigBuilder};
pub use error::{DashboardError, Result};
pub use state::DashboardState;
