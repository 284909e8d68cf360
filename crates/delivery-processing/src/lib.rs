//! Delivery Record Processing Library
//!
//! Loading, normalization, filtering, KPIs and chart specifications for
//! delivery-performance data, built on Polars.
//!
//! # Overview
//!
//! - **Loading**: [`load_csv`] reads a dataset with every column as text;
//!   [`DatasetCache`] memoizes the last loaded file by path
//! - **Normalization**: [`normalize`] coerces numeric and timestamp columns,
//!   turning bad values into nulls instead of errors
//! - **Filtering**: [`filter`] applies a [`FilterSelection`] of categorical
//!   restrictions
//! - **KPIs**: [`kpi::compute`] summarizes ATD, the on-time rate and distances
//! - **Charts**: [`charts`] builds declarative [`ChartSpec`]s for a renderer
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use delivery_processing::{DatasetCache, FilterSelection, Restriction, charts, kpi};
//!
//! let cache = DatasetCache::new();
//! let raw = cache.get_or_load("deliveries.csv")?;
//! let df = delivery_processing::normalize(&raw)?;
//!
//! let selection = FilterSelection::unrestricted()
//!     .with_territories(Restriction::from_selected(["Lisbon"]));
//! let filtered = delivery_processing::filter(&df, &selection)?;
//!
//! let kpis = kpi::compute(&filtered, 35.0)?;
//! println!("Mean ATD: {}", kpis.display_mean_atd());
//!
//! let histogram = charts::atd_histogram(&filtered)?;
//! ```

pub mod charts;
pub mod error;
pub mod kpi;
pub mod loader;
pub mod preprocess;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use charts::{ChartData, ChartKind, ChartSpec};
pub use error::{ProcessingError, Result as ProcessingResult, ResultExt};
pub use kpi::KpiSummary;
pub use loader::{DatasetCache, load_csv};
pub use preprocess::{distinct_values, filter, normalize};
pub use types::{FilterSelection, Restriction, columns};
pub use utils::{f64_values, is_missing_marker, parse_numeric_string, parse_timestamp_millis};
