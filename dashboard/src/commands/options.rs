//! Filter options offered to the user.

use crate::error::Result;
use crate::state::DashboardState;
use delivery_processing::{columns, distinct_values, normalize};
use serde::Serialize;

/// Sorted distinct values of each filterable dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterOptions {
    pub territories: Vec<String>,
    pub courier_flows: Vec<String>,
    pub merchant_surfaces: Vec<String>,
}

/// List what each filter can select, from the configured dataset.
pub fn filter_options(state: &DashboardState) -> Result<FilterOptions> {
    let raw = state.dataset()?;
    let df = normalize(&raw)?;
    Ok(FilterOptions {
        territories: distinct_values(&df, columns::TERRITORY)?,
        courier_flows: distinct_values(&df, columns::COURIER_FLOW)?,
        merchant_surfaces: distinct_values(&df, columns::MERCHANT_SURFACE)?,
    })
}
