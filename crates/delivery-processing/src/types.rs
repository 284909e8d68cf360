//! Core types shared across the processing modules.
//!
//! - [`columns`]: well-known column names of the delivery dataset
//! - [`Restriction`]: one categorical filter dimension
//! - [`FilterSelection`]: the three filter dimensions applied together

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Column names of the delivery dataset.
pub mod columns {
    pub const TERRITORY: &str = "territory";
    pub const COURIER_FLOW: &str = "courier_flow";
    pub const MERCHANT_SURFACE: &str = "merchant_surface";
    pub const GEO_ARCHETYPE: &str = "geo_archetype";

    /// Actual time of delivery, minutes.
    pub const ATD: &str = "ATD";
    pub const PICKUP_DISTANCE: &str = "pickup_distance";
    pub const DROPOFF_DISTANCE: &str = "dropoff_distance";

    pub const ORDER_FINAL_STATE_TIMESTAMP: &str = "order_final_state_timestamp_local";
    pub const RESTAURANT_OFFERED_TIMESTAMP: &str = "restaurant_offered_timestamp_utc";
    pub const EATER_REQUEST_TIMESTAMP: &str = "eater_request_timestamp_local";

    /// Columns coerced to Float64 during normalization.
    pub const NUMERIC: [&str; 3] = [ATD, PICKUP_DISTANCE, DROPOFF_DISTANCE];

    /// Timestamp columns parsed during normalization when present.
    pub const TIMESTAMPS: [&str; 3] = [
        RESTAURANT_OFFERED_TIMESTAMP,
        ORDER_FINAL_STATE_TIMESTAMP,
        EATER_REQUEST_TIMESTAMP,
    ];

    /// Opaque categorical columns.
    pub const CATEGORICAL: [&str; 4] = [TERRITORY, COURIER_FLOW, MERCHANT_SURFACE, GEO_ARCHETYPE];
}

/// A single categorical filter dimension.
///
/// `Unrestricted` lets every row through. `RestrictedTo` keeps only rows
/// whose value is in the set; an empty set keeps nothing. Use
/// [`Restriction::from_selected`] to map a UI multi-select, where an empty
/// selection means "no filter", onto this type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Restriction {
    #[default]
    Unrestricted,
    RestrictedTo(BTreeSet<String>),
}

impl Restriction {
    /// Restrict to exactly the given values, even if there are none.
    pub fn only<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Restriction::RestrictedTo(values.into_iter().map(Into::into).collect())
    }

    /// Build from a user selection: an empty selection is `Unrestricted`.
    pub fn from_selected<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        if set.is_empty() {
            Restriction::Unrestricted
        } else {
            Restriction::RestrictedTo(set)
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self, Restriction::Unrestricted)
    }

    /// Whether a cell value passes this restriction. Nulls only pass when
    /// the dimension is unrestricted.
    pub fn allows(&self, value: Option<&str>) -> bool {
        match self {
            Restriction::Unrestricted => true,
            Restriction::RestrictedTo(set) => value.is_some_and(|v| set.contains(v)),
        }
    }
}

/// The filter applied to the dataset before KPIs, charts and training.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterSelection {
    pub territories: Restriction,
    pub courier_flows: Restriction,
    pub merchant_surfaces: Restriction,
}

impl FilterSelection {
    /// A selection that keeps every row.
    pub fn unrestricted() -> Self {
        Self::default()
    }

    pub fn with_territories(mut self, restriction: Restriction) -> Self {
        self.territories = restriction;
        self
    }

    pub fn with_courier_flows(mut self, restriction: Restriction) -> Self {
        self.courier_flows = restriction;
        self
    }

    pub fn with_merchant_surfaces(mut self, restriction: Restriction) -> Self {
        self.merchant_surfaces = restriction;
        self
    }

    /// Each dimension paired with the column it applies to.
    pub fn dimensions(&self) -> [(&'static str, &Restriction); 3] {
        [
            (columns::TERRITORY, &self.territories),
            (columns::COURIER_FLOW, &self.courier_flows),
            (columns::MERCHANT_SURFACE, &self.merchant_surfaces),
        ]
    }

    pub fn is_unrestricted(&self) -> bool {
        self.dimensions().iter().all(|(_, r)| r.is_unrestricted())
    }
}
