//! Summary KPIs over a (filtered) delivery table.

use crate::error::Result;
use crate::types::columns;
use crate::utils::{f64_values, mean, quantile_sorted, sort_values};
use polars::prelude::DataFrame;
use serde::Serialize;
use tracing::debug;

/// Headline statistics of a delivery table.
///
/// Each statistic drops missing values independently. A statistic computed
/// over zero observations is NaN, never zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSummary {
    pub mean_atd: f64,
    pub p95_atd: f64,
    /// Fraction in `[0, 1]` of rows with a valid ATD at or under the threshold.
    pub on_time_rate: f64,
    pub mean_pickup_distance: f64,
    pub mean_dropoff_distance: f64,
    pub on_time_threshold_minutes: f64,
    pub row_count: usize,
    pub valid_atd_count: usize,
}

impl KpiSummary {
    pub fn display_mean_atd(&self) -> String {
        display_fixed(self.mean_atd, 1)
    }

    pub fn display_p95_atd(&self) -> String {
        display_fixed(self.p95_atd, 1)
    }

    pub fn display_on_time_rate(&self) -> String {
        if self.on_time_rate.is_nan() {
            return NOT_AVAILABLE.to_string();
        }
        format!("{:.1}%", self.on_time_rate * 100.0)
    }

    pub fn display_mean_pickup_distance(&self) -> String {
        display_fixed(self.mean_pickup_distance, 2)
    }

    pub fn display_mean_dropoff_distance(&self) -> String {
        display_fixed(self.mean_dropoff_distance, 2)
    }
}

const NOT_AVAILABLE: &str = "N/A";

fn display_fixed(value: f64, decimals: usize) -> String {
    if value.is_nan() {
        NOT_AVAILABLE.to_string()
    } else {
        format!("{value:.decimals$}")
    }
}

/// Compute the KPI summary with the given on-time threshold in minutes.
pub fn compute(df: &DataFrame, on_time_threshold_minutes: f64) -> Result<KpiSummary> {
    let mut atd: Vec<f64> = f64_values(df, columns::ATD)?.into_iter().flatten().collect();
    let pickup: Vec<f64> = f64_values(df, columns::PICKUP_DISTANCE)?
        .into_iter()
        .flatten()
        .collect();
    let dropoff: Vec<f64> = f64_values(df, columns::DROPOFF_DISTANCE)?
        .into_iter()
        .flatten()
        .collect();

    let on_time_rate = if atd.is_empty() {
        f64::NAN
    } else {
        let on_time = atd
            .iter()
            .filter(|&&v| v <= on_time_threshold_minutes)
            .count();
        on_time as f64 / atd.len() as f64
    };

    let mean_atd = mean(&atd);
    sort_values(&mut atd);
    let p95_atd = quantile_sorted(&atd, 0.95);

    let summary = KpiSummary {
        mean_atd,
        p95_atd,
        on_time_rate,
        mean_pickup_distance: mean(&pickup),
        mean_dropoff_distance: mean(&dropoff),
        on_time_threshold_minutes,
        row_count: df.height(),
        valid_atd_count: atd.len(),
    };
    debug!(
        rows = summary.row_count,
        valid_atd = summary.valid_atd_count,
        threshold = on_time_threshold_minutes,
        "Computed KPI summary"
    );
    Ok(summary)
}
