//! Declarative chart specifications.
//!
//! Builders here never draw anything. Each returns a [`ChartSpec`]: the chart
//! kind, its title, which fields go on which axis, an optional color grouping
//! and the data the renderer needs. Styling is left to the renderer.
//!
//! All builders are pure and idempotent.

use crate::error::Result;
use crate::types::columns;
use crate::utils::{f64_values, mean, quantile_sorted, sort_values, string_values};
use polars::prelude::DataFrame;
use serde::Serialize;
use std::collections::BTreeMap;

/// Domain of the ATD histogram, minutes.
pub const HISTOGRAM_RANGE: (f64, f64) = (0.0, 120.0);

/// Number of equal-width bins in the ATD histogram.
pub const HISTOGRAM_BINS: usize = 100;

/// Default number of bars in the feature importance chart.
pub const DEFAULT_IMPORTANCE_TOP_N: usize = 15;

// =============================================================================
// Chart Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Histogram,
    Box,
    Bar,
    Scatter,
    Line,
}

/// A field bound to an axis (or to the color channel) and its display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AxisBinding {
    pub field: String,
    pub label: String,
}

impl AxisBinding {
    pub fn new(field: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub x: AxisBinding,
    pub y: AxisBinding,
    pub color: Option<AxisBinding>,
    pub data: ChartData,
}

/// Typed data extract carried by a chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartData {
    Histogram {
        values: Vec<f64>,
        bins: Vec<HistogramBin>,
    },
    Box {
        groups: Vec<BoxGroup>,
    },
    Bar {
        bars: Vec<BarEntry>,
        horizontal: bool,
    },
    Scatter {
        points: Vec<ScatterPoint>,
    },
    Line {
        points: Vec<LinePoint>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Five-number summary of a box, linear interpolation between ranks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxPlotSummary {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl BoxPlotSummary {
    /// Summarize an ascending slice. Empty input gives all-NaN.
    pub fn from_sorted(sorted: &[f64]) -> Self {
        Self {
            min: sorted.first().copied().unwrap_or(f64::NAN),
            q1: quantile_sorted(sorted, 0.25),
            median: quantile_sorted(sorted, 0.5),
            q3: quantile_sorted(sorted, 0.75),
            max: sorted.last().copied().unwrap_or(f64::NAN),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxGroup {
    pub label: String,
    pub values: Vec<f64>,
    pub summary: BoxPlotSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarEntry {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub x: f64,
    /// Missing ATD stays in the extract; the renderer drops it.
    pub y: Option<f64>,
    pub group: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinePoint {
    pub x: f64,
    pub y: f64,
}

// =============================================================================
// Dataset Charts
// =============================================================================

/// Distribution of ATD over [0, 120] minutes.
///
/// Values outside the range are excluded from this chart only.
pub fn atd_histogram(df: &DataFrame) -> Result<ChartSpec> {
    let (low, high) = HISTOGRAM_RANGE;
    let values: Vec<f64> = f64_values(df, columns::ATD)?
        .into_iter()
        .flatten()
        .filter(|v| (low..=high).contains(v))
        .collect();
    let bins = fixed_histogram(&values, low, high, HISTOGRAM_BINS);

    Ok(ChartSpec {
        kind: ChartKind::Histogram,
        title: "Distribution of ATD (minutes)".to_string(),
        x: AxisBinding::new(columns::ATD, "ATD (minutes)"),
        y: AxisBinding::new("count", "Orders"),
        color: None,
        data: ChartData::Histogram { values, bins },
    })
}

/// Equal-width bins over `[low, high]`; the last bin is closed.
fn fixed_histogram(values: &[f64], low: f64, high: f64, bins: usize) -> Vec<HistogramBin> {
    let width = (high - low) / bins as f64;
    let mut counts = vec![0usize; bins];

    for value in values {
        let index = (((value - low) / width) as usize).min(bins - 1);
        counts[index] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(idx, count)| HistogramBin {
            start: low + idx as f64 * width,
            end: low + (idx as f64 + 1.0) * width,
            count,
        })
        .collect()
}

/// ATD distribution per courier flow, one box per flow in label order.
pub fn atd_by_courier_flow(df: &DataFrame) -> Result<ChartSpec> {
    let atd = f64_values(df, columns::ATD)?;
    let flows = string_values(df, columns::COURIER_FLOW)?;

    let mut grouped: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for (value, flow) in atd.into_iter().zip(flows) {
        if let (Some(value), Some(flow)) = (value, flow) {
            grouped.entry(flow).or_default().push(value);
        }
    }

    let groups = grouped
        .into_iter()
        .map(|(label, values)| {
            let mut sorted = values.clone();
            sort_values(&mut sorted);
            BoxGroup {
                label,
                summary: BoxPlotSummary::from_sorted(&sorted),
                values,
            }
        })
        .collect();

    Ok(ChartSpec {
        kind: ChartKind::Box,
        title: "ATD by Courier Flow".to_string(),
        x: AxisBinding::new(columns::COURIER_FLOW, "Courier flow"),
        y: AxisBinding::new(columns::ATD, "ATD (minutes)"),
        color: None,
        data: ChartData::Box { groups },
    })
}

/// Mean ATD per territory, in ascending territory order.
///
/// A territory whose ATD values are all missing is kept with a NaN mean.
pub fn atd_by_territory(df: &DataFrame) -> Result<ChartSpec> {
    let atd = f64_values(df, columns::ATD)?;
    let territories = string_values(df, columns::TERRITORY)?;

    let mut grouped: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for (value, territory) in atd.into_iter().zip(territories) {
        if let Some(territory) = territory {
            let entry = grouped.entry(territory).or_default();
            if let Some(value) = value {
                entry.push(value);
            }
        }
    }

    let bars = grouped
        .into_iter()
        .map(|(label, values)| BarEntry {
            label,
            value: mean(&values),
        })
        .collect();

    Ok(ChartSpec {
        kind: ChartKind::Bar,
        title: "Average ATD by Territory".to_string(),
        x: AxisBinding::new(columns::TERRITORY, "Territory"),
        y: AxisBinding::new(columns::ATD, "Mean ATD (minutes)"),
        color: None,
        data: ChartData::Bar {
            bars,
            horizontal: false,
        },
    })
}

/// Total distance against ATD, colored by courier flow.
///
/// Total distance treats a missing pickup or dropoff leg as zero.
pub fn distance_scatter(df: &DataFrame) -> Result<ChartSpec> {
    let pickup = f64_values(df, columns::PICKUP_DISTANCE)?;
    let dropoff = f64_values(df, columns::DROPOFF_DISTANCE)?;
    let atd = f64_values(df, columns::ATD)?;
    let flows = string_values(df, columns::COURIER_FLOW)?;

    let points = pickup
        .into_iter()
        .zip(dropoff)
        .zip(atd)
        .zip(flows)
        .map(|(((pickup, dropoff), y), group)| ScatterPoint {
            x: pickup.unwrap_or(0.0) + dropoff.unwrap_or(0.0),
            y,
            group,
        })
        .collect();

    Ok(ChartSpec {
        kind: ChartKind::Scatter,
        title: "Total Distance vs ATD".to_string(),
        x: AxisBinding::new("total_distance_km", "Total distance (km)"),
        y: AxisBinding::new(columns::ATD, "ATD (minutes)"),
        color: Some(AxisBinding::new(columns::COURIER_FLOW, "Courier flow")),
        data: ChartData::Scatter { points },
    })
}

// =============================================================================
// Model Charts
// =============================================================================

/// Horizontal bar chart of the `top_n` largest importances, largest first.
pub fn feature_importance_bar(importances: &[(String, f64)], top_n: usize) -> ChartSpec {
    let mut ranked: Vec<&(String, f64)> = importances.iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let bars = ranked
        .into_iter()
        .take(top_n)
        .map(|(label, value)| BarEntry {
            label: label.clone(),
            value: *value,
        })
        .collect();

    ChartSpec {
        kind: ChartKind::Bar,
        title: format!("Top {top_n} Feature Importances"),
        x: AxisBinding::new("importance", "Importance"),
        y: AxisBinding::new("feature", "Feature"),
        color: None,
        data: ChartData::Bar {
            bars,
            horizontal: true,
        },
    }
}

pub fn line_chart(
    title: impl Into<String>,
    x_label: impl Into<String>,
    y_label: impl Into<String>,
    points: &[(f64, f64)],
) -> ChartSpec {
    ChartSpec {
        kind: ChartKind::Line,
        title: title.into(),
        x: AxisBinding::new("x", x_label),
        y: AxisBinding::new("y", y_label),
        color: None,
        data: ChartData::Line {
            points: points.iter().map(|&(x, y)| LinePoint { x, y }).collect(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use pretty_assertions::assert_eq;

    fn sample() -> DataFrame {
        df!(
            "territory" => &[Some("B"), Some("A"), Some("B"), None, Some("C")],
            "courier_flow" => &[Some("X"), Some("Y"), None, Some("X"), Some("X")],
            "ATD" => &[Some(10.0), Some(200.0), Some(30.0), Some(-5.0), None],
            "pickup_distance" => &[Some(1.0), None, Some(2.0), Some(0.5), Some(3.0)],
            "dropoff_distance" => &[Some(2.0), Some(4.0), None, Some(0.5), None]
        )
        .unwrap()
    }

    #[test]
    fn test_histogram_excludes_out_of_range() {
        let chart = atd_histogram(&sample()).unwrap();
        assert_eq!(chart.kind, ChartKind::Histogram);

        let ChartData::Histogram { values, bins } = chart.data else {
            panic!("expected histogram data");
        };
        assert_eq!(values, vec![10.0, 30.0]);
        assert_eq!(bins.len(), HISTOGRAM_BINS);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 2);
        assert_eq!(bins[0].start, 0.0);
        assert!((bins[HISTOGRAM_BINS - 1].end - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_histogram_last_bin_is_closed() {
        let bins = fixed_histogram(&[0.0, 120.0], 0.0, 120.0, HISTOGRAM_BINS);
        assert_eq!(bins[0].count, 1);
        assert_eq!(bins[HISTOGRAM_BINS - 1].count, 1);
    }

    #[test]
    fn test_box_groups_drop_missing_and_sort_labels() {
        let chart = atd_by_courier_flow(&sample()).unwrap();
        let ChartData::Box { groups } = chart.data else {
            panic!("expected box data");
        };

        let labels: Vec<&str> = groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["X", "Y"]);
        assert_eq!(groups[0].values, vec![10.0, -5.0]);
        assert_eq!(groups[0].summary.min, -5.0);
        assert_eq!(groups[0].summary.median, 2.5);
        assert_eq!(groups[1].summary.max, 200.0);
    }

    #[test]
    fn test_territory_means_in_label_order() {
        let chart = atd_by_territory(&sample()).unwrap();
        let ChartData::Bar { bars, horizontal } = chart.data else {
            panic!("expected bar data");
        };

        assert!(!horizontal);
        let labels: Vec<&str> = bars.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["A", "B", "C"]);
        assert_eq!(bars[0].value, 200.0);
        assert_eq!(bars[1].value, 20.0);
        assert!(bars[2].value.is_nan());
    }

    #[test]
    fn test_scatter_treats_missing_leg_as_zero() {
        let chart = distance_scatter(&sample()).unwrap();
        assert_eq!(chart.color.as_ref().map(|c| c.field.as_str()), Some("courier_flow"));

        let ChartData::Scatter { points } = chart.data else {
            panic!("expected scatter data");
        };
        let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![3.0, 4.0, 2.0, 1.0, 3.0]);
        assert_eq!(points[4].y, None);
        assert_eq!(points[2].group, None);
    }

    #[test]
    fn test_builders_are_idempotent() {
        let df = sample();
        assert_eq!(
            distance_scatter(&df).unwrap(),
            distance_scatter(&df).unwrap()
        );
        assert_eq!(atd_histogram(&df).unwrap(), atd_histogram(&df).unwrap());
    }

    #[test]
    fn test_feature_importance_bar_keeps_top_n() {
        let importances: Vec<(String, f64)> = (0..20)
            .map(|i| (format!("f{i}"), i as f64 / 100.0))
            .collect();
        let chart = feature_importance_bar(&importances, DEFAULT_IMPORTANCE_TOP_N);

        let ChartData::Bar { bars, horizontal } = chart.data else {
            panic!("expected bar data");
        };
        assert!(horizontal);
        assert_eq!(bars.len(), 15);
        assert_eq!(bars[0].label, "f19");
        assert_eq!(bars[14].label, "f5");
    }

    #[test]
    fn test_line_chart_points() {
        let chart = line_chart("PDP", "hour_of_day", "Predicted ATD", &[(0.0, 30.0), (1.0, 32.5)]);
        assert_eq!(chart.kind, ChartKind::Line);
        assert_eq!(chart.x.label, "hour_of_day");
        assert_eq!(
            chart.data,
            ChartData::Line {
                points: vec![LinePoint { x: 0.0, y: 30.0 }, LinePoint { x: 1.0, y: 32.5 }],
            }
        );
    }
}
