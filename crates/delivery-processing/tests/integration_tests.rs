//! Integration tests for loading, filtering, KPIs and charts.
//!
//! These tests drive the public API end to end over a synthetic dataset
//! written to a temporary CSV file.

use delivery_processing::charts::{self, ChartData};
use delivery_processing::{
    DatasetCache, FilterSelection, Restriction, distinct_values, filter, kpi, load_csv, normalize,
};
use polars::prelude::*;
use pretty_assertions::assert_eq;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::io::Write;
use tempfile::NamedTempFile;

// ============================================================================
// Helper Functions
// ============================================================================

const TERRITORIES: [&str; 3] = ["A", "B", "C"];
const FLOWS: [&str; 2] = ["courier", "merchant"];
const SURFACES: [&str; 2] = ["app", "web"];

/// One generated row, kept alongside the CSV so tests can compute
/// expectations directly.
struct Row {
    territory: &'static str,
    courier_flow: &'static str,
    merchant_surface: &'static str,
    atd: Option<f64>,
}

fn synthetic_dataset(rows: usize, seed: u64) -> (NamedTempFile, Vec<Row>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut tmp = NamedTempFile::with_suffix(".csv").unwrap();
    writeln!(
        tmp,
        "territory,courier_flow,merchant_surface,geo_archetype,ATD,pickup_distance,dropoff_distance,order_final_state_timestamp_local"
    )
    .unwrap();

    let mut generated = Vec::with_capacity(rows);
    for i in 0..rows {
        let territory = *TERRITORIES.choose(&mut rng).unwrap();
        let courier_flow = *FLOWS.choose(&mut rng).unwrap();
        let merchant_surface = *SURFACES.choose(&mut rng).unwrap();
        let atd = if i % 17 == 0 {
            None
        } else {
            Some((rng.gen_range(5.0..150.0_f64) * 10.0).round() / 10.0)
        };
        let pickup: f64 = rng.gen_range(0.1..5.0);
        let dropoff: f64 = rng.gen_range(0.1..8.0);
        let hour = rng.gen_range(0..24);

        writeln!(
            tmp,
            "{territory},{courier_flow},{merchant_surface},urban,{},{pickup:.3},{dropoff:.3},2024-03-{:02} {hour:02}:15:00",
            atd.map(|v| v.to_string()).unwrap_or_else(|| "NaN".to_string()),
            1 + i % 28,
        )
        .unwrap();

        generated.push(Row {
            territory,
            courier_flow,
            merchant_surface,
            atd,
        });
    }
    tmp.flush().unwrap();
    (tmp, generated)
}

fn atd_column(df: &DataFrame) -> Vec<Option<f64>> {
    delivery_processing::f64_values(df, "ATD").unwrap()
}

// ============================================================================
// End-to-end Scenario
// ============================================================================

#[test]
fn test_territory_filter_and_on_time_rate() {
    let (tmp, rows) = synthetic_dataset(500, 42);
    let cache = DatasetCache::new();
    let df = normalize(&cache.get_or_load(tmp.path()).unwrap()).unwrap();
    assert_eq!(df.height(), 500);

    let selection =
        FilterSelection::unrestricted().with_territories(Restriction::from_selected(["A"]));
    let filtered = filter(&df, &selection).unwrap();

    let expected: Vec<&Row> = rows.iter().filter(|r| r.territory == "A").collect();
    assert_eq!(filtered.height(), expected.len());
    assert_eq!(
        distinct_values(&filtered, "territory").unwrap(),
        vec!["A".to_string()]
    );

    let valid: Vec<f64> = expected.iter().filter_map(|r| r.atd).collect();
    let direct = valid.iter().filter(|&&v| v <= 35.0).count() as f64 / valid.len() as f64;
    let kpis = kpi::compute(&filtered, 35.0).unwrap();

    assert_eq!(kpis.valid_atd_count, valid.len());
    assert!((kpis.on_time_rate - direct).abs() < 1e-12);
}

#[test]
fn test_restricted_filter_matches_brute_force() {
    let (tmp, rows) = synthetic_dataset(300, 7);
    let df = normalize(&load_csv(tmp.path()).unwrap()).unwrap();

    let selection = FilterSelection::unrestricted()
        .with_territories(Restriction::only(["A", "C"]))
        .with_courier_flows(Restriction::only(["courier"]))
        .with_merchant_surfaces(Restriction::only(["web"]));
    let filtered = filter(&df, &selection).unwrap();

    let expected: Vec<Option<f64>> = rows
        .iter()
        .filter(|r| {
            (r.territory == "A" || r.territory == "C")
                && r.courier_flow == "courier"
                && r.merchant_surface == "web"
        })
        .map(|r| r.atd)
        .collect();

    assert_eq!(atd_column(&filtered), expected);
}

#[test]
fn test_unrestricted_filter_is_identity() {
    let (tmp, _) = synthetic_dataset(120, 3);
    let df = normalize(&load_csv(tmp.path()).unwrap()).unwrap();
    let filtered = filter(&df, &FilterSelection::unrestricted()).unwrap();
    assert!(filtered.equals_missing(&df));
}

// ============================================================================
// KPI and Chart Properties
// ============================================================================

#[test]
fn test_on_time_rate_is_monotone() {
    let (tmp, _) = synthetic_dataset(200, 11);
    let df = normalize(&load_csv(tmp.path()).unwrap()).unwrap();

    let rates: Vec<f64> = (10..=90)
        .step_by(5)
        .map(|t| kpi::compute(&df, t as f64).unwrap().on_time_rate)
        .collect();
    assert!(rates.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[test]
fn test_histogram_range_does_not_affect_kpis() {
    let df = normalize(
        &df!(
            "ATD" => &["10", "130", "-4", "50"],
            "pickup_distance" => &["1", "1", "1", "1"],
            "dropoff_distance" => &["", "", "", ""]
        )
        .unwrap(),
    )
    .unwrap();

    let kpis = kpi::compute(&df, 35.0).unwrap();
    assert_eq!(kpis.mean_atd, 46.5);

    let ChartData::Histogram { values, .. } = charts::atd_histogram(&df).unwrap().data else {
        panic!("expected histogram data");
    };
    assert_eq!(values, vec![10.0, 50.0]);
}

#[test]
fn test_scatter_total_distance_with_missing_leg() {
    let df = normalize(
        &df!(
            "ATD" => &["20"],
            "pickup_distance" => &["3.0"],
            "dropoff_distance" => &["n/a"],
            "courier_flow" => &["courier"]
        )
        .unwrap(),
    )
    .unwrap();

    let ChartData::Scatter { points } = charts::distance_scatter(&df).unwrap().data else {
        panic!("expected scatter data");
    };
    assert_eq!(points[0].x, 3.0);
}

#[test]
fn test_empty_selection_yields_nan_kpis() {
    let (tmp, _) = synthetic_dataset(50, 5);
    let df = normalize(&load_csv(tmp.path()).unwrap()).unwrap();
    let selection =
        FilterSelection::unrestricted().with_territories(Restriction::only(["nowhere"]));
    let filtered = filter(&df, &selection).unwrap();

    assert_eq!(filtered.height(), 0);
    let kpis = kpi::compute(&filtered, 35.0).unwrap();
    assert!(kpis.mean_atd.is_nan());
    assert!(kpis.p95_atd.is_nan());
    assert!(kpis.on_time_rate.is_nan());
}

#[test]
fn test_chart_specs_serialize() {
    let (tmp, _) = synthetic_dataset(60, 9);
    let df = normalize(&load_csv(tmp.path()).unwrap()).unwrap();
    let chart = charts::atd_by_courier_flow(&df).unwrap();

    let json = serde_json::to_value(&chart).unwrap();
    assert_eq!(json["kind"], "box");
    assert_eq!(json["data"]["type"], "box");
    assert_eq!(json["data"]["groups"].as_array().unwrap().len(), 2);
}
