//! End-to-end tests for the dashboard refresh flow against a CSV on disk.

use delivery_dashboard::{
    DashboardConfig, DashboardError, DashboardRequest, DashboardState, DashboardView,
    ModelSection, filter_options, refresh,
};
use delivery_learning::TrainerConfig;
use delivery_processing::{ChartKind, FilterSelection, Restriction};
use pretty_assertions::assert_eq;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::io::Write;
use tempfile::NamedTempFile;

// ============================================================================
// Helper Functions
// ============================================================================

/// A delivery CSV where territory "A" holds `rows_a` rows and "B" the rest.
fn delivery_csv(rows: usize, rows_a: usize, seed: u64) -> NamedTempFile {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "territory,courier_flow,merchant_surface,geo_archetype,ATD,pickup_distance,dropoff_distance,order_final_state_timestamp_local"
    )
    .unwrap();

    for i in 0..rows {
        let territory = if i < rows_a { "A" } else { "B" };
        let flow = ["courier", "merchant"].choose(&mut rng).unwrap();
        let surface = ["app", "web"].choose(&mut rng).unwrap();
        let geo = ["urban", "suburban"].choose(&mut rng).unwrap();
        let pickup: f64 = rng.gen_range(0.2..4.0);
        let dropoff: f64 = rng.gen_range(0.5..8.0);
        let hour: u32 = rng.gen_range(0..24);
        let atd = 12.0 + 3.0 * (pickup + dropoff) + rng.gen_range(-2.0..2.0);
        writeln!(
            file,
            "{territory},{flow},{surface},{geo},{atd:.2},{pickup:.3},{dropoff:.3},2024-03-05 {hour:02}:15:00"
        )
        .unwrap();
    }
    file.flush().unwrap();
    file
}

fn state_for(file: &NamedTempFile, trees: usize) -> DashboardState {
    let trainer = TrainerConfig::builder().n_estimators(trees).build().unwrap();
    let config = DashboardConfig::builder()
        .data_path(file.path())
        .trainer(trainer)
        .build()
        .unwrap();
    DashboardState::new(config)
}

fn report_request(state: &DashboardState, train: bool) -> DashboardRequest {
    let mut request = DashboardRequest::from_config(&state.config());
    request.train_model = train;
    request
}

// ============================================================================
// Refresh
// ============================================================================

#[test]
fn test_refresh_builds_kpis_and_four_charts() {
    let file = delivery_csv(120, 60, 1);
    let state = state_for(&file, 10);

    let view = refresh(&state, &report_request(&state, false)).unwrap();
    let DashboardView::Report(report) = view else {
        panic!("expected a report");
    };

    assert_eq!(report.row_count, 120);
    assert_eq!(report.kpis.row_count, 120);
    assert_eq!(report.kpis.valid_atd_count, 120);
    assert!(report.model.is_none());

    let titles: Vec<&str> = report.charts.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Distribution of ATD (minutes)",
            "ATD by Courier Flow",
            "Average ATD by Territory",
            "Total Distance vs ATD",
        ]
    );
    let kinds: Vec<ChartKind> = report.charts.iter().map(|c| c.kind).collect();
    assert_eq!(
        kinds,
        vec![ChartKind::Histogram, ChartKind::Box, ChartKind::Bar, ChartKind::Scatter]
    );
}

#[test]
fn test_selection_without_rows_is_no_data() {
    let file = delivery_csv(50, 25, 2);
    let state = state_for(&file, 10);

    let request = report_request(&state, true).with_selection(
        FilterSelection::unrestricted().with_territories(Restriction::only(["Z"])),
    );
    let view = refresh(&state, &request).unwrap();

    assert!(matches!(view, DashboardView::NoData { .. }));
    let json = serde_json::to_value(&view).unwrap();
    assert_eq!(json["status"], "no_data");
}

#[test]
fn test_filter_restricts_kpis() {
    let file = delivery_csv(80, 30, 3);
    let state = state_for(&file, 10);

    let request = report_request(&state, false).with_selection(
        FilterSelection::unrestricted().with_territories(Restriction::only(["A"])),
    );
    let DashboardView::Report(report) = refresh(&state, &request).unwrap() else {
        panic!("expected a report");
    };
    assert_eq!(report.row_count, 30);
}

#[test]
fn test_dataset_is_read_once() {
    let file = delivery_csv(40, 20, 4);
    let state = state_for(&file, 10);
    let request = report_request(&state, false);

    refresh(&state, &request).unwrap();
    assert_eq!(state.cache().cached_path().as_deref(), Some(file.path()));

    // Served from the cache once the file is gone.
    let path = file.path().to_path_buf();
    file.close().unwrap();
    assert!(!path.exists());
    assert!(matches!(
        refresh(&state, &request).unwrap(),
        DashboardView::Report(_)
    ));
}

#[test]
fn test_invalid_threshold_is_rejected() {
    let file = delivery_csv(20, 10, 5);
    let state = state_for(&file, 10);
    let mut request = report_request(&state, false);
    request.on_time_threshold = 42;

    let err = refresh(&state, &request).unwrap_err();
    assert!(matches!(err, DashboardError::Config(_)));
    assert_eq!(err.error_code(), "INVALID_CONFIG");
}

#[test]
fn test_missing_file_is_reported() {
    let config = DashboardConfig::builder()
        .data_path("/no/such/deliveries.csv")
        .build()
        .unwrap();
    let state = DashboardState::new(config);

    let err = refresh(&state, &report_request(&state, false)).unwrap_err();
    assert_eq!(err.error_code(), "FILE_NOT_FOUND");
}

#[test]
fn test_filter_options_are_sorted() {
    let file = delivery_csv(60, 30, 6);
    let state = state_for(&file, 10);

    let options = filter_options(&state).unwrap();
    assert_eq!(options.territories, vec!["A", "B"]);
    assert_eq!(options.courier_flows, vec!["courier", "merchant"]);
    assert_eq!(options.merchant_surfaces, vec!["app", "web"]);
}

// ============================================================================
// Model Section
// ============================================================================

#[test]
fn test_model_section_with_enough_rows() {
    let file = delivery_csv(300, 150, 7);
    let state = state_for(&file, 20);

    let DashboardView::Report(report) = refresh(&state, &report_request(&state, true)).unwrap()
    else {
        panic!("expected a report");
    };
    let Some(ModelSection::Trained(model)) = &report.model else {
        panic!("expected a trained model");
    };

    assert_eq!(model.train_rows + model.eval_rows, 300);
    assert!(model.evaluation_text.starts_with("MAE: "));
    assert_eq!(model.importance_chart.title, "Top 15 Feature Importances");
    assert_eq!(
        model.partial_dependence.len() + model.skipped.len(),
        3,
        "one entry per top feature"
    );
    let top3: Vec<&str> = model.importance[..3].iter().map(|e| e.feature.as_str()).collect();
    for panel in &model.partial_dependence {
        assert!(top3.contains(&panel.curve.feature.as_str()));
        assert_eq!(
            panel.chart.title,
            format!("Partial Dependence: {}", panel.curve.feature)
        );
        assert_eq!(panel.chart.kind, ChartKind::Line);
        assert_eq!(panel.chart.y.label, "ATD");
        assert_eq!(panel.curve.grid.len(), panel.curve.average.len());
    }

    let json = serde_json::to_value(&report.model).unwrap();
    assert_eq!(json["status"], "trained");
}

#[test]
fn test_model_section_reports_insufficient_rows() {
    let file = delivery_csv(260, 120, 8);
    let state = state_for(&file, 10);

    let request = report_request(&state, true).with_selection(
        FilterSelection::unrestricted().with_territories(Restriction::only(["A"])),
    );
    let DashboardView::Report(report) = refresh(&state, &request).unwrap() else {
        panic!("expected a report");
    };

    match report.model {
        Some(ModelSection::InsufficientData { rows, required, .. }) => {
            assert_eq!(rows, 120);
            assert_eq!(required, 200);
        }
        other => panic!("expected insufficient data, got {other:?}"),
    }
}

#[test]
fn test_failed_training_keeps_kpis_and_charts() {
    let source = delivery_csv(300, 150, 9);
    let content = std::fs::read_to_string(source.path()).unwrap();
    let mut file = NamedTempFile::new().unwrap();
    for line in content.lines() {
        // Drop the trailing timestamp column.
        let (kept, _) = line.rsplit_once(',').unwrap();
        writeln!(file, "{kept}").unwrap();
    }
    file.flush().unwrap();
    let state = state_for(&file, 5);

    let DashboardView::Report(report) = refresh(&state, &report_request(&state, true)).unwrap()
    else {
        panic!("expected a report");
    };

    assert_eq!(report.row_count, 300);
    assert_eq!(report.kpis.valid_atd_count, 300);
    assert_eq!(report.charts.iter().count(), 4);
    match &report.model {
        Some(ModelSection::Failed { code, reason }) => {
            assert_eq!(code, "EMPTY_FEATURE");
            assert!(reason.contains("hour_of_day"));
        }
        other => panic!("expected a failed model section, got {other:?}"),
    }

    let json = serde_json::to_value(&report.model).unwrap();
    assert_eq!(json["status"], "failed");
}
