//! The "refresh dashboard" command.
//!
//! One refresh recomputes everything from the cached raw table:
//!
//! ```text
//! cache ──► normalize ──► filter ──► KPIs + 4 charts ──► (optional) model
//! ```
//!
//! An empty filtered table yields [`DashboardView::NoData`] and nothing else.
//! A model that cannot be trained for lack of rows is reported inside the
//! view, not as an error, and so is a model that fails to train: the KPIs
//! and charts are returned either way. A partial-dependence curve that fails
//! is listed under `skipped` and logged; the other curves are still returned.

use crate::config::{DashboardConfig, validate_threshold};
use crate::error::Result;
use crate::state::DashboardState;
use delivery_learning::{
    FeatureImportance, LearningError, PartialDependence, RegressionMetrics, TrainingOutcome,
    TrainingResult, evaluation_text, feature_importance, partial_dependence, train,
};
use delivery_processing::charts::{
    atd_by_courier_flow, atd_by_territory, atd_histogram, distance_scatter,
    feature_importance_bar, line_chart,
};
use delivery_processing::{ChartSpec, FilterSelection, KpiSummary, filter, kpi, normalize};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub const NO_DATA_MESSAGE: &str = "No data for the selected filters. Try widening the filters.";

pub const INSUFFICIENT_DATA_MESSAGE: &str = "Not enough data to train the model.";

// ============================================================================
// REQUEST/RESPONSE TYPES
// ============================================================================

/// What the user picked in the dashboard widgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardRequest {
    pub selection: FilterSelection,
    pub on_time_threshold: u32,
    pub train_model: bool,
}

impl DashboardRequest {
    /// A request that selects everything, with the widget defaults taken
    /// from `config`.
    pub fn from_config(config: &DashboardConfig) -> Self {
        Self {
            selection: FilterSelection::unrestricted(),
            on_time_threshold: config.on_time_threshold,
            train_model: config.train_model,
        }
    }

    pub fn with_selection(mut self, selection: FilterSelection) -> Self {
        self.selection = selection;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DashboardView {
    /// The filters left no rows; there are no KPIs or charts to show.
    NoData { message: String },
    Report(Box<DashboardReport>),
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub selection: FilterSelection,
    pub row_count: usize,
    pub kpis: KpiSummary,
    pub charts: DashboardCharts,
    /// Present only when training was requested.
    pub model: Option<ModelSection>,
}

/// The four always-on charts, in display order.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardCharts {
    pub atd_distribution: ChartSpec,
    pub atd_by_courier_flow: ChartSpec,
    pub atd_by_territory: ChartSpec,
    pub atd_vs_distance: ChartSpec,
}

impl DashboardCharts {
    pub fn iter(&self) -> impl Iterator<Item = &ChartSpec> {
        [
            &self.atd_distribution,
            &self.atd_by_courier_flow,
            &self.atd_by_territory,
            &self.atd_vs_distance,
        ]
        .into_iter()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ModelSection {
    InsufficientData {
        rows: usize,
        required: usize,
        message: String,
    },
    Trained(Box<ModelReport>),
    /// Training failed; the rest of the report is unaffected.
    Failed { code: String, reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelReport {
    pub evaluation_text: String,
    pub metrics: RegressionMetrics,
    pub train_rows: usize,
    pub eval_rows: usize,
    /// Every encoded feature, most important first.
    pub importance: Vec<FeatureImportance>,
    pub importance_chart: ChartSpec,
    pub partial_dependence: Vec<PartialDependencePanel>,
    pub skipped: Vec<SkippedFeature>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PartialDependencePanel {
    pub curve: PartialDependence,
    pub chart: ChartSpec,
}

/// A top feature whose partial-dependence curve could not be computed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedFeature {
    pub feature: String,
    pub code: String,
    pub reason: String,
}

// ============================================================================
// COMMAND
// ============================================================================

/// Recompute the dashboard for `request` against the configured dataset.
///
/// # Errors
///
/// - [`DashboardError::Config`](crate::DashboardError::Config) for a
///   threshold outside the slider's range or step
/// - [`DashboardError::Processing`](crate::DashboardError::Processing) when
///   the dataset cannot be read or a required column is missing
///
/// A model that cannot be built from the filtered rows is reported as
/// [`ModelSection::Failed`], not as an error.
pub fn refresh(state: &DashboardState, request: &DashboardRequest) -> Result<DashboardView> {
    validate_threshold(request.on_time_threshold)?;
    let config = state.config();

    let raw = state.dataset()?;
    let normalized = normalize(&raw)?;
    let filtered = filter(&normalized, &request.selection)?;
    debug!(
        total_rows = normalized.height(),
        filtered_rows = filtered.height(),
        "Applied filter selection"
    );

    if filtered.height() == 0 {
        info!("No rows match the filter selection");
        return Ok(DashboardView::NoData {
            message: NO_DATA_MESSAGE.to_string(),
        });
    }

    let kpis = kpi::compute(&filtered, f64::from(request.on_time_threshold))?;
    let charts = DashboardCharts {
        atd_distribution: atd_histogram(&filtered)?,
        atd_by_courier_flow: atd_by_courier_flow(&filtered)?,
        atd_by_territory: atd_by_territory(&filtered)?,
        atd_vs_distance: distance_scatter(&filtered)?,
    };

    let model = if request.train_model {
        Some(match model_section(&filtered, &config) {
            Ok(section) => section,
            Err(e) => {
                warn!(error = %e, "ATD model training failed");
                ModelSection::Failed {
                    code: e.error_code().to_string(),
                    reason: e.to_string(),
                }
            }
        })
    } else {
        None
    };

    Ok(DashboardView::Report(Box::new(DashboardReport {
        selection: request.selection.clone(),
        row_count: filtered.height(),
        kpis,
        charts,
        model,
    })))
}

fn model_section(
    df: &DataFrame,
    config: &DashboardConfig,
) -> std::result::Result<ModelSection, LearningError> {
    let result = match train(df, &config.trainer)? {
        TrainingOutcome::Trained(result) => result,
        TrainingOutcome::InsufficientData { rows, required } => {
            return Ok(ModelSection::InsufficientData {
                rows,
                required,
                message: INSUFFICIENT_DATA_MESSAGE.to_string(),
            });
        }
    };

    let importance = feature_importance(&result.model);
    let pairs: Vec<(String, f64)> = importance
        .iter()
        .map(|entry| (entry.feature.clone(), entry.importance))
        .collect();
    let importance_chart = feature_importance_bar(&pairs, config.importance_top_n);

    let top_features: Vec<&str> = importance
        .iter()
        .take(config.pdp_features)
        .map(|entry| entry.feature.as_str())
        .collect();
    let (panels, skipped) = partial_dependence_panels(&result, &top_features);

    Ok(ModelSection::Trained(Box::new(ModelReport {
        evaluation_text: evaluation_text(&result.eval_targets, &result.eval_predictions),
        metrics: RegressionMetrics::compute(&result.eval_targets, &result.eval_predictions),
        train_rows: result.train_rows,
        eval_rows: result.eval_rows,
        importance,
        importance_chart,
        partial_dependence: panels,
        skipped,
    })))
}

/// One curve per feature; failures are collected instead of propagated.
fn partial_dependence_panels(
    result: &TrainingResult,
    features: &[&str],
) -> (Vec<PartialDependencePanel>, Vec<SkippedFeature>) {
    let mut panels = Vec::new();
    let mut skipped = Vec::new();
    for &feature in features {
        match partial_dependence(&result.model, &result.eval_features, feature) {
            Ok(curve) => {
                let chart = line_chart(
                    format!("Partial Dependence: {}", curve.feature),
                    curve.feature.clone(),
                    "ATD",
                    &curve.points(),
                );
                panels.push(PartialDependencePanel { curve, chart });
            }
            Err(e) => {
                warn!(feature, error = %e, "Skipping partial dependence");
                skipped.push(SkippedFeature {
                    feature: feature.to_string(),
                    code: e.error_code().to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }
    (panels, skipped)
}
