//! CLI entry point for the delivery ATD dashboard.

use anyhow::{Context, Result};
use clap::Parser;
use delivery_dashboard::{
    DashboardConfig, DashboardReport, DashboardRequest, DashboardState, DashboardView,
    ModelSection, filter_options, refresh,
};
use delivery_learning::TrainerConfig;
use delivery_processing::{ChartData, FilterSelection, Restriction};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Delivery Time & ATD Dashboard",
    long_about = "Analyze Actual Time of Delivery (ATD), distances and operational \
                  performance by territory, courier flow and merchant surface.\n\n\
                  EXAMPLES:\n  \
                  # KPIs and charts for the whole dataset\n  \
                  delivery-dashboard -i data/delivery_weekly.csv\n\n  \
                  # Two territories, 45 minute on-time threshold, with the model\n  \
                  delivery-dashboard -i data.csv --territory A --territory B --threshold 45 --train\n\n  \
                  # Values each filter accepts\n  \
                  delivery-dashboard -i data.csv --list-options"
)]
struct Args {
    /// Path to the delivery CSV file
    #[arg(short, long, default_value = delivery_dashboard::config::DEFAULT_DATA_PATH)]
    input: PathBuf,

    /// Keep only these territories (repeatable; none means all)
    #[arg(long = "territory")]
    territories: Vec<String>,

    /// Keep only these courier flows (repeatable; none means all)
    #[arg(long = "courier-flow")]
    courier_flows: Vec<String>,

    /// Keep only these merchant surfaces (repeatable; none means all)
    #[arg(long = "merchant-surface")]
    merchant_surfaces: Vec<String>,

    /// On-time threshold in minutes (10 - 90, steps of 5)
    #[arg(short, long, default_value_t = delivery_dashboard::config::DEFAULT_THRESHOLD)]
    threshold: u32,

    /// Train and explain the Random Forest ATD model
    #[arg(long)]
    train: bool,

    /// Number of trees when training
    #[arg(long, default_value = "120")]
    trees: usize,

    /// Seed for the split and the trees
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Print the values each filter accepts and exit
    #[arg(long)]
    list_options: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all logs; only outputs the final JSON view.
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    let trainer = TrainerConfig::builder()
        .n_estimators(args.trees)
        .seed(args.seed)
        .build()
        .context("Invalid model settings")?;
    let config = DashboardConfig::builder()
        .data_path(&args.input)
        .on_time_threshold(args.threshold)
        .train_model(args.train)
        .trainer(trainer)
        .build()
        .context("Invalid dashboard settings")?;
    let state = DashboardState::new(config.clone());

    if args.list_options {
        let options = filter_options(&state)?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&options)?);
        } else {
            println!("Territory:        {}", options.territories.join(", "));
            println!("Courier flow:     {}", options.courier_flows.join(", "));
            println!("Merchant surface: {}", options.merchant_surfaces.join(", "));
        }
        return Ok(());
    }

    let selection = FilterSelection::unrestricted()
        .with_territories(Restriction::from_selected(args.territories))
        .with_courier_flows(Restriction::from_selected(args.courier_flows))
        .with_merchant_surfaces(Restriction::from_selected(args.merchant_surfaces));
    let request = DashboardRequest::from_config(&config).with_selection(selection);

    info!(path = %args.input.display(), "Refreshing dashboard");
    let view = refresh(&state, &request)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print_view(&view);
    }

    Ok(())
}

fn print_view(view: &DashboardView) {
    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("              DELIVERY TIME & ATD DASHBOARD");
    println!("═══════════════════════════════════════════════════════════════");

    match view {
        DashboardView::NoData { message } => {
            println!();
            println!("⚠ {message}");
        }
        DashboardView::Report(report) => print_report(report),
    }
    println!();
}

fn print_report(report: &DashboardReport) {
    let kpis = &report.kpis;
    println!();
    println!("📊 KPIs ({} deliveries)", report.row_count);
    println!("   Avg ATD (min):             {}", kpis.display_mean_atd());
    println!("   P95 ATD (min):             {}", kpis.display_p95_atd());
    println!(
        "   On-time rate (<= {} min):  {}",
        kpis.on_time_threshold_minutes,
        kpis.display_on_time_rate()
    );
    println!("   Avg pickup distance (km):  {}", kpis.display_mean_pickup_distance());
    println!("   Avg dropoff distance (km): {}", kpis.display_mean_dropoff_distance());

    println!();
    println!("📈 Charts");
    for chart in report.charts.iter() {
        println!("   • {} ({})", chart.title, describe_data(&chart.data));
    }

    match &report.model {
        None => {}
        Some(ModelSection::InsufficientData {
            rows,
            required,
            message,
        }) => {
            println!();
            println!("🌲 Predictive model Random Forest");
            println!("   ⚠ {message} ({rows} usable rows, {required} needed)");
        }
        Some(ModelSection::Failed { code, reason }) => {
            println!();
            println!("🌲 Predictive model Random Forest");
            println!("   ✗ Model could not be trained ({code}): {reason}");
        }
        Some(ModelSection::Trained(model)) => {
            println!();
            println!("🌲 Predictive model Random Forest");
            println!(
                "   Trained on {} rows, evaluated on {}",
                model.train_rows, model.eval_rows
            );
            println!();
            for line in model.evaluation_text.lines() {
                println!("   {line}");
            }

            println!();
            println!("   {}", model.importance_chart.title);
            if let ChartData::Bar { bars, .. } = &model.importance_chart.data {
                for bar in bars {
                    println!("     {:<32} {:.4}", bar.label, bar.value);
                }
            }

            println!();
            println!("   Partial dependence, top predictors");
            for panel in &model.partial_dependence {
                let curve = &panel.curve;
                let (first, last) = (curve.average.first(), curve.average.last());
                if let (Some(first), Some(last)) = (first, last) {
                    println!(
                        "     {:<32} {} points, ATD {:.1} -> {:.1}",
                        curve.feature,
                        curve.grid.len(),
                        first,
                        last
                    );
                }
            }
            for skipped in &model.skipped {
                println!("     {:<32} skipped: {}", skipped.feature, skipped.reason);
            }
        }
    }
}

fn describe_data(data: &ChartData) -> String {
    match data {
        ChartData::Histogram { values, bins } => {
            format!("{} values in {} bins", values.len(), bins.len())
        }
        ChartData::Box { groups } => format!("{} groups", groups.len()),
        ChartData::Bar { bars, .. } => format!("{} bars", bars.len()),
        ChartData::Scatter { points } => format!("{} points", points.len()),
        ChartData::Line { points } => format!("{} points", points.len()),
    }
}
