//! Model training tool
//!
//! Fits the tree/neural estimator pair on a CSV of daily readings (or on the
//! synthetic demo series), prints the evaluation report and saves the snapshot.
//!
//! # Usage
//! ```sh
//! cargo run --bin train -- --input data/energy.csv
//! cargo run --bin train -- --synthetic 2000 --cv-folds 5
//! ```
//!
//! The CSV needs the columns `date,temperature,humidity,energy_consumption`.
//! Rows without a target are skipped.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use clap::Parser;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use wattcast::application::ml::feature_synthesizer::synthesize;
use wattcast::application::ml::synthetic::{LabeledReading, generate_series};
use wattcast::application::ml::trainer::{ModelMetrics, TrainingReport};
use wattcast::application::predictor_service::PredictorService;
use wattcast::config::{Config, load_training_params};
use wattcast::domain::ml::RawRecord;
use wattcast::infrastructure::persistence::JsonFileModelStore;

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: String,
    temperature: Option<f64>,
    humidity: Option<f64>,
    energy_consumption: Option<f64>,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Train the energy forecasting models", long_about = None)]
struct Args {
    /// Path to the training CSV
    #[arg(long, conflicts_with = "synthetic")]
    input: Option<PathBuf>,

    /// Generate N days of synthetic demo data instead of reading a CSV
    #[arg(long)]
    synthetic: Option<usize>,

    /// Seed for the synthetic series
    #[arg(long, default_value_t = 42)]
    synthetic_seed: u64,

    /// Snapshot destination (defaults to MODEL_PATH)
    #[arg(long)]
    output: Option<PathBuf>,

    /// TOML file with boosting/neural hyperparameters
    #[arg(long)]
    params: Option<PathBuf>,

    /// Walk-forward cross-validation folds (e.g. 5). Overrides TRAIN_CV_FOLDS
    #[arg(long)]
    cv_folds: Option<usize>,

    /// Train on 100% of the data. Use after validation.
    #[arg(long)]
    no_split: bool,

    /// Maximum number of rows to use (most recent). 0 = use all.
    #[arg(long, default_value_t = 0)]
    max_rows: usize,
}

fn parse_date(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d").map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
        .context(format!("Invalid date '{}'", raw))
}

fn load_csv(path: &Path) -> Result<Vec<LabeledReading>> {
    let file = File::open(path).context(format!("Failed to open {:?}", path))?;
    let mut rdr = csv::Reader::from_reader(BufReader::new(file));

    let mut readings = Vec::new();
    for (line, result) in rdr.deserialize().enumerate() {
        let row: CsvRow = result.context(format!("Malformed CSV row {}", line + 1))?;
        let Some(energy_consumption) = row.energy_consumption else {
            continue;
        };
        readings.push(LabeledReading {
            record: RawRecord {
                timestamp: Some(parse_date(&row.date)?),
                temperature: row.temperature,
                humidity: row.humidity,
            },
            energy_consumption,
        });
    }
    Ok(readings)
}

fn print_metrics(label: &str, metrics: &ModelMetrics) {
    println!("\n  {} (holdout):", label);
    for (name, m) in [
        ("Tree", &metrics.tree),
        ("Neural", &metrics.neural),
        ("Ensemble", &metrics.ensemble),
    ] {
        println!(
            "    {:<9} RMSE={:>10.3}  MAE={:>10.3}  R²={:>7.4}",
            name, m.rmse, m.mae, m.r2
        );
    }
}

fn print_report(report: &TrainingReport, importance: &[(String, f64)]) {
    println!("\n══════════════════════════════════════════════════════");
    println!("  TRAINING REPORT");
    println!("══════════════════════════════════════════════════════");
    println!("  Training samples: {}", report.training_samples);
    println!("  Holdout samples:  {}", report.holdout_samples);
    println!("  Elapsed:          {} ms", report.elapsed_ms);

    if let Some(metrics) = &report.holdout {
        print_metrics("Models", metrics);
    }
    if let Some(cv) = &report.cross_validation {
        println!(
            "\n  CV ensemble RMSE: mean={:.3}, std={:.3} over {} folds",
            cv.mean_rmse,
            cv.std_rmse,
            cv.fold_rmse.len()
        );
        if cv.mean_rmse > 0.0 && cv.std_rmse > 0.5 * cv.mean_rmse {
            println!("  WARNING: Model unstable (std > 50% of mean). Consider more data.");
        }
    }

    println!("\n  Top features:");
    for (name, value) in importance.iter().take(5) {
        println!("    {:<16} {:.4}", name, value);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    let args = Args::parse();
    let config = Config::from_env()?;

    let mut readings = match (&args.input, args.synthetic) {
        (Some(path), _) => {
            info!("Loading training data from {:?}", path);
            load_csv(path)?
        }
        (None, Some(n)) => {
            info!("Generating {} days of synthetic data", n);
            let start = NaiveDate::from_ymd_opt(2020, 1, 1).context("invalid start date")?;
            generate_series(n, start, args.synthetic_seed)
        }
        (None, None) => anyhow::bail!("Pass either --input <CSV> or --synthetic <N>"),
    };

    if readings.is_empty() {
        anyhow::bail!("No labeled rows found");
    }
    if args.max_rows > 0 && readings.len() > args.max_rows {
        let skip = readings.len() - args.max_rows;
        readings.drain(..skip);
        info!("Using most recent {} rows (skipped {})", args.max_rows, skip);
    }

    let raws: Vec<RawRecord> = readings.iter().map(|r| r.record.clone()).collect();
    let targets: Vec<f64> = readings.iter().map(|r| r.energy_consumption).collect();
    let records = synthesize(&raws).context("Feature synthesis failed")?;

    let mut settings = config.to_predictor_settings()?;
    if let Some(path) = &args.params {
        let file_params = load_training_params(path)?;
        settings.training.boosting = file_params.boosting;
        settings.training.neural = file_params.neural;
        settings.training.neural.seed = config.training.seed;
    }
    if let Some(folds) = args.cv_folds {
        settings.training.cv_folds = folds;
    }
    if args.no_split {
        settings.training.holdout_fraction = 0.0;
    }

    let model_path = args
        .output
        .clone()
        .unwrap_or_else(|| config.storage.model_path.clone());
    let store = Arc::new(JsonFileModelStore::new(&model_path));
    let service = Arc::new(PredictorService::new(store, settings)?);

    info!(
        "Training on {} rows (timeout {}s)",
        records.len(),
        config.training.timeout_secs
    );
    let report = service
        .retrain_with_timeout(records, targets, config.training.timeout())
        .await?;

    let mut importance: Vec<(String, f64)> = service.feature_importance()?.into_iter().collect();
    importance.sort_by(|a, b| b.1.total_cmp(&a.1));
    print_report(&report, &importance);

    println!("\nSnapshot saved to {:?}", model_path);
    Ok(())
}
