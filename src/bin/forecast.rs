//! Forecast tool
//!
//! Loads the saved snapshot, forecasts one reading over the configured horizons
//! and prints the result as JSON.
//!
//! # Usage
//! ```sh
//! cargo run --bin forecast -- --temperature 25 --humidity 60 --timestamp "2024-07-17 18:00:00"
//! cargo run --bin forecast -- --temperature 31 --humidity 40 --history 980,1010,995,1002
//! ```
//!
//! # Environment Variables
//! - `MODEL_PATH` - snapshot location (default: data/models/energy_models.json)
//! - `FORECAST_HORIZONS` - comma-separated offsets (default: 1,7,30)
//! - `FORECAST_SEED` - fixes the horizon jitter

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use clap::Parser;
use std::sync::Arc;
use tracing::warn;
use wattcast::application::ml::feature_synthesizer::synthesize_record;
use wattcast::application::predictor_service::{ModelStatus, PredictorService};
use wattcast::config::Config;
use wattcast::domain::forecasting::horizon::parse_horizons;
use wattcast::domain::ml::RawRecord;
use wattcast::infrastructure::persistence::JsonFileModelStore;

#[derive(Parser, Debug)]
#[command(author, version, about = "Multi-horizon energy forecast", long_about = None)]
struct Args {
    /// Temperature in °C
    #[arg(long)]
    temperature: f64,

    /// Relative humidity in %
    #[arg(long)]
    humidity: f64,

    /// Reading time as "YYYY-MM-DD HH:MM:SS" (defaults to now)
    #[arg(long)]
    timestamp: Option<String>,

    /// Comma-separated horizon offsets, overriding FORECAST_HORIZONS
    #[arg(long)]
    horizons: Option<String>,

    /// Recent consumption values checked together with the forecast
    #[arg(long, value_delimiter = ',')]
    history: Vec<f64>,

    /// Include the feature importance map in the output
    #[arg(long)]
    importance: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    let args = Args::parse();
    let config = Config::from_env()?;

    let timestamp = match &args.timestamp {
        Some(raw) => NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%d %H:%M:%S")
            .context(format!("Invalid --timestamp '{}'", raw))?,
        None => Local::now().naive_local(),
    };
    let raw = RawRecord::new(timestamp, args.temperature, args.humidity);

    let store = Arc::new(JsonFileModelStore::new(&config.storage.model_path));
    let service = PredictorService::new(store, config.to_predictor_settings()?)?;
    if service.load()? == ModelStatus::Untrained {
        warn!("No trained model available");
        anyhow::bail!(
            "No model snapshot at {:?}. Run the `train` binary first.",
            config.storage.model_path
        );
    }

    let forecast = match &args.horizons {
        Some(list) => {
            let unit = service
                .horizons()
                .first()
                .map(|h| h.unit)
                .unwrap_or_default();
            let horizons = parse_horizons(list, unit).context("Invalid --horizons")?;
            service.forecast_horizons(&synthesize_record(&raw)?, &horizons)?
        }
        None => service.forecast_raw(&raw)?,
    };

    let mut batch = args.history.clone();
    batch.extend(forecast.ensemble_values());
    let anomalies = service
        .detect_anomalies(&batch)
        .context("Anomaly check failed")?;

    let mut output = serde_json::json!({
        "timestamp": timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        "forecast": forecast,
        "anomalies": anomalies,
    });
    if args.importance {
        output["feature_importance"] = serde_json::to_value(service.feature_importance()?)?;
    }

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
