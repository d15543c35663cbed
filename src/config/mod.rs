//! Configuration module for wattcast.
//!
//! This module provides structured configuration loading from environment variables,
//! organized by concern: Training, Forecast, Anomaly and Storage.
//!
//! Every sub-config reads through a lookup function, so tests can inject values
//! without touching the process environment.

mod anomaly_config;
mod forecast_config;
mod storage_config;
mod training_config;

pub use anomaly_config::AnomalyEnvConfig;
pub use forecast_config::ForecastEnvConfig;
pub use storage_config::StorageEnvConfig;
pub use training_config::{TrainingEnvConfig, load_training_params};

use crate::application::predictor_service::PredictorSettings;
use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

/// Source of configuration values, keyed by variable name
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub training: TrainingEnvConfig,
    pub forecast: ForecastEnvConfig,
    pub anomaly: AnomalyEnvConfig,
    pub storage: StorageEnvConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: Lookup) -> Result<Self> {
        let training =
            TrainingEnvConfig::from_lookup(lookup).context("Failed to load training config")?;
        let forecast =
            ForecastEnvConfig::from_lookup(lookup).context("Failed to load forecast config")?;
        let anomaly =
            AnomalyEnvConfig::from_lookup(lookup).context("Failed to load anomaly config")?;
        let storage = StorageEnvConfig::from_lookup(lookup);

        Ok(Self {
            training,
            forecast,
            anomaly,
            storage,
        })
    }

    /// Settings for `PredictorService::new`, with the TOML hyperparameters applied.
    pub fn to_predictor_settings(&self) -> Result<PredictorSettings> {
        Ok(PredictorSettings {
            training: self.training.to_training_params()?,
            horizons: self.forecast.horizons.clone(),
            jitter: self.forecast.jitter,
            seed: self.forecast.seed,
            anomaly_threshold: self.anomaly.z_threshold,
            anomaly_window: self.anomaly.window,
        })
    }
}

pub(crate) fn parse_or<T>(lookup: Lookup, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .context(format!("Failed to parse {}", key)),
        None => Ok(default),
    }
}

pub(crate) fn parse_optional<T>(lookup: Lookup, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .context(format!("Failed to parse {}", key))
        })
        .transpose()
}

#[cfg(test)]
pub(crate) fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
    let map: std::collections::HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::forecasting::HorizonUnit;

    #[test]
    fn test_config_defaults() {
        let config = Config::from_lookup(&lookup_from(&[])).unwrap();
        assert_eq!(config.training.holdout_fraction, 0.2);
        assert_eq!(config.forecast.horizons.len(), 3);
        assert_eq!(config.anomaly.z_threshold, 2.0);
        assert!(config.storage.model_path.ends_with("energy_models.json"));

        let settings = config.to_predictor_settings().unwrap();
        assert_eq!(settings.anomaly_window, 30);
        assert_eq!(settings.seed, None);
    }

    #[test]
    fn test_config_overrides() {
        let lookup = lookup_from(&[
            ("MODEL_PATH", "/tmp/models/m.json"),
            ("FORECAST_HORIZONS", "6, 12,24"),
            ("FORECAST_HORIZON_UNIT", "hours"),
            ("FORECAST_SEED", "7"),
            ("ANOMALY_Z_THRESHOLD", "2.5"),
            ("TRAIN_CV_FOLDS", "5"),
        ]);
        let config = Config::from_lookup(&lookup).unwrap();
        let labels: Vec<String> = config.forecast.horizons.iter().map(|h| h.label()).collect();
        assert_eq!(labels, vec!["6_hour", "12_hour", "24_hour"]);
        assert_eq!(config.forecast.horizons[0].unit, HorizonUnit::Hours);
        assert_eq!(config.forecast.seed, Some(7));
        assert_eq!(config.anomaly.z_threshold, 2.5);
        assert_eq!(config.training.cv_folds, 5);
        assert_eq!(config.storage.model_path.to_str(), Some("/tmp/models/m.json"));
    }

    #[test]
    fn test_invalid_value_names_variable() {
        let err = Config::from_lookup(&lookup_from(&[("ANOMALY_WINDOW", "many")])).unwrap_err();
        assert!(format!("{:#}", err).contains("ANOMALY_WINDOW"), "{:#}", err);
    }
}
