//! Forecast configuration parsing from environment variables.
//!
//! Horizons, their unit and the jitter applied beyond the first horizon.

use super::{Lookup, parse_optional, parse_or};
use crate::application::forecasting::HorizonJitter;
use crate::domain::forecasting::horizon::{default_horizons, parse_horizons};
use crate::domain::forecasting::{Horizon, HorizonUnit};
use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct ForecastEnvConfig {
    pub horizons: Vec<Horizon>,
    pub jitter: HorizonJitter,
    /// Fixed seed for the jitter RNG; unset means OS entropy
    pub seed: Option<u64>,
}

impl Default for ForecastEnvConfig {
    fn default() -> Self {
        Self {
            horizons: default_horizons(),
            jitter: HorizonJitter::default(),
            seed: None,
        }
    }
}

impl ForecastEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: Lookup) -> Result<Self> {
        let unit: HorizonUnit = match lookup("FORECAST_HORIZON_UNIT") {
            Some(raw) => raw.parse().context("Invalid FORECAST_HORIZON_UNIT")?,
            None => HorizonUnit::default(),
        };
        let horizons = match lookup("FORECAST_HORIZONS") {
            Some(list) => parse_horizons(&list, unit).context("Invalid FORECAST_HORIZONS")?,
            None => default_horizons()
                .into_iter()
                .map(|h| Horizon { unit, ..h })
                .collect(),
        };

        let defaults = HorizonJitter::default();
        let jitter = HorizonJitter {
            enabled: parse_or(lookup, "FORECAST_JITTER_ENABLED", defaults.enabled)?,
            temperature_std: parse_or(
                lookup,
                "FORECAST_TEMPERATURE_JITTER",
                defaults.temperature_std,
            )?,
            humidity_std: parse_or(lookup, "FORECAST_HUMIDITY_JITTER", defaults.humidity_std)?,
        };
        for (key, std) in [
            ("FORECAST_TEMPERATURE_JITTER", jitter.temperature_std),
            ("FORECAST_HUMIDITY_JITTER", jitter.humidity_std),
        ] {
            if !std.is_finite() || std < 0.0 {
                anyhow::bail!("{} must be a finite non-negative number, got {}", key, std);
            }
        }

        Ok(Self {
            horizons,
            jitter,
            seed: parse_optional(lookup, "FORECAST_SEED")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::lookup_from;

    #[test]
    fn test_forecast_config_defaults() {
        let config = ForecastEnvConfig::from_lookup(&lookup_from(&[])).unwrap();
        let labels: Vec<String> = config.horizons.iter().map(|h| h.label()).collect();
        assert_eq!(labels, vec!["1_day", "7_day", "30_day"]);
        assert_eq!(config.jitter, HorizonJitter::default());
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_unit_applies_to_default_offsets() {
        let config =
            ForecastEnvConfig::from_lookup(&lookup_from(&[("FORECAST_HORIZON_UNIT", "weeks")]))
                .unwrap();
        assert_eq!(config.horizons[1].label(), "7_week");
    }

    #[test]
    fn test_jitter_overrides() {
        let config = ForecastEnvConfig::from_lookup(&lookup_from(&[
            ("FORECAST_JITTER_ENABLED", "false"),
            ("FORECAST_TEMPERATURE_JITTER", "0.2"),
        ]))
        .unwrap();
        assert!(!config.jitter.enabled);
        assert_eq!(config.jitter.temperature_std, 0.2);
        assert_eq!(config.jitter.humidity_std, 0.05);
    }

    #[test]
    fn test_rejects_invalid_values() {
        for pairs in [
            [("FORECAST_HORIZONS", "1,0")],
            [("FORECAST_HORIZONS", "7,7")],
            [("FORECAST_HORIZON_UNIT", "fortnights")],
            [("FORECAST_HUMIDITY_JITTER", "-0.1")],
            [("FORECAST_SEED", "abc")],
        ] {
            assert!(
                ForecastEnvConfig::from_lookup(&lookup_from(&pairs)).is_err(),
                "{:?} should be rejected",
                pairs
            );
        }
    }
}
