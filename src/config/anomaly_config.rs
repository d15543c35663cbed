//! Anomaly detection configuration parsing from environment variables.

use super::{Lookup, parse_or};
use crate::application::forecasting::anomaly_detector::{
    DEFAULT_WINDOW, DEFAULT_Z_THRESHOLD, validate_threshold,
};
use crate::domain::forecasting::anomaly::MIN_BATCH_SIZE;
use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct AnomalyEnvConfig {
    pub z_threshold: f64,
    /// Capacity of the rolling window
    pub window: usize,
}

impl Default for AnomalyEnvConfig {
    fn default() -> Self {
        Self {
            z_threshold: DEFAULT_Z_THRESHOLD,
            window: DEFAULT_WINDOW,
        }
    }
}

impl AnomalyEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: Lookup) -> Result<Self> {
        let z_threshold = parse_or(lookup, "ANOMALY_Z_THRESHOLD", DEFAULT_Z_THRESHOLD)?;
        validate_threshold(z_threshold).context("Invalid ANOMALY_Z_THRESHOLD")?;

        let window = parse_or(lookup, "ANOMALY_WINDOW", DEFAULT_WINDOW)?;
        if window < MIN_BATCH_SIZE {
            anyhow::bail!(
                "ANOMALY_WINDOW must be at least {}, got {}",
                MIN_BATCH_SIZE,
                window
            );
        }

        Ok(Self {
            z_threshold,
            window,
        })
    }
}
