//! Training configuration parsing from environment variables.
//!
//! Split and seed settings come from the environment. Model hyperparameters
//! (boosting and neural sections) can be supplied by a TOML file named in
//! `TRAIN_PARAMS_FILE`.

use super::{Lookup, parse_optional, parse_or};
use crate::application::ml::TrainingParams;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct TrainingEnvConfig {
    pub holdout_fraction: f64,
    pub cv_folds: usize,
    pub timeout_secs: u64,
    pub seed: u64,
    pub params_file: Option<PathBuf>,
}

impl Default for TrainingEnvConfig {
    fn default() -> Self {
        Self {
            holdout_fraction: 0.2,
            cv_folds: 0,
            timeout_secs: 600,
            seed: 42,
            params_file: None,
        }
    }
}

impl TrainingEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: Lookup) -> Result<Self> {
        let defaults = Self::default();
        let holdout_fraction =
            parse_or(lookup, "TRAIN_HOLDOUT_FRACTION", defaults.holdout_fraction)?;
        if !(0.0..1.0).contains(&holdout_fraction) {
            anyhow::bail!(
                "TRAIN_HOLDOUT_FRACTION must be in [0, 1), got {}",
                holdout_fraction
            );
        }

        Ok(Self {
            holdout_fraction,
            cv_folds: parse_or(lookup, "TRAIN_CV_FOLDS", defaults.cv_folds)?,
            timeout_secs: parse_or(lookup, "TRAIN_TIMEOUT_SECS", defaults.timeout_secs)?,
            seed: parse_or(lookup, "TRAIN_SEED", defaults.seed)?,
            params_file: parse_optional::<String>(lookup, "TRAIN_PARAMS_FILE")?.map(PathBuf::from),
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Hyperparameters from the TOML file (or defaults) with the environment's
    /// split and seed settings applied on top.
    pub fn to_training_params(&self) -> Result<TrainingParams> {
        let mut params = match &self.params_file {
            Some(path) => load_training_params(path)?,
            None => TrainingParams::default(),
        };
        params.holdout_fraction = self.holdout_fraction;
        params.cv_folds = self.cv_folds;
        params.importance_seed = self.seed;
        params.neural.seed = self.seed;
        Ok(params)
    }
}

pub fn load_training_params(path: &Path) -> Result<TrainingParams> {
    let content = std::fs::read_to_string(path)
        .context(format!("Failed to read training params file: {:?}", path))?;
    let params: TrainingParams = toml::from_str(&content)
        .context(format!("Failed to parse training params TOML: {:?}", path))?;
    params
        .validate()
        .context(format!("Invalid training params in {:?}", path))?;
    Ok(params)
}
