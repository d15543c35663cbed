use crate::domain::errors::ForecastError;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Zero-mean, unit-variance scaler for the neural regressor's inputs.
///
/// Fitted once on the training rows and reused unchanged at inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    std: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(x: &[Vec<f64>]) -> Result<Self, ForecastError> {
        let n_features = x
            .first()
            .map(Vec::len)
            .ok_or_else(|| ForecastError::training("cannot fit scaler on empty data"))?;
        if x.iter().any(|row| row.len() != n_features) {
            return Err(ForecastError::training("ragged feature matrix"));
        }

        let mut mean = Vec::with_capacity(n_features);
        let mut std = Vec::with_capacity(n_features);
        for j in 0..n_features {
            let column: Vec<f64> = x.iter().map(|row| row[j]).collect();
            let m = column.iter().mean();
            let s = column.iter().population_std_dev();
            mean.push(m);
            // Constant columns are left centred but unscaled
            std.push(if s.is_finite() && s > f64::EPSILON { s } else { 1.0 });
        }

        Ok(Self { mean, std })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>, ForecastError> {
        if row.len() != self.mean.len() {
            return Err(ForecastError::prediction(format!(
                "scaler expects {} features, got {}",
                self.mean.len(),
                row.len()
            )));
        }
        Ok(row
            .iter()
            .zip(self.mean.iter().zip(self.std.iter()))
            .map(|(v, (m, s))| (v - m) / s)
            .collect())
    }

    pub fn transform(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, ForecastError> {
        x.iter().map(|row| self.transform_row(row)).collect()
    }
}
