use super::gradient_boosting::GradientBoostedTrees;
use super::neural_regressor::NeuralRegressor;
use super::scaler::StandardScaler;
use crate::domain::errors::ForecastError;
use crate::domain::ml::{FeatureRecord, FeatureSchema};
use crate::domain::ports::{EstimatorPair, Regressor};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A fully trained estimator pair with everything needed to reproduce its predictions.
///
/// Immutable once built. The service swaps whole snapshots instead of mutating one.
#[derive(Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub schema: FeatureSchema,
    pub tree: GradientBoostedTrees,
    pub neural: NeuralRegressor,
    /// Fitted on the training rows; applied to neural inputs only
    pub neural_scaler: StandardScaler,
    /// Per-feature importance from the tree model, summing to 1
    pub feature_importance: IndexMap<String, f64>,
    pub training_samples: usize,
    pub trained_at: DateTime<Utc>,
}

impl ModelSnapshot {
    /// Checks the record against the training schema before any estimator runs.
    pub fn vectorize(&self, record: &FeatureRecord) -> Result<Vec<f64>, ForecastError> {
        self.schema.vectorize(record)
    }
}

impl EstimatorPair for ModelSnapshot {
    fn predict_tree(&self, record: &FeatureRecord) -> Result<f64, ForecastError> {
        let row = self.vectorize(record)?;
        self.tree.predict(&row)
    }

    fn predict_neural(&self, record: &FeatureRecord) -> Result<f64, ForecastError> {
        let row = self.vectorize(record)?;
        let scaled = self.neural_scaler.transform_row(&row)?;
        self.neural.predict(&scaled)
    }
}
