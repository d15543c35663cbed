use crate::domain::errors::ForecastError;
use crate::domain::ml::FeatureRecord;

/// A regression model trained on dense feature rows.
pub trait Regressor: Send + Sync {
    /// Fits the model on `x` (one row per sample) against `y`. Single blocking batch.
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), ForecastError>;

    /// Predicts one row.
    fn predict(&self, row: &[f64]) -> Result<f64, ForecastError>;

    fn predict_batch(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, ForecastError> {
        rows.iter().map(|row| self.predict(row)).collect()
    }

    fn is_fitted(&self) -> bool;

    /// Get model name/type
    fn name(&self) -> &str;
}

/// The two independent estimators consumed by the ensemble.
///
/// Implementations own any schema handling and input scaling; callers hand over
/// the feature record as received.
pub trait EstimatorPair: Send + Sync {
    fn predict_tree(&self, record: &FeatureRecord) -> Result<f64, ForecastError>;

    fn predict_neural(&self, record: &FeatureRecord) -> Result<f64, ForecastError>;
}
