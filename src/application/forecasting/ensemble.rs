use crate::domain::errors::ForecastError;
use crate::domain::forecasting::EnsembleForecast;
use crate::domain::ml::FeatureRecord;
use crate::domain::ports::EstimatorPair;

/// Fixed weight of the tree model in the ensemble
pub const TREE_WEIGHT: f64 = 0.6;
/// Fixed weight of the neural model in the ensemble
pub const NEURAL_WEIGHT: f64 = 0.4;

pub const MIN_CONFIDENCE: f64 = 0.5;
pub const MAX_CONFIDENCE: f64 = 0.95;

/// Ensemble Combiner
///
/// Merges the tree and neural predictions with fixed weights (not learned) and
/// scores how much the two models agree.
/// - ensemble = 0.6 * tree + 0.4 * neural
/// - confidence = clamp(1 - |tree - neural| / max(tree, neural, 1), 0.5, 0.95)
#[derive(Debug, Clone, Copy, Default)]
pub struct EnsembleCombiner;

impl EnsembleCombiner {
    pub fn new() -> Self {
        Self
    }

    /// Combines two finite predictions.
    pub fn combine(&self, tree_prediction: f64, neural_prediction: f64) -> EnsembleForecast {
        EnsembleForecast {
            tree_prediction,
            neural_prediction,
            ensemble_value: TREE_WEIGHT * tree_prediction + NEURAL_WEIGHT * neural_prediction,
            confidence: Self::confidence(tree_prediction, neural_prediction),
        }
    }

    /// Agreement score, bounded to [0.5, 0.95].
    ///
    /// The `max(.., 1)` floor keeps the ratio defined when both predictions are near zero.
    pub fn confidence(tree_prediction: f64, neural_prediction: f64) -> f64 {
        let scale = tree_prediction.max(neural_prediction).max(1.0);
        let agreement = 1.0 - (tree_prediction - neural_prediction).abs() / scale;
        if agreement.is_nan() {
            return MIN_CONFIDENCE;
        }
        agreement.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
    }

    /// Runs both estimators on one record and combines the results.
    pub fn forecast(
        &self,
        pair: &dyn EstimatorPair,
        record: &FeatureRecord,
    ) -> Result<EnsembleForecast, ForecastError> {
        let tree = pair.predict_tree(record)?;
        let neural = pair.predict_neural(record)?;
        if !tree.is_finite() || !neural.is_finite() {
            return Err(ForecastError::prediction(format!(
                "non-finite estimator output (tree={}, neural={})",
                tree, neural
            )));
        }
        Ok(self.combine(tree, neural))
    }
}
