use crate::domain::errors::ForecastError;
use crate::domain::ports::Regressor;
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_regressor::{
    DecisionTreeRegressor, DecisionTreeRegressorParameters,
};
use tracing::debug;

type Tree = DecisionTreeRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Hyperparameters of the boosted tree ensemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: u16,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            learning_rate: 0.1,
            max_depth: 6,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

/// Least-squares gradient boosting over smartcore regression trees.
///
/// Starts from the target mean; every stage fits a tree to the current residuals
/// and adds it shrunk by the learning rate. Works on unscaled features.
#[derive(Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    params: BoostingParams,
    init: f64,
    n_features: usize,
    trees: Vec<Tree>,
}

impl GradientBoostedTrees {
    pub fn new(params: BoostingParams) -> Self {
        Self {
            params,
            init: 0.0,
            n_features: 0,
            trees: Vec::new(),
        }
    }

    pub fn params(&self) -> &BoostingParams {
        &self.params
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn tree_params(&self) -> DecisionTreeRegressorParameters {
        DecisionTreeRegressorParameters::default()
            .with_max_depth(self.params.max_depth)
            .with_min_samples_split(self.params.min_samples_split)
            .with_min_samples_leaf(self.params.min_samples_leaf)
    }

    fn validate_params(&self) -> Result<(), ForecastError> {
        if self.params.n_estimators == 0 {
            return Err(ForecastError::training("n_estimators must be positive"));
        }
        if !(self.params.learning_rate > 0.0 && self.params.learning_rate <= 1.0) {
            return Err(ForecastError::training(format!(
                "learning_rate must be in (0, 1], got {}",
                self.params.learning_rate
            )));
        }
        if self.params.max_depth == 0 {
            return Err(ForecastError::training("max_depth must be positive"));
        }
        Ok(())
    }

    fn predict_matrix(&self, matrix: &DenseMatrix<f64>, n_rows: usize) -> Result<Vec<f64>, ForecastError> {
        let mut out = vec![self.init; n_rows];
        for tree in &self.trees {
            let stage = tree
                .predict(matrix)
                .map_err(|e| ForecastError::prediction(format!("tree prediction failed: {}", e)))?;
            for (acc, s) in out.iter_mut().zip(stage.iter()) {
                *acc += self.params.learning_rate * s;
            }
        }
        Ok(out)
    }
}

impl Default for GradientBoostedTrees {
    fn default() -> Self {
        Self::new(BoostingParams::default())
    }
}

impl Regressor for GradientBoostedTrees {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), ForecastError> {
        self.validate_params()?;
        if x.is_empty() || x.len() != y.len() {
            return Err(ForecastError::training(format!(
                "need matching non-empty inputs, got {} rows and {} targets",
                x.len(),
                y.len()
            )));
        }
        let n_features = x[0].len();

        let matrix = DenseMatrix::from_2d_vec(&x.to_vec())
            .map_err(|e| ForecastError::training(format!("matrix creation failed: {}", e)))?;

        let init = y.iter().sum::<f64>() / y.len() as f64;
        let mut current = vec![init; y.len()];
        let mut trees = Vec::with_capacity(self.params.n_estimators);
        let tree_params = self.tree_params();

        for stage in 0..self.params.n_estimators {
            let residuals: Vec<f64> = y.iter().zip(current.iter()).map(|(t, p)| t - p).collect();
            let tree = Tree::fit(&matrix, &residuals, tree_params.clone()).map_err(|e| {
                ForecastError::training(format!("tree {} failed to fit: {}", stage, e))
            })?;
            let update = tree
                .predict(&matrix)
                .map_err(|e| ForecastError::training(format!("tree {} failed to predict: {}", stage, e)))?;
            for (p, u) in current.iter_mut().zip(update.iter()) {
                *p += self.params.learning_rate * u;
            }
            trees.push(tree);

            if stage % 50 == 0 {
                let mse = y
                    .iter()
                    .zip(current.iter())
                    .map(|(t, p)| (t - p).powi(2))
                    .sum::<f64>()
                    / y.len() as f64;
                debug!("GradientBoostedTrees: stage {} train MSE={:.6}", stage, mse);
            }
        }

        self.init = init;
        self.n_features = n_features;
        self.trees = trees;
        Ok(())
    }

    fn predict(&self, row: &[f64]) -> Result<f64, ForecastError> {
        let batch = self.predict_batch(&[row.to_vec()])?;
        batch
            .first()
            .copied()
            .ok_or_else(|| ForecastError::prediction("no prediction returned"))
    }

    fn predict_batch(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, ForecastError> {
        if !self.is_fitted() {
            return Err(ForecastError::NotTrained);
        }
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(bad) = rows.iter().find(|r| r.len() != self.n_features) {
            return Err(ForecastError::prediction(format!(
                "expected {} features, got {}",
                self.n_features,
                bad.len()
            )));
        }
        let matrix = DenseMatrix::from_2d_vec(&rows.to_vec())
            .map_err(|e| ForecastError::prediction(format!("matrix creation failed: {}", e)))?;
        self.predict_matrix(&matrix, rows.len())
    }

    fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    fn name(&self) -> &str {
        "Gradient Boosted Trees"
    }
}
