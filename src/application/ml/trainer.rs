//! Model Trainer
//!
//! Fits the estimator pair on a feature table and evaluates it the way the
//! offline training tool does: chronological holdout, optional walk-forward
//! cross-validation, RMSE/MAE/R² per model, then a permutation importance pass
//! over the tree model.

use super::gradient_boosting::{BoostingParams, GradientBoostedTrees};
use super::neural_regressor::{NeuralParams, NeuralRegressor};
use super::scaler::StandardScaler;
use super::snapshot::ModelSnapshot;
use crate::application::forecasting::EnsembleCombiner;
use crate::domain::errors::ForecastError;
use crate::domain::ml::{FeatureRecord, FeatureSchema};
use crate::domain::ports::Regressor;
use chrono::Utc;
use indexmap::IndexMap;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Training configuration, loadable from a TOML hyperparameter file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingParams {
    pub boosting: BoostingParams,
    pub neural: NeuralParams,
    /// Trailing share of rows held out for evaluation; 0 trains on everything
    pub holdout_fraction: f64,
    /// Walk-forward folds; 0 or 1 disables cross-validation
    pub cv_folds: usize,
    pub importance_seed: u64,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            boosting: BoostingParams::default(),
            neural: NeuralParams::default(),
            holdout_fraction: 0.2,
            cv_folds: 0,
            importance_seed: 42,
        }
    }
}

impl TrainingParams {
    pub fn validate(&self) -> Result<(), ForecastError> {
        if !(0.0..1.0).contains(&self.holdout_fraction) {
            return Err(ForecastError::training(format!(
                "holdout_fraction must be in [0, 1), got {}",
                self.holdout_fraction
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
}

impl RegressionMetrics {
    pub fn evaluate(predictions: &[f64], actuals: &[f64]) -> Self {
        let n = predictions.len().min(actuals.len());
        if n == 0 {
            return Self {
                rmse: 0.0,
                mae: 0.0,
                r2: 0.0,
            };
        }
        let pairs = predictions.iter().zip(actuals.iter());
        let sq_err: f64 = pairs.clone().map(|(p, t)| (p - t).powi(2)).sum();
        let abs_err: f64 = pairs.map(|(p, t)| (p - t).abs()).sum();
        let mse = sq_err / n as f64;

        let mean_y = actuals[..n].iter().sum::<f64>() / n as f64;
        let var_y = actuals[..n].iter().map(|t| (t - mean_y).powi(2)).sum::<f64>() / n as f64;
        let r2 = if var_y > 0.0 { 1.0 - mse / var_y } else { 0.0 };

        Self {
            rmse: mse.sqrt(),
            mae: abs_err / n as f64,
            r2,
        }
    }
}

/// Holdout scores of each model and of their fixed-weight combination
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub tree: RegressionMetrics,
    pub neural: RegressionMetrics,
    pub ensemble: RegressionMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationSummary {
    pub fold_rmse: Vec<f64>,
    pub mean_rmse: f64,
    pub std_rmse: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub training_samples: usize,
    pub holdout_samples: usize,
    pub holdout: Option<ModelMetrics>,
    pub cross_validation: Option<CrossValidationSummary>,
    pub elapsed_ms: u64,
}

pub struct TrainingOutcome {
    pub snapshot: ModelSnapshot,
    pub report: TrainingReport,
}

/// The three fitted pieces of one training run
struct FittedPair {
    scaler: StandardScaler,
    tree: GradientBoostedTrees,
    neural: NeuralRegressor,
}

impl FittedPair {
    fn predict(&self, x: &[Vec<f64>]) -> Result<(Vec<f64>, Vec<f64>), ForecastError> {
        let tree = self.tree.predict_batch(x)?;
        let neural = self.neural.predict_batch(&self.scaler.transform(x)?)?;
        Ok((tree, neural))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModelTrainer {
    params: TrainingParams,
    combiner: EnsembleCombiner,
}

impl ModelTrainer {
    pub fn new(params: TrainingParams) -> Self {
        Self {
            params,
            combiner: EnsembleCombiner::new(),
        }
    }

    pub fn params(&self) -> &TrainingParams {
        &self.params
    }

    /// Trains both estimators on `records` against `targets`.
    ///
    /// Single blocking call. Rows are taken in the given order, which is assumed
    /// chronological for the holdout and cross-validation splits.
    pub fn train(
        &self,
        records: &[FeatureRecord],
        targets: &[f64],
    ) -> Result<TrainingOutcome, ForecastError> {
        let started = Instant::now();
        self.params.validate()?;
        let (schema, x) = Self::prepare(records, targets)?;
        let n = x.len();

        let holdout_n = (n as f64 * self.params.holdout_fraction).floor() as usize;
        let train_n = n - holdout_n;
        if train_n < 2 {
            return Err(ForecastError::training(format!(
                "need at least 2 training rows, got {}",
                train_n
            )));
        }

        info!(
            "ModelTrainer: training on {} samples ({} held out, {} features)",
            train_n,
            holdout_n,
            schema.len()
        );

        let cross_validation = if self.params.cv_folds > 1 {
            self.cross_validate(&x, targets)?
        } else {
            None
        };

        let (x_train, x_test) = x.split_at(train_n);
        let (y_train, y_test) = targets.split_at(train_n);
        let fitted = self.fit_pair(x_train, y_train)?;

        let holdout = if x_test.is_empty() {
            None
        } else {
            let (tree, neural) = fitted.predict(x_test)?;
            let ensemble = self.combine(&tree, &neural);
            let metrics = ModelMetrics {
                tree: RegressionMetrics::evaluate(&tree, y_test),
                neural: RegressionMetrics::evaluate(&neural, y_test),
                ensemble: RegressionMetrics::evaluate(&ensemble, y_test),
            };
            info!(
                "ModelTrainer: holdout (n={}) RMSE tree={:.4} neural={:.4} ensemble={:.4}",
                x_test.len(),
                metrics.tree.rmse,
                metrics.neural.rmse,
                metrics.ensemble.rmse
            );
            Some(metrics)
        };

        let feature_importance =
            self.permutation_importance(&fitted.tree, &schema, x_train, y_train)?;

        let snapshot = ModelSnapshot {
            schema,
            tree: fitted.tree,
            neural: fitted.neural,
            neural_scaler: fitted.scaler,
            feature_importance,
            training_samples: train_n,
            trained_at: Utc::now(),
        };
        let report = TrainingReport {
            training_samples: train_n,
            holdout_samples: holdout_n,
            holdout,
            cross_validation,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!("ModelTrainer: training finished in {}ms", report.elapsed_ms);

        Ok(TrainingOutcome { snapshot, report })
    }

    /// Validates the table and vectorizes it against the first record's schema.
    fn prepare(
        records: &[FeatureRecord],
        targets: &[f64],
    ) -> Result<(FeatureSchema, Vec<Vec<f64>>), ForecastError> {
        let first = records
            .first()
            .ok_or_else(|| ForecastError::training("no training records"))?;
        if records.len() != targets.len() {
            return Err(ForecastError::training(format!(
                "{} records but {} targets",
                records.len(),
                targets.len()
            )));
        }
        if let Some(i) = targets.iter().position(|t| !t.is_finite()) {
            return Err(ForecastError::training(format!(
                "target #{} is not finite",
                i
            )));
        }
        let schema = FeatureSchema::from_record(first);
        if schema.is_empty() {
            return Err(ForecastError::training("records carry no features"));
        }

        let x = records
            .iter()
            .enumerate()
            .map(|(i, record)| {
                if let Some(reason) = schema.mismatch(record) {
                    return Err(ForecastError::training(format!("record #{}: {}", i, reason)));
                }
                let row = schema
                    .vectorize(record)
                    .map_err(|e| ForecastError::training(format!("record #{}: {}", i, e)))?;
                if row.iter().any(|v| !v.is_finite()) {
                    return Err(ForecastError::training(format!(
                        "record #{} has non-finite feature values",
                        i
                    )));
                }
                Ok(row)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok((schema, x))
    }

    fn fit_pair(&self, x: &[Vec<f64>], y: &[f64]) -> Result<FittedPair, ForecastError> {
        let scaler = StandardScaler::fit(x)?;
        let scaled = scaler.transform(x)?;

        let mut tree = GradientBoostedTrees::new(self.params.boosting.clone());
        tree.fit(x, y)?;
        debug!("ModelTrainer: {} fitted ({} trees)", tree.name(), tree.n_trees());

        let mut neural = NeuralRegressor::new(self.params.neural.clone());
        neural.fit(&scaled, y)?;
        debug!("ModelTrainer: {} fitted ({} epochs)", neural.name(), neural.n_iter());

        Ok(FittedPair {
            scaler,
            tree,
            neural,
        })
    }

    fn combine(&self, tree: &[f64], neural: &[f64]) -> Vec<f64> {
        tree.iter()
            .zip(neural.iter())
            .map(|(&t, &n)| self.combiner.combine(t, n).ensemble_value)
            .collect()
    }

    /// Expanding-window folds: fold k trains on the first (k+1)/(folds+1) of the
    /// rows and is tested on the block right after it.
    fn cross_validate(
        &self,
        x: &[Vec<f64>],
        y: &[f64],
    ) -> Result<Option<CrossValidationSummary>, ForecastError> {
        let folds = self.params.cv_folds;
        let n = x.len();
        let mut fold_rmse = Vec::with_capacity(folds);

        for fold in 0..folds {
            let train_end = (fold + 1) * n / (folds + 1);
            let test_end = (fold + 2) * n / (folds + 1);
            if train_end < 2 || test_end <= train_end {
                debug!("ModelTrainer: skipping CV fold {} (too few rows)", fold);
                continue;
            }
            let fitted = self.fit_pair(&x[..train_end], &y[..train_end])?;
            let (tree, neural) = fitted.predict(&x[train_end..test_end])?;
            let ensemble = self.combine(&tree, &neural);
            let rmse = RegressionMetrics::evaluate(&ensemble, &y[train_end..test_end]).rmse;
            debug!(
                "ModelTrainer: CV fold {} train={} test={} RMSE={:.4}",
                fold,
                train_end,
                test_end - train_end,
                rmse
            );
            fold_rmse.push(rmse);
        }

        if fold_rmse.is_empty() {
            warn!("ModelTrainer: cross-validation produced no valid folds");
            return Ok(None);
        }

        let mean_rmse = fold_rmse.iter().mean();
        let std_rmse = if fold_rmse.len() > 1 {
            fold_rmse.iter().std_dev()
        } else {
            0.0
        };
        info!(
            "ModelTrainer: CV ensemble RMSE mean={:.4} std={:.4} over {} folds",
            mean_rmse,
            std_rmse,
            fold_rmse.len()
        );
        if mean_rmse > 0.0 && std_rmse > 0.5 * mean_rmse {
            warn!("ModelTrainer: unstable across folds (std > 50% of mean RMSE)");
        }

        Ok(Some(CrossValidationSummary {
            fold_rmse,
            mean_rmse,
            std_rmse,
        }))
    }

    /// MSE increase of the tree model when each column is shuffled, normalized to sum to 1.
    fn permutation_importance(
        &self,
        tree: &GradientBoostedTrees,
        schema: &FeatureSchema,
        x: &[Vec<f64>],
        y: &[f64],
    ) -> Result<IndexMap<String, f64>, ForecastError> {
        let mse = |pred: &[f64]| RegressionMetrics::evaluate(pred, y).rmse.powi(2);
        let baseline = mse(&tree.predict_batch(x)?);
        let mut rng = StdRng::seed_from_u64(self.params.importance_seed);

        let mut raw = Vec::with_capacity(schema.len());
        for j in 0..schema.len() {
            let mut column: Vec<f64> = x.iter().map(|row| row[j]).collect();
            column.shuffle(&mut rng);
            let permuted: Vec<Vec<f64>> = x
                .iter()
                .zip(column)
                .map(|(row, v)| {
                    let mut row = row.clone();
                    row[j] = v;
                    row
                })
                .collect();
            let increase = mse(&tree.predict_batch(&permuted)?) - baseline;
            raw.push(increase.max(0.0));
        }

        let total: f64 = raw.iter().sum();
        Ok(schema
            .names()
            .iter()
            .zip(raw)
            .map(|(name, v)| {
                let share = if total > 0.0 { v / total } else { 0.0 };
                (name.clone(), share)
            })
            .collect())
    }
}
