//! Feed-forward neural regressor
//!
//! Fully connected ReLU network with a linear output unit, trained with
//! mini-batch Adam on half mean squared error plus an L2 penalty.
//! Expects standardized inputs; scaling is owned by the caller.

use crate::domain::errors::ForecastError;
use crate::domain::ports::Regressor;
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Network and optimizer hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeuralParams {
    pub hidden_layers: Vec<usize>,
    pub learning_rate: f64,
    /// L2 penalty
    pub alpha: f64,
    pub batch_size: usize,
    pub max_iter: usize,
    pub tol: f64,
    pub n_iter_no_change: usize,
    pub seed: u64,
}

impl Default for NeuralParams {
    fn default() -> Self {
        Self {
            hidden_layers: vec![100, 50, 25],
            learning_rate: 0.001,
            alpha: 0.0001,
            batch_size: 200,
            max_iter: 500,
            tol: 1e-4,
            n_iter_no_change: 10,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DenseLayer {
    weights: Array2<f64>,
    biases: Array1<f64>,
}

impl DenseLayer {
    /// Glorot-uniform initialization
    fn new(input_size: usize, output_size: usize, rng: &mut StdRng) -> Self {
        let limit = (6.0 / (input_size + output_size) as f64).sqrt();
        let weights = Array2::from_shape_fn((input_size, output_size), |_| {
            rng.random_range(-limit..limit)
        });
        let biases = Array1::from_shape_fn(output_size, |_| rng.random_range(-limit..limit));
        Self { weights, biases }
    }
}

/// Adam moment estimates for one layer
struct AdamState {
    m_w: Array2<f64>,
    v_w: Array2<f64>,
    m_b: Array1<f64>,
    v_b: Array1<f64>,
}

impl AdamState {
    fn for_layer(layer: &DenseLayer) -> Self {
        Self {
            m_w: Array2::zeros(layer.weights.dim()),
            v_w: Array2::zeros(layer.weights.dim()),
            m_b: Array1::zeros(layer.biases.len()),
            v_b: Array1::zeros(layer.biases.len()),
        }
    }
}

const BETA1: f64 = 0.9;
const BETA2: f64 = 0.999;
const EPSILON: f64 = 1e-8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeuralRegressor {
    params: NeuralParams,
    layers: Vec<DenseLayer>,
    n_features: usize,
    /// Epochs run during the last fit
    n_iter: usize,
}

impl NeuralRegressor {
    pub fn new(params: NeuralParams) -> Self {
        Self {
            params,
            layers: Vec::new(),
            n_features: 0,
            n_iter: 0,
        }
    }

    pub fn params(&self) -> &NeuralParams {
        &self.params
    }

    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Returns the activations of every layer, input first.
    fn forward(&self, input: Array2<f64>) -> Vec<Array2<f64>> {
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(input);
        let last = self.layers.len().saturating_sub(1);
        for (i, layer) in self.layers.iter().enumerate() {
            let z = activations[i].dot(&layer.weights) + &layer.biases;
            let a = if i == last { z } else { z.mapv(|v| v.max(0.0)) };
            activations.push(a);
        }
        activations
    }

    fn output(&self, input: Array2<f64>) -> Array1<f64> {
        let mut activations = self.forward(input);
        activations
            .pop()
            .map(|out| out.index_axis_move(Axis(1), 0))
            .unwrap_or_else(|| Array1::zeros(0))
    }

    fn to_matrix(rows: &[Vec<f64>], width: usize) -> Result<Array2<f64>, ForecastError> {
        let flat: Vec<f64> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Array2::from_shape_vec((rows.len(), width), flat)
            .map_err(|e| ForecastError::prediction(format!("invalid input shape: {}", e)))
    }

    fn validate_params(&self) -> Result<(), ForecastError> {
        let p = &self.params;
        if p.hidden_layers.iter().any(|&h| h == 0) {
            return Err(ForecastError::training("hidden layer sizes must be positive"));
        }
        if !(p.learning_rate > 0.0) || p.batch_size == 0 || p.max_iter == 0 {
            return Err(ForecastError::training(
                "learning_rate, batch_size and max_iter must be positive",
            ));
        }
        Ok(())
    }

    /// One Adam step on a mini-batch. Returns the batch loss.
    fn train_batch(
        &mut self,
        x: Array2<f64>,
        y: &Array1<f64>,
        states: &mut [AdamState],
        t: i32,
    ) -> f64 {
        let n = x.nrows() as f64;
        let activations = self.forward(x);
        let Some(output) = activations.last() else {
            return 0.0;
        };
        let residual = output.column(0).to_owned() - y;
        let l2: f64 = self.layers.iter().map(|l| l.weights.mapv(|w| w * w).sum()).sum();
        let loss = residual.mapv(|r| r * r).sum() / (2.0 * n) + self.params.alpha * l2 / (2.0 * n);

        let mut delta = residual.insert_axis(Axis(1)) / n;
        let lr_t = self.params.learning_rate * (1.0 - BETA2.powi(t)).sqrt() / (1.0 - BETA1.powi(t));

        for i in (0..self.layers.len()).rev() {
            let grad_w = activations[i].t().dot(&delta) + &self.layers[i].weights * (self.params.alpha / n);
            let grad_b = delta.sum_axis(Axis(0));

            if i > 0 {
                let mut back = delta.dot(&self.layers[i].weights.t());
                back.zip_mut_with(&activations[i], |d, &a| {
                    if a <= 0.0 {
                        *d = 0.0;
                    }
                });
                delta = back;
            }

            let s = &mut states[i];
            s.m_w = &s.m_w * BETA1 + &grad_w * (1.0 - BETA1);
            s.v_w = &s.v_w * BETA2 + &grad_w.mapv(|g| g * g) * (1.0 - BETA2);
            s.m_b = &s.m_b * BETA1 + &grad_b * (1.0 - BETA1);
            s.v_b = &s.v_b * BETA2 + &grad_b.mapv(|g| g * g) * (1.0 - BETA2);

            let layer = &mut self.layers[i];
            layer.weights = &layer.weights - &(&s.m_w * lr_t / &(s.v_w.mapv(f64::sqrt) + EPSILON));
            layer.biases = &layer.biases - &(&s.m_b * lr_t / &(s.v_b.mapv(f64::sqrt) + EPSILON));
        }

        loss
    }
}

impl Default for NeuralRegressor {
    fn default() -> Self {
        Self::new(NeuralParams::default())
    }
}

impl Regressor for NeuralRegressor {
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
        if n_features == 0 || x.iter().any(|r| r.len() != n_features) {
            return Err(ForecastError::training("ragged or empty feature rows"));
        }

        let inputs = Self::to_matrix(x, n_features).map_err(|e| ForecastError::training(e.to_string()))?;
        let targets = Array1::from(y.to_vec());

        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let mut sizes = vec![n_features];
        sizes.extend(self.params.hidden_layers.iter().copied());
        sizes.push(1);
        self.layers = sizes
            .windows(2)
            .map(|w| DenseLayer::new(w[0], w[1], &mut rng))
            .collect();
        self.n_features = n_features;

        let mut states: Vec<AdamState> = self.layers.iter().map(AdamState::for_layer).collect();
        let batch_size = self.params.batch_size.min(x.len());
        let mut indices: Vec<usize> = (0..x.len()).collect();
        let mut best_loss = f64::INFINITY;
        let mut no_improvement = 0;
        let mut t = 0;

        self.n_iter = 0;
        for epoch in 0..self.params.max_iter {
            indices.shuffle(&mut rng);
            let mut epoch_loss = 0.0;
            for chunk in indices.chunks(batch_size) {
                t += 1;
                let xb = inputs.select(Axis(0), chunk);
                let yb = targets.select(Axis(0), chunk);
                epoch_loss += self.train_batch(xb, &yb, &mut states, t) * chunk.len() as f64;
            }
            epoch_loss /= x.len() as f64;
            self.n_iter = epoch + 1;

            if !epoch_loss.is_finite() {
                return Err(ForecastError::training(format!(
                    "loss diverged at epoch {}",
                    epoch
                )));
            }
            if epoch % 50 == 0 {
                debug!("NeuralRegressor: epoch {} loss={:.6}", epoch, epoch_loss);
            }

            if epoch_loss > best_loss - self.params.tol {
                no_improvement += 1;
            } else {
                no_improvement = 0;
            }
            best_loss = best_loss.min(epoch_loss);
            if no_improvement > self.params.n_iter_no_change {
                debug!(
                    "NeuralRegressor: loss stalled for {} epochs, stopping at epoch {}",
                    self.params.n_iter_no_change, epoch
                );
                break;
            }
        }

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
        if let Some(bad) = rows.iter().find(|r| r.len() != self.n_features) {
            return Err(ForecastError::prediction(format!(
                "expected {} features, got {}",
                self.n_features,
                bad.len()
            )));
        }
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let input = Self::to_matrix(rows, self.n_features)?;
        Ok(self.output(input).to_vec())
    }

    fn is_fitted(&self) -> bool {
        !self.layers.is_empty()
    }

    fn name(&self) -> &str {
        "Neural Network"
    }
}
