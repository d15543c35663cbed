//! Predictor Service
//!
//! Owns the lifecycle of the forecasting core: construct, optionally load a
//! persisted snapshot, optionally train, then serve forecasts.
//!
//! - Forecasts read an `Arc` of the current snapshot and never block on training
//! - Training is serialized by a dedicated lock and publishes its result by
//!   swapping the whole snapshot, after it has been saved
//! - A failed training or save leaves the previous snapshot in place

use crate::application::forecasting::anomaly_detector::{
    DEFAULT_WINDOW, DEFAULT_Z_THRESHOLD, detect_anomalies, validate_threshold,
};
use crate::application::forecasting::{HorizonJitter, HorizonProjector, RollingAnomalyDetector};
use crate::application::ml::feature_synthesizer::synthesize_record;
use crate::application::ml::{ModelSnapshot, ModelTrainer, TrainingParams, TrainingReport};
use crate::domain::errors::ForecastError;
use crate::domain::forecasting::horizon::default_horizons;
use crate::domain::forecasting::{AnomalyReport, Horizon, HorizonForecast};
use crate::domain::ml::{FeatureRecord, RawRecord};
use crate::domain::repositories::ModelStore;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    /// A trained snapshot is loaded and serving
    Ready,
    /// No snapshot yet; forecasts fail with `NotTrained`
    Untrained,
}

/// Everything the service needs besides its store
#[derive(Debug, Clone)]
pub struct PredictorSettings {
    pub training: TrainingParams,
    pub horizons: Vec<Horizon>,
    pub jitter: HorizonJitter,
    /// Seed of the jitter RNG; `None` draws from OS entropy
    pub seed: Option<u64>,
    pub anomaly_threshold: f64,
    pub anomaly_window: usize,
}

impl Default for PredictorSettings {
    fn default() -> Self {
        Self {
            training: TrainingParams::default(),
            horizons: default_horizons(),
            jitter: HorizonJitter::default(),
            seed: None,
            anomaly_threshold: DEFAULT_Z_THRESHOLD,
            anomaly_window: DEFAULT_WINDOW,
        }
    }
}

pub struct PredictorService {
    store: Arc<dyn ModelStore>,
    trainer: ModelTrainer,
    projector: HorizonProjector,
    anomaly_threshold: f64,
    snapshot: RwLock<Option<Arc<ModelSnapshot>>>,
    training_lock: Mutex<()>,
    rng: Mutex<StdRng>,
    detector: Mutex<RollingAnomalyDetector>,
}

impl PredictorService {
    pub fn new(
        store: Arc<dyn ModelStore>,
        settings: PredictorSettings,
    ) -> Result<Self, ForecastError> {
        settings.training.validate()?;
        validate_threshold(settings.anomaly_threshold)?;
        let projector = HorizonProjector::new(settings.horizons, settings.jitter)?;
        let detector =
            RollingAnomalyDetector::new(settings.anomaly_window, settings.anomaly_threshold)?;
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Ok(Self {
            store,
            trainer: ModelTrainer::new(settings.training),
            projector,
            anomaly_threshold: settings.anomaly_threshold,
            snapshot: RwLock::new(None),
            training_lock: Mutex::new(()),
            rng: Mutex::new(rng),
            detector: Mutex::new(detector),
        })
    }

    /// Restores the persisted snapshot, if any.
    ///
    /// A missing snapshot is not an error: the service keeps running untrained.
    pub fn load(&self) -> Result<ModelStatus, ForecastError> {
        match self.store.load() {
            Ok(snapshot) => {
                info!(
                    "PredictorService: loaded snapshot trained at {} on {} samples",
                    snapshot.trained_at, snapshot.training_samples
                );
                *self.snapshot.write() = Some(Arc::new(snapshot));
                Ok(ModelStatus::Ready)
            }
            Err(ForecastError::NotFound { location }) => {
                warn!(
                    "PredictorService: no snapshot at {}, running untrained",
                    location
                );
                Ok(ModelStatus::Untrained)
            }
            Err(e) => Err(e),
        }
    }

    /// Trains a new snapshot, persists it, then makes it current.
    pub fn train(
        &self,
        records: &[FeatureRecord],
        targets: &[f64],
    ) -> Result<TrainingReport, ForecastError> {
        let _guard = self.training_lock.lock();
        let outcome = self.trainer.train(records, targets)?;
        self.store.save(&outcome.snapshot)?;
        info!(
            "PredictorService: snapshot saved, swapping in model trained at {}",
            outcome.snapshot.trained_at
        );
        *self.snapshot.write() = Some(Arc::new(outcome.snapshot));
        Ok(outcome.report)
    }

    /// Runs `train` on the blocking pool and gives up waiting after `timeout`.
    ///
    /// The training job itself is not cancelled: if it finishes later it still
    /// saves and swaps in its snapshot.
    pub async fn retrain_with_timeout(
        self: &Arc<Self>,
        records: Vec<FeatureRecord>,
        targets: Vec<f64>,
        timeout: Duration,
    ) -> Result<TrainingReport, ForecastError> {
        let service = Arc::clone(self);
        let job = tokio::task::spawn_blocking(move || service.train(&records, &targets));

        match tokio::time::timeout(timeout, job).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(ForecastError::training(format!(
                "training task failed: {}",
                e
            ))),
            Err(_) => {
                warn!(
                    "PredictorService: training exceeded {:?}, previous snapshot stays active",
                    timeout
                );
                Err(ForecastError::TrainingTimeout {
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Ensemble forecast of a feature record over the configured horizons.
    pub fn forecast(&self, record: &FeatureRecord) -> Result<HorizonForecast, ForecastError> {
        let snapshot = self.current()?;
        let mut rng = self.call_rng();
        self.projector.project(snapshot.as_ref(), record, &mut rng)
    }

    /// Same as `forecast` over an explicit horizon list.
    pub fn forecast_horizons(
        &self,
        record: &FeatureRecord,
        horizons: &[Horizon],
    ) -> Result<HorizonForecast, ForecastError> {
        let snapshot = self.current()?;
        let mut rng = self.call_rng();
        self.projector
            .project_horizons(snapshot.as_ref(), record, horizons, &mut rng)
    }

    /// Synthesizes features from a raw reading, then forecasts.
    pub fn forecast_raw(&self, raw: &RawRecord) -> Result<HorizonForecast, ForecastError> {
        let record = synthesize_record(raw)?;
        self.forecast(&record)
    }

    /// One-off batch check with the configured threshold.
    pub fn detect_anomalies(&self, values: &[f64]) -> Result<Vec<AnomalyReport>, ForecastError> {
        detect_anomalies(values, self.anomaly_threshold)
    }

    /// Feeds a forecast's ensemble values into the rolling window.
    pub fn observe(&self, forecast: &HorizonForecast) -> Result<Vec<AnomalyReport>, ForecastError> {
        self.detector.lock().observe(&forecast.ensemble_values())
    }

    pub fn feature_importance(&self) -> Result<IndexMap<String, f64>, ForecastError> {
        Ok(self.current()?.feature_importance.clone())
    }

    pub fn status(&self) -> ModelStatus {
        if self.snapshot.read().is_some() {
            ModelStatus::Ready
        } else {
            ModelStatus::Untrained
        }
    }

    pub fn snapshot(&self) -> Option<Arc<ModelSnapshot>> {
        self.snapshot.read().clone()
    }

    pub fn horizons(&self) -> &[Horizon] {
        self.projector.horizons()
    }

    /// Child RNG for one forecast call. The shared lock is released before projecting.
    fn call_rng(&self) -> StdRng {
        StdRng::from_rng(&mut *self.rng.lock())
    }

    fn current(&self) -> Result<Arc<ModelSnapshot>, ForecastError> {
        self.snapshot().ok_or(ForecastError::NotTrained)
    }
}
