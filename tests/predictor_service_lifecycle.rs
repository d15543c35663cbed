mod common;

use common::{fast_settings, training_set};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use wattcast::application::forecasting::HorizonJitter;
use wattcast::application::ml::{BoostingParams, ModelSnapshot, NeuralParams, TrainingParams};
use wattcast::application::predictor_service::{
    ModelStatus, PredictorService, PredictorSettings,
};
use wattcast::domain::errors::ForecastError;
use wattcast::domain::forecasting::{Horizon, HorizonForecast, Severity};
use wattcast::domain::repositories::ModelStore;
use wattcast::infrastructure::persistence::{InMemoryModelStore, JsonFileModelStore};

/// Store whose saves always fail
struct ReadOnlyStore;

impl ModelStore for ReadOnlyStore {
    fn save(&self, _snapshot: &ModelSnapshot) -> Result<(), ForecastError> {
        Err(ForecastError::io("read-only store"))
    }

    fn load(&self) -> Result<ModelSnapshot, ForecastError> {
        Err(ForecastError::NotFound {
            location: "read-only".to_string(),
        })
    }
}

fn service_with(store: Arc<dyn ModelStore>) -> PredictorService {
    PredictorService::new(store, fast_settings()).unwrap()
}

#[test]
fn test_untrained_service_falls_back() {
    let dir = tempdir().unwrap();
    let service = service_with(Arc::new(JsonFileModelStore::new(dir.path().join("m.json"))));

    assert_eq!(service.load().unwrap(), ModelStatus::Untrained);
    assert_eq!(service.status(), ModelStatus::Untrained);
    assert!(service.snapshot().is_none());

    let (raws, records, _) = training_set(5, 1);
    assert!(matches!(service.forecast(&records[0]), Err(ForecastError::NotTrained)));
    assert!(matches!(service.forecast_raw(&raws[0]), Err(ForecastError::NotTrained)));
    assert!(matches!(service.feature_importance(), Err(ForecastError::NotTrained)));
}

#[test]
fn test_train_save_and_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("energy_models.json");
    let (raws, records, targets) = training_set(90, 42);

    let service = service_with(Arc::new(JsonFileModelStore::new(&path)));
    let report = service.train(&records, &targets).unwrap();
    assert_eq!(report.training_samples, 72);
    assert_eq!(service.status(), ModelStatus::Ready);

    let forecast = service.forecast_raw(&raws[0]).unwrap();
    let labels: Vec<&str> = forecast.labels().collect();
    assert_eq!(labels, vec!["1_day", "7_day", "30_day"]);
    for (_, f) in forecast.iter() {
        assert!((0.5..=0.95).contains(&f.confidence));
    }

    // a fresh service over the same file serves the same base-horizon forecast
    let reloaded = service_with(Arc::new(JsonFileModelStore::new(&path)));
    assert_eq!(reloaded.load().unwrap(), ModelStatus::Ready);
    let again = reloaded.forecast_raw(&raws[0]).unwrap();
    assert_eq!(again.get("1_day"), forecast.get("1_day"));
    assert_eq!(
        reloaded.feature_importance().unwrap(),
        service.feature_importance().unwrap()
    );
}

#[test]
fn test_failed_training_keeps_previous_snapshot() {
    let service = service_with(Arc::new(InMemoryModelStore::new()));
    let (_, records, targets) = training_set(60, 7);
    service.train(&records, &targets).unwrap();
    let before = service.snapshot().unwrap();

    let err = service.train(&records, &targets[..10]).unwrap_err();
    assert!(matches!(err, ForecastError::Training { .. }));
    assert!(Arc::ptr_eq(&before, &service.snapshot().unwrap()));
}

#[test]
fn test_failed_save_does_not_swap() {
    let service = service_with(Arc::new(ReadOnlyStore));
    assert_eq!(service.load().unwrap(), ModelStatus::Untrained);

    let (_, records, targets) = training_set(40, 9);
    let err = service.train(&records, &targets).unwrap_err();
    assert!(matches!(err, ForecastError::Io { .. }));
    assert_eq!(service.status(), ModelStatus::Untrained);
}

#[test]
fn test_batch_anomaly_check() {
    let service = service_with(Arc::new(InMemoryModelStore::new()));

    assert!(service.detect_anomalies(&[1.0, 2.0]).unwrap().is_empty());
    let mut batch = vec![500.0; 19];
    batch.push(5000.0);
    let reports = service.detect_anomalies(&batch).unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].index, 19);

    batch.push(f64::NAN);
    assert!(matches!(
        service.detect_anomalies(&batch),
        Err(ForecastError::Prediction { .. })
    ));
}

#[test]
fn test_rolling_observation_flags_outlier() {
    let settings = PredictorSettings {
        horizons: vec![Horizon::days(1).unwrap()],
        jitter: HorizonJitter::disabled(),
        ..fast_settings()
    };
    let service = PredictorService::new(Arc::new(InMemoryModelStore::new()), settings).unwrap();
    let (_, records, targets) = training_set(60, 11);
    service.train(&records, &targets).unwrap();

    // identical forecasts fill the window without tripping the check
    let forecast = service.forecast(&records[0]).unwrap();
    assert_eq!(forecast.len(), 1);
    for _ in 0..5 {
        assert!(service.observe(&forecast).unwrap().is_empty());
    }

    // five values v and one 10v: mean 2.5v, std ~3.35v, z ~2.24
    let value = forecast.ensemble_values()[0];
    let outlier: HorizonForecast = serde_json::from_value(serde_json::json!({
        "1_day": {
            "tree_prediction": value * 10.0,
            "neural_prediction": value * 10.0,
            "ensemble_value": value * 10.0,
            "confidence": 0.95,
        }
    }))
    .unwrap();
    let reports = service.observe(&outlier).unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].index, 5);
    assert_eq!(reports[0].severity, Severity::Medium);
}

#[test]
fn test_negative_jitter_rejected() {
    let settings = PredictorSettings {
        jitter: HorizonJitter {
            temperature_std: -0.1,
            ..HorizonJitter::default()
        },
        ..fast_settings()
    };
    let result = PredictorService::new(Arc::new(InMemoryModelStore::new()), settings);
    assert!(matches!(result, Err(ForecastError::Config { .. })));
}

#[test]
fn test_seeded_forecasts_are_reproducible() {
    let (_, records, targets) = training_set(60, 17);
    let first = service_with(Arc::new(InMemoryModelStore::new()));
    let second = service_with(Arc::new(InMemoryModelStore::new()));
    first.train(&records, &targets).unwrap();
    second.train(&records, &targets).unwrap();

    let a1 = first.forecast(&records[5]).unwrap();
    let a2 = first.forecast(&records[5]).unwrap();
    assert_eq!(a1, second.forecast(&records[5]).unwrap());
    assert_eq!(a2, second.forecast(&records[5]).unwrap());
    // each call draws fresh jitter beyond the base horizon
    assert_eq!(a1.get("1_day"), a2.get("1_day"));
    assert_ne!(a1.get("30_day"), a2.get("30_day"));
}

#[test]
fn test_concurrent_forecasts_during_training() {
    let service = Arc::new(service_with(Arc::new(InMemoryModelStore::new())));
    let (_, records, targets) = training_set(60, 13);
    service.train(&records, &targets).unwrap();

    let probe = records[3].clone();
    std::thread::scope(|scope| {
        let trainer = Arc::clone(&service);
        let (records, targets) = (records.clone(), targets.clone());
        scope.spawn(move || trainer.train(&records, &targets).unwrap());

        for _ in 0..4 {
            let reader = Arc::clone(&service);
            let probe = probe.clone();
            scope.spawn(move || {
                for _ in 0..10 {
                    let forecast = reader.forecast(&probe).unwrap();
                    assert_eq!(forecast.len(), 3);
                }
            });
        }
    });
    assert_eq!(service.status(), ModelStatus::Ready);
}

#[tokio::test]
async fn test_retrain_within_timeout() {
    let service = Arc::new(service_with(Arc::new(InMemoryModelStore::new())));
    let (_, records, targets) = training_set(60, 17);

    let report = service
        .retrain_with_timeout(records, targets, Duration::from_secs(120))
        .await
        .unwrap();
    assert!(report.training_samples > 0);
    assert_eq!(service.status(), ModelStatus::Ready);
}

#[tokio::test]
async fn test_retrain_timeout_keeps_previous_snapshot() {
    let slow = PredictorSettings {
        training: TrainingParams {
            boosting: BoostingParams {
                n_estimators: 200,
                ..Default::default()
            },
            neural: NeuralParams {
                hidden_layers: vec![32],
                max_iter: 100,
                n_iter_no_change: 1000,
                ..Default::default()
            },
            ..Default::default()
        },
        seed: Some(1),
        ..Default::default()
    };
    let service =
        Arc::new(PredictorService::new(Arc::new(InMemoryModelStore::new()), slow).unwrap());
    let (_, records, targets) = training_set(30, 19);
    service.train(&records, &targets).unwrap();
    let before = service.snapshot().unwrap();

    let (_, records, targets) = training_set(400, 23);
    let err = service
        .retrain_with_timeout(records, targets, Duration::from_millis(1))
        .await
        .unwrap_err();
    assert!(matches!(err, ForecastError::TrainingTimeout { timeout_ms: 1 }));
    assert!(Arc::ptr_eq(&before, &service.snapshot().unwrap()));
}
