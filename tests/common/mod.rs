#![allow(dead_code)]

use chrono::NaiveDate;
use wattcast::application::ml::feature_synthesizer::synthesize;
use wattcast::application::ml::synthetic::generate_series;
use wattcast::application::ml::{BoostingParams, NeuralParams, TrainingParams};
use wattcast::application::predictor_service::PredictorSettings;
use wattcast::domain::ml::{FeatureRecord, RawRecord};

/// Small models that train in well under a second
pub fn fast_params() -> TrainingParams {
    TrainingParams {
        boosting: BoostingParams {
            n_estimators: 25,
            max_depth: 3,
            ..Default::default()
        },
        neural: NeuralParams {
            hidden_layers: vec![16, 8],
            max_iter: 40,
            learning_rate: 0.01,
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn fast_settings() -> PredictorSettings {
    PredictorSettings {
        training: fast_params(),
        seed: Some(42),
        ..Default::default()
    }
}

pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

/// Synthetic daily readings turned into a feature table with targets
pub fn training_set(n: usize, seed: u64) -> (Vec<RawRecord>, Vec<FeatureRecord>, Vec<f64>) {
    let series = generate_series(n, start_date(), seed);
    let raws: Vec<RawRecord> = series.iter().map(|r| r.record.clone()).collect();
    let targets = series.iter().map(|r| r.energy_consumption).collect();
    let records = synthesize(&raws).unwrap();
    (raws, records, targets)
}
