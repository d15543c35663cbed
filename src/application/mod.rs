// Ensemble, horizon projection and anomaly detection
pub mod forecasting;

// Estimators, feature synthesis and training
pub mod ml;

// Service owning the model lifecycle
pub mod predictor_service;
