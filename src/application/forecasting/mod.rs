pub mod anomaly_detector;
pub mod ensemble;
pub mod horizon_projector;

pub use anomaly_detector::{RollingAnomalyDetector, detect_anomalies};
pub use ensemble::EnsembleCombiner;
pub use horizon_projector::{HorizonJitter, HorizonProjector};
