use crate::domain::errors::ForecastError;
use crate::domain::forecasting::anomaly::MIN_BATCH_SIZE;
use crate::domain::forecasting::{AnomalyReport, Severity};
use statrs::statistics::Statistics;
use std::collections::VecDeque;
use tracing::{debug, warn};

pub const DEFAULT_Z_THRESHOLD: f64 = 2.0;
pub const DEFAULT_WINDOW: usize = 30;

/// Flags values whose z-score against the batch exceeds `threshold`.
///
/// Uses the population standard deviation. Batches shorter than five values
/// yield no reports, and a constant batch has z = 0 everywhere. Reports keep
/// the input order. A NaN or infinite value fails the whole batch.
pub fn detect_anomalies(
    values: &[f64],
    threshold: f64,
) -> Result<Vec<AnomalyReport>, ForecastError> {
    validate_values(values)?;
    if values.len() < MIN_BATCH_SIZE {
        debug!(
            "Anomaly check skipped: {} values, need at least {}",
            values.len(),
            MIN_BATCH_SIZE
        );
        return Ok(Vec::new());
    }

    let mean = values.iter().mean();
    let std = values.iter().population_std_dev();

    let reports = values
        .iter()
        .enumerate()
        .filter_map(|(index, &value)| {
            let z_score = if std > 0.0 { (value - mean).abs() / std } else { 0.0 };
            (z_score > threshold).then(|| AnomalyReport {
                index,
                value,
                z_score,
                severity: Severity::from_z_score(z_score),
            })
        })
        .collect();
    Ok(reports)
}

fn validate_values(values: &[f64]) -> Result<(), ForecastError> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(ForecastError::prediction(format!(
            "anomaly input #{} is not finite ({})",
            index, values[index]
        ))),
        None => Ok(()),
    }
}

pub fn validate_threshold(threshold: f64) -> Result<(), ForecastError> {
    if !threshold.is_finite() || threshold <= 0.0 {
        return Err(ForecastError::Config {
            reason: format!("z-score threshold must be finite and positive, got {}", threshold),
        });
    }
    Ok(())
}

/// Bounded history of ensemble values checked as one batch on every update.
///
/// Report indices refer to positions in the current window, oldest first.
#[derive(Debug, Clone)]
pub struct RollingAnomalyDetector {
    window: VecDeque<f64>,
    capacity: usize,
    threshold: f64,
}

impl RollingAnomalyDetector {
    pub fn new(capacity: usize, threshold: f64) -> Result<Self, ForecastError> {
        validate_threshold(threshold)?;
        if capacity < MIN_BATCH_SIZE {
            return Err(ForecastError::Config {
                reason: format!(
                    "anomaly window must hold at least {} values, got {}",
                    MIN_BATCH_SIZE, capacity
                ),
            });
        }
        Ok(Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            threshold,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Appends values, evicting the oldest past capacity, then checks the window.
    ///
    /// Non-finite input is rejected before anything enters the window.
    pub fn observe(&mut self, values: &[f64]) -> Result<Vec<AnomalyReport>, ForecastError> {
        validate_values(values)?;
        for &value in values {
            if self.window.len() == self.capacity {
                self.window.pop_front();
            }
            self.window.push_back(value);
        }

        let reports = detect_anomalies(self.window.make_contiguous(), self.threshold)?;
        for report in &reports {
            warn!(
                "Anomalous forecast at window position {}: value={:.3} z={:.2} severity={}",
                report.index, report.value, report.z_score, report.severity
            );
        }
        Ok(reports)
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }
}

impl Default for RollingAnomalyDetector {
    fn default() -> Self {
        Self {
            window: VecDeque::with_capacity(DEFAULT_WINDOW),
            capacity: DEFAULT_WINDOW,
            threshold: DEFAULT_Z_THRESHOLD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_batch_yields_nothing() {
        assert!(detect_anomalies(&[], 2.0).unwrap().is_empty());
        assert!(detect_anomalies(&[1.0, 1000.0, 1.0, 1.0], 0.1).unwrap().is_empty());
    }

    #[test]
    fn test_constant_batch_has_no_anomalies() {
        assert!(detect_anomalies(&[5.0; 8], 0.5).unwrap().is_empty());
    }

    #[test]
    fn test_single_spike_exactly_at_threshold() {
        // mean 28, population std 36, z(100) = 2.0 which is not strictly above 2.0
        let batch = [10.0, 10.0, 10.0, 10.0, 100.0];
        assert!(detect_anomalies(&batch, 2.0).unwrap().is_empty());

        let reports = detect_anomalies(&batch, 1.5).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].index, 4);
        assert_eq!(reports[0].value, 100.0);
        assert!((reports[0].z_score - 2.0).abs() < 1e-9);
        assert_eq!(reports[0].severity, Severity::Medium);
    }

    #[test]
    fn test_high_severity_spike() {
        let mut batch = vec![10.0; 19];
        batch.push(100.0);
        let reports = detect_anomalies(&batch, 2.0).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].index, 19);
        assert!(reports[0].z_score > 4.0);
        assert_eq!(reports[0].severity, Severity::High);
    }

    #[test]
    fn test_reports_keep_input_order() {
        let mut batch = vec![0.0; 20];
        batch[3] = 50.0;
        batch[15] = -50.0;
        let reports = detect_anomalies(&batch, 2.0).unwrap();
        let indices: Vec<usize> = reports.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![3, 15]);
    }

    #[test]
    fn test_threshold_validation() {
        assert!(validate_threshold(2.0).is_ok());
        assert!(validate_threshold(0.0).is_err());
        assert!(validate_threshold(-1.0).is_err());
        assert!(validate_threshold(f64::NAN).is_err());
        assert!(RollingAnomalyDetector::new(30, f64::INFINITY).is_err());
        assert!(RollingAnomalyDetector::new(4, 2.0).is_err());
    }

    #[test]
    fn test_rolling_window_evicts_oldest() {
        let mut detector = RollingAnomalyDetector::new(5, 1.5).unwrap();
        assert!(detector.observe(&[10.0, 10.0, 10.0]).unwrap().is_empty());
        assert_eq!(detector.len(), 3);

        let reports = detector.observe(&[10.0, 100.0]).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].index, 4);

        // spike moves to position 3 after one eviction
        let reports = detector.observe(&[10.0]).unwrap();
        assert_eq!(detector.len(), 5);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].index, 3);

        detector.clear();
        assert!(detector.is_empty());
    }

    #[test]
    fn test_non_finite_values_are_rejected() {
        let with_nan = [10.0, 10.0, 10.0, 10.0, 100.0, f64::NAN];
        assert!(matches!(
            detect_anomalies(&with_nan, 1.5),
            Err(ForecastError::Prediction { .. })
        ));
        let with_inf = [10.0, 10.0, 10.0, 10.0, 10.0, f64::INFINITY];
        assert!(detect_anomalies(&with_inf, 1.5).is_err());
        // short batches are checked too
        assert!(detect_anomalies(&[f64::NEG_INFINITY], 2.0).is_err());

        let mut detector = RollingAnomalyDetector::new(5, 1.5).unwrap();
        detector.observe(&[10.0, 10.0]).unwrap();
        assert!(detector.observe(&[10.0, f64::NAN]).is_err());
        assert_eq!(detector.len(), 2);
    }
}
