use thiserror::Error;

/// Errors surfaced by the forecasting core.
///
/// Every variant is returned to the immediate caller; nothing is retried internally.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("Invalid record: {field} {reason}")]
    InvalidRecord { field: String, reason: String },

    #[error("Invalid horizon: {reason}")]
    InvalidHorizon { reason: String },

    #[error("Training failed: {reason}")]
    Training { reason: String },

    #[error("Training timed out after {timeout_ms}ms")]
    TrainingTimeout { timeout_ms: u64 },

    #[error("Prediction failed: {reason}")]
    Prediction { reason: String },

    #[error("No trained model loaded")]
    NotTrained,

    #[error("Model snapshot not found at {location}")]
    NotFound { location: String },

    #[error("Model store I/O failure: {reason}")]
    Io { reason: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },
}

impl ForecastError {
    pub fn invalid_record(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn training(reason: impl Into<String>) -> Self {
        Self::Training {
            reason: reason.into(),
        }
    }

    pub fn prediction(reason: impl Into<String>) -> Self {
        Self::Prediction {
            reason: reason.into(),
        }
    }

    pub fn io(reason: impl Into<String>) -> Self {
        Self::Io {
            reason: reason.into(),
        }
    }

    /// Recoverable conditions the host can react to without tearing the service down.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Prediction { .. } | Self::NotFound { .. } | Self::NotTrained
        )
    }
}

pub type ForecastResult<T> = Result<T, ForecastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_record_formatting() {
        let err = ForecastError::invalid_record("humidity", "is missing");
        let msg = err.to_string();
        assert!(msg.contains("humidity"));
        assert!(msg.contains("is missing"));
    }

    #[test]
    fn test_timeout_formatting() {
        let err = ForecastError::TrainingTimeout { timeout_ms: 1500 };
        assert!(err.to_string().contains("1500ms"));
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(ForecastError::NotTrained.is_recoverable());
        assert!(
            ForecastError::NotFound {
                location: "model.json".to_string()
            }
            .is_recoverable()
        );
        assert!(!ForecastError::training("singular matrix").is_recoverable());
        assert!(!ForecastError::io("disk full").is_recoverable());
    }
}
