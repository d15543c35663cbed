use crate::domain::errors::ForecastError;
use crate::domain::ml::types::FeatureRecord;
use serde::{Deserialize, Serialize};

/// Ordered list of feature names produced by the synthesizer.
/// Models trained on synthesized records capture this order in their schema.
pub const FEATURE_NAMES: &[&str] = &[
    "temperature",
    "humidity",
    "hour",
    "day_of_week",
    "month",
    "is_weekend",
    "is_peak_hour",
    "hour_sin",
    "hour_cos",
    "month_sin",
    "month_cos",
    "temp_humidity",
    "cooling_degree",
    "heating_degree",
    "comfort_index",
];

/// Feature names and order fixed at training time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Captures the schema from the field order of a record.
    pub fn from_record(record: &FeatureRecord) -> Self {
        Self {
            names: record.names().map(str::to_string).collect(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Describes how `record` differs from the schema, or `None` when it matches exactly.
    pub fn mismatch(&self, record: &FeatureRecord) -> Option<String> {
        if let Some(missing) = self.names.iter().find(|n| !record.contains(n)) {
            return Some(format!("feature '{}' is missing", missing));
        }
        if record.len() != self.names.len() {
            let extra: Vec<&str> = record
                .names()
                .filter(|n| !self.names.iter().any(|s| s == n))
                .collect();
            return Some(format!(
                "expected {} features, got {} (unexpected: {})",
                self.names.len(),
                record.len(),
                extra.join(", ")
            ));
        }
        None
    }

    /// Converts a record into a dense vector in schema order.
    pub fn vectorize(&self, record: &FeatureRecord) -> Result<Vec<f64>, ForecastError> {
        if let Some(reason) = self.mismatch(record) {
            return Err(ForecastError::prediction(reason));
        }
        self.names
            .iter()
            .map(|name| {
                record
                    .get(name)
                    .ok_or_else(|| ForecastError::prediction(format!("feature '{}' is missing", name)))
            })
            .collect()
    }
}
