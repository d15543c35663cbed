use serde::{Deserialize, Serialize};
use std::fmt;

/// Z-score above which an anomaly is reported as high severity
pub const HIGH_SEVERITY_Z: f64 = 3.0;

/// Smallest batch the detector will judge
pub const MIN_BATCH_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
}

impl Severity {
    pub fn from_z_score(z_score: f64) -> Self {
        if z_score > HIGH_SEVERITY_Z {
            Severity::High
        } else {
            Severity::Medium
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    /// Position of the value in the analysed batch
    pub index: usize,
    pub value: f64,
    pub z_score: f64,
    pub severity: Severity,
}
