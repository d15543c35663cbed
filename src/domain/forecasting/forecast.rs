use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Single-horizon ensemble output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnsembleForecast {
    pub tree_prediction: f64,
    pub neural_prediction: f64,
    pub ensemble_value: f64,
    /// Model-agreement score in [0.5, 0.95]
    pub confidence: f64,
}

/// Ensemble forecasts keyed by horizon label, in request order.
///
/// Built once per request and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HorizonForecast {
    forecasts: IndexMap<String, EnsembleForecast>,
}

impl HorizonForecast {
    pub(crate) fn from_entries(entries: Vec<(String, EnsembleForecast)>) -> Self {
        Self {
            forecasts: entries.into_iter().collect(),
        }
    }

    pub fn get(&self, label: &str) -> Option<&EnsembleForecast> {
        self.forecasts.get(label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.forecasts.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EnsembleForecast)> {
        self.forecasts.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.forecasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forecasts.is_empty()
    }

    /// Ensemble values in horizon order, ready for anomaly detection.
    pub fn ensemble_values(&self) -> Vec<f64> {
        self.forecasts.values().map(|f| f.ensemble_value).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forecast(value: f64) -> EnsembleForecast {
        EnsembleForecast {
            tree_prediction: value,
            neural_prediction: value,
            ensemble_value: value,
            confidence: 0.95,
        }
    }

    #[test]
    fn test_entries_keep_request_order() {
        let hf = HorizonForecast::from_entries(vec![
            ("30_day".to_string(), forecast(3.0)),
            ("1_day".to_string(), forecast(1.0)),
        ]);
        let labels: Vec<&str> = hf.labels().collect();
        assert_eq!(labels, vec!["30_day", "1_day"]);
        assert_eq!(hf.ensemble_values(), vec![3.0, 1.0]);
    }

    #[test]
    fn test_json_shape() {
        let hf = HorizonForecast::from_entries(vec![("1_day".to_string(), forecast(1.0))]);
        let json = serde_json::to_value(&hf).unwrap();
        assert_eq!(json["1_day"]["ensemble_value"], 1.0);
        assert_eq!(json["1_day"]["confidence"], 0.95);
    }
}
