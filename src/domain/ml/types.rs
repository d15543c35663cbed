use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Raw timestamped weather reading, as handed over by the ingestion layer.
///
/// Fields are optional because the loader may not have them; synthesis rejects
/// missing values instead of defaulting them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub timestamp: Option<NaiveDateTime>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

impl RawRecord {
    pub fn new(timestamp: NaiveDateTime, temperature: f64, humidity: f64) -> Self {
        Self {
            timestamp: Some(timestamp),
            temperature: Some(temperature),
            humidity: Some(humidity),
        }
    }
}

/// Ordered mapping of named numeric features.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureRecord {
    values: IndexMap<String, f64>,
}

impl FeatureRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: IndexMap::with_capacity(capacity),
        }
    }

    /// Inserts or replaces a field, keeping the original position on replace.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut f64> {
        self.values.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for FeatureRecord {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut record = FeatureRecord::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_preserves_insertion_order() {
        let record: FeatureRecord = [("b", 2.0), ("a", 1.0), ("c", 3.0)].into_iter().collect();
        let names: Vec<&str> = record.names().collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut record: FeatureRecord = [("x", 1.0), ("y", 2.0)].into_iter().collect();
        record.insert("x", 10.0);
        assert_eq!(record.iter().next(), Some(("x", 10.0)));
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let record: FeatureRecord = [("temperature", 25.0)].into_iter().collect();
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"temperature":25.0}"#);
    }
}
