//! Model storage configuration.

use super::Lookup;
use std::path::PathBuf;

pub const DEFAULT_MODEL_PATH: &str = "data/models/energy_models.json";

#[derive(Debug, Clone)]
pub struct StorageEnvConfig {
    pub model_path: PathBuf,
}

impl Default for StorageEnvConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
        }
    }
}

impl StorageEnvConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: Lookup) -> Self {
        Self {
            model_path: lookup("MODEL_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
        }
    }
}
