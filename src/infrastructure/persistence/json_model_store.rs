use crate::application::ml::ModelSnapshot;
use crate::domain::errors::ForecastError;
use crate::domain::repositories::ModelStore;
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;

/// Snapshot persisted as one JSON file.
///
/// Saves go to `<path>.tmp` first and are renamed over `<path>`, so a reader sees
/// either the previous file or the new one in full.
#[derive(Debug, Clone)]
pub struct JsonFileModelStore {
    file_path: PathBuf,
}

impl JsonFileModelStore {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.file_path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl ModelStore for JsonFileModelStore {
    fn save(&self, snapshot: &ModelSnapshot) -> Result<(), ForecastError> {
        let content = serde_json::to_vec(snapshot)
            .map_err(|e| ForecastError::io(format!("failed to serialize snapshot: {}", e)))?;

        if let Some(parent) = self.file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                ForecastError::io(format!("failed to create {:?}: {}", parent, e))
            })?;
        }

        let temp_path = self.temp_path();
        fs::write(&temp_path, content).map_err(|e| {
            ForecastError::io(format!("failed to write {:?}: {}", temp_path, e))
        })?;
        if let Err(e) = fs::rename(&temp_path, &self.file_path) {
            let _ = fs::remove_file(&temp_path);
            return Err(ForecastError::io(format!(
                "failed to replace {:?}: {}",
                self.file_path, e
            )));
        }

        info!("Saved model snapshot to {:?}", self.file_path);
        Ok(())
    }

    fn load(&self) -> Result<ModelSnapshot, ForecastError> {
        let content = fs::read(&self.file_path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ForecastError::NotFound {
                location: self.file_path.display().to_string(),
            },
            _ => ForecastError::io(format!("failed to read {:?}: {}", self.file_path, e)),
        })?;
        let snapshot: ModelSnapshot = serde_json::from_slice(&content).map_err(|e| {
            ForecastError::io(format!("failed to parse {:?}: {}", self.file_path, e))
        })?;

        info!("Loaded model snapshot from {:?}", self.file_path);
        Ok(snapshot)
    }
}
