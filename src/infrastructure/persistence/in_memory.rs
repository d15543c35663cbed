use crate::application::ml::ModelSnapshot;
use crate::domain::errors::ForecastError;
use crate::domain::repositories::ModelStore;
use parking_lot::RwLock;

/// Keeps the last saved snapshot as serialized JSON.
///
/// For tests and hosts that manage durability themselves.
#[derive(Debug, Default)]
pub struct InMemoryModelStore {
    content: RwLock<Option<Vec<u8>>>,
}

impl InMemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.content.read().is_none()
    }
}

impl ModelStore for InMemoryModelStore {
    fn save(&self, snapshot: &ModelSnapshot) -> Result<(), ForecastError> {
        let content = serde_json::to_vec(snapshot)
            .map_err(|e| ForecastError::io(format!("failed to serialize snapshot: {}", e)))?;
        *self.content.write() = Some(content);
        Ok(())
    }

    fn load(&self) -> Result<ModelSnapshot, ForecastError> {
        let guard = self.content.read();
        let content = guard.as_ref().ok_or_else(|| ForecastError::NotFound {
            location: "memory".to_string(),
        })?;
        serde_json::from_slice(content)
            .map_err(|e| ForecastError::io(format!("failed to parse snapshot: {}", e)))
    }
}
