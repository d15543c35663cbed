//! Repository abstraction for trained model snapshots.
//!
//! The store persists the whole estimator pair plus its metadata as one unit.
//! A save either replaces the previous snapshot completely or leaves it untouched.
//!
//! # Current Implementations
//!
//! - `JsonFileModelStore`: JSON file replaced through a temp file + rename
//! - `InMemoryModelStore`: serialized snapshot kept in memory
//!
//! # Example
//!
//! ```rust,no_run
//! use wattcast::domain::repositories::ModelStore;
//! use wattcast::infrastructure::persistence::JsonFileModelStore;
//!
//! let store = JsonFileModelStore::new("data/models/energy_models.json");
//! match store.load() {
//!     Ok(snapshot) => println!("trained at {}", snapshot.trained_at),
//!     Err(e) => println!("running untrained: {}", e),
//! }
//! ```

use crate::application::ml::snapshot::ModelSnapshot;
use crate::domain::errors::ForecastError;

pub trait ModelStore: Send + Sync {
    /// Persists the full snapshot. Fails with `ForecastError::Io`.
    fn save(&self, snapshot: &ModelSnapshot) -> Result<(), ForecastError>;

    /// Restores the last saved snapshot. Fails with `ForecastError::NotFound` when
    /// nothing has been saved yet.
    fn load(&self) -> Result<ModelSnapshot, ForecastError>;
}
