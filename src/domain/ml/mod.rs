pub mod feature_registry;
pub mod types;

pub use feature_registry::{FEATURE_NAMES, FeatureSchema};
pub use types::{FeatureRecord, RawRecord};
