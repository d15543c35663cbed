pub mod feature_synthesizer;
pub mod gradient_boosting;
pub mod neural_regressor;
pub mod scaler;
pub mod snapshot;
pub mod synthetic;
pub mod trainer;

pub use gradient_boosting::{BoostingParams, GradientBoostedTrees};
pub use neural_regressor::{NeuralParams, NeuralRegressor};
pub use scaler::StandardScaler;
pub use snapshot::ModelSnapshot;
pub use trainer::{ModelTrainer, TrainingOutcome, TrainingParams, TrainingReport};
