pub mod anomaly;
pub mod forecast;
pub mod horizon;

pub use anomaly::{AnomalyReport, Severity};
pub use forecast::{EnsembleForecast, HorizonForecast};
pub use horizon::{Horizon, HorizonUnit};
