// Forecast outputs, horizons and anomaly reports
pub mod forecasting;

// Feature records and schema
pub mod ml;

// Port interfaces
pub mod ports;

// Repository traits
pub mod repositories;

// Domain-specific error types
pub mod errors;
