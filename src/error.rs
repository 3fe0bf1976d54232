//! Error types for the tensile analysis engine.
//!
//! Only configuration and ingestion can fail. Batch analysis always returns a
//! value and reports problems through `MechanicalProperties::validity_notes`.

use thiserror::Error;

/// Main error type for the engine
#[derive(Error, Debug)]
pub enum TensileError {
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("Sample at t={time}s is not after the previous sample at t={last}s")]
    OutOfOrder { time: f64, last: f64 },

    #[error("Test already stopped")]
    TestStopped,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type for engine operations
pub type TensileResult<T> = Result<T, TensileError>;
