//! Error types for the remedi_core library.

use std::io;
use uuid::Uuid;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for remedi_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid schedule parameters on a medication
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation referenced a medication id absent from the registry
    #[error("Medication not found: {0}")]
    NotFound(Uuid),

    /// Store unreachable or unable to persist
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Reminder scheduler rejected or failed an operation
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
