//! Error types for cadence
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in cadence
#[derive(Debug, Error)]
pub enum CadenceError {
    /// Collaborator (profile/state source) failure
    #[error("Source error: {0}")]
    Source(String),

    /// Persisted schedule state error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid configuration value
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for cadence operations
pub type Result<T> = std::result::Result<T, CadenceError>;
