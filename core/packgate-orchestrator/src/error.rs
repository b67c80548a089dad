//! Error types for startup and configuration.

use thiserror::Error;

/// Errors raised while assembling the application.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// A required component was not provided.
    #[error("missing component: {0}")]
    MissingComponent(&'static str),

    /// The catalog failed validation.
    #[error("catalog error: {0}")]
    Catalog(#[from] packgate_types::Error),

    /// The receipt validator could not be built.
    #[error("validator error: {0}")]
    Validator(#[from] packgate_receipt::ValidationError),

    /// A collaborator failed to initialize.
    #[error("collaborator {name} failed: {reason}")]
    Collaborator { name: String, reason: String },

    /// Configuration file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration JSON was malformed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for orchestrator operations.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
