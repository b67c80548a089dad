//! Error types for receipt validation.

use thiserror::Error;

/// Receipt validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// No validator exists for this platform.
    #[error("receipt validation unavailable: {0}")]
    Unavailable(String),

    /// Receipt is not `payload.signature`, or a part is not valid base64url.
    #[error("invalid receipt format: {0}")]
    InvalidFormat(String),

    /// Ed25519 signature verification failed.
    #[error("receipt signature invalid")]
    InvalidSignature,

    /// Payload JSON is malformed or its values are implausible.
    #[error("invalid receipt payload: {0}")]
    InvalidPayload(String),

    /// Receipt is signed for a different product than the one it was filed under.
    #[error("receipt is for product {found}, expected {expected}")]
    ProductMismatch { expected: String, found: String },

    /// Validator configuration is unusable.
    #[error("invalid validator config: {0}")]
    Config(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ValidationError {
    /// Returns true if the receipt itself was rejected (as opposed to the
    /// validator being absent).
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        !matches!(self, Self::Unavailable(_) | Self::Config(_))
    }
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;
