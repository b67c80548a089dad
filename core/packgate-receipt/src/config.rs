use crate::error::ValidationResult;
use crate::validator::{CryptographicValidator, NoOpValidator, ReceiptValidator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Which receipt validator to run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ValidatorConfig {
    /// No verification; restores grant on trust.
    #[default]
    None,
    /// Ed25519 verification with the given standard-base64 public key.
    #[serde(rename_all = "camelCase")]
    Ed25519 { public_key: String },
}

impl ValidatorConfig {
    /// Instantiates the configured validator.
    ///
    /// # Errors
    ///
    /// Returns an error if the Ed25519 public key is malformed.
    pub fn build(&self) -> ValidationResult<Arc<dyn ReceiptValidator>> {
        match self {
            Self::None => {
                warn!("receipt validation disabled, restores will grant on trust");
                Ok(Arc::new(NoOpValidator))
            }
            Self::Ed25519 { public_key } => Ok(Arc::new(CryptographicValidator::from_base64(public_key)?)),
        }
    }
}
