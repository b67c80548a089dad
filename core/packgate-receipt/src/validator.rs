//! Receipt validators.

use crate::error::{ValidationError, ValidationResult};
use crate::receipt::{Receipt, ReceiptPayload, ValidatedReceipt};
use base64::{engine::general_purpose::STANDARD, engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};

/// How far in the future a receipt's purchase time may lie (1 day).
pub const MAX_CLOCK_SKEW_SECS: i64 = 24 * 60 * 60;

/// Checks receipts handed over by the billing backend.
pub trait ReceiptValidator: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Verifies a receipt.
    ///
    /// # Errors
    ///
    /// [`ValidationError::Unavailable`] when this validator cannot judge
    /// receipts at all; any other variant means the receipt was rejected.
    fn validate(&self, receipt: &Receipt) -> ValidationResult<ValidatedReceipt>;
}

/// Validator for platforms that offer no receipt verification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpValidator;

impl ReceiptValidator for NoOpValidator {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn validate(&self, _receipt: &Receipt) -> ValidationResult<ValidatedReceipt> {
        Err(ValidationError::Unavailable(
            "no receipt validator on this platform".to_string(),
        ))
    }
}

/// Ed25519 verification of `base64url(payload).base64url(signature)` receipts.
#[derive(Debug, Clone)]
pub struct CryptographicValidator {
    verifying_key: VerifyingKey,
}

impl CryptographicValidator {
    /// Builds a validator from a raw 32-byte public key.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Config`] if the bytes are not a valid key.
    pub fn from_bytes(public_key: &[u8; 32]) -> ValidationResult<Self> {
        let verifying_key = VerifyingKey::from_bytes(public_key)
            .map_err(|_| ValidationError::Config("invalid public key".to_string()))?;
        Ok(Self { verifying_key })
    }

    /// Builds a validator from a standard-base64 encoded public key.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Config`] if decoding fails or the key is
    /// not 32 bytes.
    pub fn from_base64(public_key: &str) -> ValidationResult<Self> {
        let bytes = STANDARD
            .decode(public_key.trim())
            .map_err(|e| ValidationError::Config(format!("invalid public key base64: {e}")))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| ValidationError::Config("public key must be 32 bytes".to_string()))?;
        Self::from_bytes(&bytes)
    }

    fn verify_at(&self, receipt: &Receipt, now: i64) -> ValidationResult<ValidatedReceipt> {
        let data = receipt.data.trim();

        let Some((payload_b64, signature_b64)) = data.split_once('.') else {
            return Err(ValidationError::InvalidFormat(
                "receipt must have exactly two parts separated by a dot".to_string(),
            ));
        };
        if signature_b64.contains('.') {
            return Err(ValidationError::InvalidFormat(
                "receipt must have exactly two parts separated by a dot".to_string(),
            ));
        }

        let sig_bytes = URL_SAFE_NO_PAD.decode(signature_b64).map_err(|e| {
            ValidationError::InvalidFormat(format!("invalid signature base64: {e}"))
        })?;
        let signature = Signature::from_slice(&sig_bytes).map_err(|_| {
            ValidationError::InvalidFormat("invalid signature length".to_string())
        })?;

        self.verifying_key
            .verify(payload_b64.as_bytes(), &signature)
            .map_err(|_| ValidationError::InvalidSignature)?;

        let payload_json = URL_SAFE_NO_PAD.decode(payload_b64).map_err(|e| {
            ValidationError::InvalidFormat(format!("invalid payload base64: {e}"))
        })?;
        let payload: ReceiptPayload = serde_json::from_slice(&payload_json).map_err(|e| {
            ValidationError::InvalidPayload(format!("invalid payload JSON: {e}"))
        })?;

        if payload.product_id != receipt.product_id {
            return Err(ValidationError::ProductMismatch {
                expected: receipt.product_id.to_string(),
                found: payload.product_id.to_string(),
            });
        }
        if payload.transaction_id.is_empty() {
            return Err(ValidationError::InvalidPayload("empty transaction id".to_string()));
        }
        if payload.iat > now + MAX_CLOCK_SKEW_SECS {
            return Err(ValidationError::InvalidPayload(format!(
                "purchase time {} is in the future",
                payload.iat
            )));
        }
        let purchased_at = DateTime::<Utc>::from_timestamp(payload.iat, 0).ok_or_else(|| {
            ValidationError::InvalidPayload(format!("purchase time {} out of range", payload.iat))
        })?;

        Ok(ValidatedReceipt {
            product_id: payload.product_id,
            transaction_id: payload.transaction_id,
            state: payload.state,
            purchased_at,
        })
    }
}

impl ReceiptValidator for CryptographicValidator {
    fn name(&self) -> &'static str {
        "ed25519"
    }

    fn validate(&self, receipt: &Receipt) -> ValidationResult<ValidatedReceipt> {
        self.verify_at(receipt, Utc::now().timestamp())
    }
}
