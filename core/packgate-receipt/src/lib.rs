//! Purchase receipt validation for packgate.
//!
//! Restore decisions are only as trustworthy as the receipts behind them. This
//! crate defines the validator seam and two implementations:
//! - [`CryptographicValidator`]: Ed25519 signature verification of
//!   backend-issued receipts
//! - [`NoOpValidator`]: for platforms without a validator; always reports
//!   [`ValidationError::Unavailable`] so callers can fall back to trust
//!
//! The implementation is chosen at runtime from [`ValidatorConfig`].
//!
//! # Receipt Format
//!
//! Signed receipts use the format: `base64url(payload).base64url(signature)`
//! The payload is a JSON object containing:
//! - `productId`: platform product id
//! - `transactionId`: platform transaction id
//! - `state`: `purchased` | `refunded` | `cancelled`
//! - `iat`: purchase timestamp (seconds since epoch)
//!
//! The signature covers the base64url-encoded payload string, not the decoded
//! JSON.

mod config;
mod error;
mod receipt;
mod validator;

pub use config::ValidatorConfig;
pub use error::{ValidationError, ValidationResult};
pub use receipt::{PurchaseState, Receipt, ReceiptPayload, ValidatedReceipt};
pub use validator::{CryptographicValidator, NoOpValidator, ReceiptValidator, MAX_CLOCK_SKEW_SECS};
