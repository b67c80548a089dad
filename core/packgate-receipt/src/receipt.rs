use chrono::{DateTime, Utc};
use packgate_types::ProductId;
use serde::{Deserialize, Serialize};

/// Lifecycle state a receipt reports for its purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseState {
    /// Paid and current.
    Purchased,
    /// Money returned to the buyer.
    Refunded,
    /// Cancelled by the platform or the buyer.
    Cancelled,
}

impl PurchaseState {
    /// Returns true if the purchase should keep its pack unlocked.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Purchased)
    }
}

/// A raw receipt as handed over by the billing backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// Product the backend filed the receipt under.
    pub product_id: ProductId,
    /// Opaque receipt body, `base64url(payload).base64url(signature)` for
    /// signed receipts.
    pub data: String,
}

impl Receipt {
    #[must_use]
    pub fn new(product_id: impl Into<ProductId>, data: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            data: data.into(),
        }
    }
}

/// The signed receipt payload (matches the backend JSON structure).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptPayload {
    pub product_id: ProductId,
    pub transaction_id: String,
    pub state: PurchaseState,
    /// Purchase timestamp (seconds since epoch).
    pub iat: i64,
}

/// A receipt whose signature and payload have been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedReceipt {
    pub product_id: ProductId,
    pub transaction_id: String,
    pub state: PurchaseState,
    pub purchased_at: DateTime<Utc>,
}
