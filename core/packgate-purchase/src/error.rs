//! Error types for billing and purchases.

use packgate_types::PackId;
use thiserror::Error;

/// Failures reported by the billing backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BillingError {
    /// The backend could not be reached or refused the connection.
    #[error("billing unavailable: {0}")]
    Unavailable(String),

    /// In-app purchases are disabled on this device.
    #[error("purchasing is disabled on this device")]
    PurchasingDisabled,

    /// The product is unknown to the store or not for sale.
    #[error("product not purchasable: {0}")]
    ProductUnavailable(String),

    /// The product is already owned; the platform refused to charge again.
    #[error("duplicate transaction")]
    DuplicateTransaction,

    /// The buyer dismissed the purchase sheet.
    #[error("purchase cancelled by user")]
    UserCancelled,

    /// The payment was declined.
    #[error("payment declined")]
    PaymentDeclined,

    /// The purchase awaits approval (e.g. a parent) and may complete later.
    #[error("purchase deferred pending approval")]
    Deferred,

    /// Anything else the platform reports.
    #[error("{0}")]
    Other(String),
}

/// Why a purchase did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PurchaseError {
    /// The pack has no product in the catalog.
    #[error("unknown pack id: {0}")]
    UnknownProduct(PackId),

    /// The billing backend has not finished connecting.
    #[error("purchase service not initialized")]
    NotInitialized,

    /// The backend reports the product cannot be bought right now.
    #[error("product not available for purchase: {0}")]
    ProductUnavailable(PackId),

    /// The backend rejected the purchase.
    #[error("billing error: {0}")]
    Billing(#[from] BillingError),

    /// The purchase task stopped before reporting back.
    #[error("purchase interrupted: {0}")]
    Interrupted(String),
}

impl PurchaseError {
    /// Returns true if the purchase may still complete later without user action.
    #[must_use]
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Billing(BillingError::Deferred))
    }
}
