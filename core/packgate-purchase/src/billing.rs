//! Billing backend abstraction.
//!
//! Defines the surface of the platform store SDK that packgate consumes.

use crate::error::BillingError;
use async_trait::async_trait;
use packgate_receipt::Receipt;
use packgate_types::{ProductId, ProductKind};

/// A product registered with the backend at connect time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDefinition {
    pub product_id: ProductId,
    pub kind: ProductKind,
}

/// Store-side metadata for a registered product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreProduct {
    pub product_id: ProductId,
    /// Price formatted for the buyer's locale.
    pub localized_price: String,
    /// Whether the store will currently sell the product.
    pub available_to_purchase: bool,
    /// Whether the store holds a receipt for this product.
    pub has_receipt: bool,
}

/// A completed purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub product_id: ProductId,
    pub transaction_id: String,
    pub receipt: Option<Receipt>,
}

/// The platform billing SDK.
#[async_trait]
pub trait BillingBackend: Send + Sync {
    /// Returns the platform name, for logs.
    fn platform(&self) -> &'static str;

    /// Connects and registers products. Returns their store metadata.
    async fn connect(&self, products: &[ProductDefinition]) -> Result<Vec<StoreProduct>, BillingError>;

    /// Re-reads store metadata, including receipt presence.
    async fn products(&self) -> Result<Vec<StoreProduct>, BillingError>;

    /// Runs the platform purchase flow for one product.
    async fn purchase(&self, product_id: &ProductId) -> Result<Transaction, BillingError>;

    /// Fetches the stored receipt for a product, if any.
    async fn receipt(&self, product_id: &ProductId) -> Result<Option<Receipt>, BillingError>;
}
