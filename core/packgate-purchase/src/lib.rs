//! Billing backend integration, purchase and restore flows for packgate.
//!
//! The billing SDK is an external collaborator behind [`BillingBackend`].
//! [`PurchaseService`] drives it: it connects and registers the catalog's
//! products, runs purchases, and reconciles entitlements against receipts.
//!
//! # Guarantees
//!
//! - Nothing is returned as an error across the public API. Failures come back
//!   as [`PurchaseOutcome::Failed`] or through the `on_failed` callback.
//! - A duplicate-transaction response is a success.
//! - Purchases and restores run on spawned tasks. Dropping the caller's future
//!   (for instance on timeout) does not cancel them, so a late grant still
//!   lands in the entitlement store.
//!
//! # Restore Decisions
//!
//! | Receipt | Decision |
//! |---|---|
//! | valid, purchased | grant |
//! | valid, refunded / cancelled | revoke |
//! | invalid or tampered | revoke |
//! | validator unavailable | grant (degraded trust) |

mod billing;
mod error;
mod service;
pub mod simulated;

pub use billing::{BillingBackend, ProductDefinition, StoreProduct, Transaction};
pub use error::{BillingError, PurchaseError};
pub use service::{PurchaseOutcome, PurchaseService, RestoreEntry, RestoreReport, PRICE_UNAVAILABLE};
pub use simulated::{ConnectBehavior, ReceiptMinter, SimulatedBackend};
