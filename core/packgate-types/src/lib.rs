//! Core type definitions for packgate.
//!
//! This crate defines the plain, dependency-free types shared by every other
//! packgate crate:
//! - Pack, product and item identifiers
//! - The read-only catalog mapping products and content items to packs
//! - Per-product receipt verdicts produced during restore
//!
//! Nothing in here performs I/O or holds mutable state.

mod catalog;
mod ids;
mod verdict;

pub use catalog::{Catalog, CatalogItem, ProductKind, ProductMapping};
pub use ids::{ItemId, PackId, ProductId, DEFAULT_PACK};
pub use verdict::ReceiptVerdict;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),
}
