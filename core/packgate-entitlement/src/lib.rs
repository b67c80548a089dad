//! Persisted pack entitlements and the content access gate.
//!
//! This crate owns the device-local record of which packs are owned and which
//! are awaiting confirmation, and answers "may this item be opened?".
//!
//! # Components
//!
//! - **KeyValueStore**: the durable storage the record is written to
//!   (in-memory and JSON-file implementations are provided)
//! - **EntitlementStore**: the record itself, with idempotent mutations and
//!   `Unlocked`/`Revoked` notifications
//! - **FeatureGate**: stateless item → pack → ownership lookups
//!
//! # Persistence Format
//!
//! Two keys are written on every mutation, together:
//! - `purchased_packs` → `{"ownedPacks": [...]}`
//! - `pending_packs` → `{"pendingPacks": [...]}`
//!
//! # Example
//!
//! ```
//! use packgate_entitlement::{EntitlementStore, MemoryKeyValueStore};
//! use packgate_types::PackId;
//! use std::sync::Arc;
//!
//! let store = EntitlementStore::open(Arc::new(MemoryKeyValueStore::new()), PackId::default_pack());
//! assert!(store.has_pack("pack_free"));
//!
//! store.grant_pack("pack_01");
//! assert!(store.has_pack("pack_01"));
//! ```

mod error;
mod events;
mod gate;
mod kv;
mod record;
mod store;

pub use error::{StoreError, StoreResult};
pub use events::EntitlementEvent;
pub use gate::{AccessEntry, FeatureGate};
pub use kv::{JsonFileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use record::{EntitlementRecord, OWNED_PACKS_KEY, PENDING_PACKS_KEY};
pub use store::EntitlementStore;
