//! Shared test helpers for entitlement tests.

#![allow(dead_code)]

use packgate_entitlement::{EntitlementEvent, EntitlementStore, MemoryKeyValueStore};
use packgate_types::{Catalog, PackId};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Opens a store over fresh in-memory storage, returning the storage too so
/// tests can reopen it to simulate a restart.
pub fn fresh_store() -> (EntitlementStore, MemoryKeyValueStore) {
    let kv = MemoryKeyValueStore::new();
    let store = EntitlementStore::open(Arc::new(kv.clone()), PackId::default_pack());
    (store, kv)
}

/// Reopens a store over existing storage.
pub fn reopen(kv: &MemoryKeyValueStore) -> EntitlementStore {
    EntitlementStore::open(Arc::new(kv.clone()), PackId::default_pack())
}

/// Drains every event currently buffered in the receiver.
pub fn drain(rx: &mut broadcast::Receiver<EntitlementEvent>) -> Vec<EntitlementEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// The catalog used across gate tests.
pub fn test_catalog() -> Catalog {
    Catalog::new("pack_free")
        .with_product("shop.pack01", "pack_01")
        .with_product("shop.pack02", "pack_02")
        .with_item("MakeBubbles", "pack_free", 1)
        .with_item("WhackAMole", "pack_01", 2)
        .with_item("FlowerBlooming", "pack_01", 3)
        .with_item("Cook", "pack_02", 4)
}
