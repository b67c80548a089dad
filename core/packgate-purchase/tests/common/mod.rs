//! Shared test helpers for purchase tests.

#![allow(dead_code)]

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use ed25519_dalek::{Signer, SigningKey};
use packgate_entitlement::{EntitlementEvent, EntitlementStore, MemoryKeyValueStore};
use packgate_purchase::{PurchaseService, SimulatedBackend};
use packgate_receipt::{CryptographicValidator, NoOpValidator, PurchaseState, ReceiptValidator};
use packgate_types::{Catalog, PackId, ProductId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

pub const READY_TIMEOUT: Duration = Duration::from_secs(2);

/// Deterministic receipt-signing key.
pub fn signing_key() -> SigningKey {
    SigningKey::from_bytes(&[42u8; 32])
}

/// A key the validator does not trust.
pub fn forger_key() -> SigningKey {
    SigningKey::from_bytes(&[9u8; 32])
}

pub fn crypto_validator() -> Arc<dyn ReceiptValidator> {
    let public = signing_key().verifying_key().to_bytes();
    Arc::new(CryptographicValidator::from_bytes(&public).unwrap())
}

pub fn noop_validator() -> Arc<dyn ReceiptValidator> {
    Arc::new(NoOpValidator)
}

fn state_name(state: PurchaseState) -> &'static str {
    match state {
        PurchaseState::Purchased => "purchased",
        PurchaseState::Refunded => "refunded",
        PurchaseState::Cancelled => "cancelled",
    }
}

/// Signs `base64url(payload).base64url(signature)` with `key`.
pub fn signed_receipt_with(key: &SigningKey, product_id: &str, txn: &str, state: PurchaseState) -> String {
    let iat = chrono::Utc::now().timestamp() - 60;
    let payload = format!(
        r#"{{"productId":"{product_id}","transactionId":"{txn}","state":"{}","iat":{iat}}}"#,
        state_name(state)
    );
    let payload_b64 = URL_SAFE_NO_PAD.encode(payload.as_bytes());
    let signature = key.sign(payload_b64.as_bytes());
    format!("{payload_b64}.{}", URL_SAFE_NO_PAD.encode(signature.to_bytes()))
}

pub fn signed_receipt(product_id: &str, state: PurchaseState) -> String {
    signed_receipt_with(&signing_key(), product_id, "txn-restore", state)
}

/// Free pack plus two paid packs.
pub fn test_catalog() -> Catalog {
    Catalog::new("pack_free")
        .with_product("shop.pack01", "pack_01")
        .with_product("shop.pack02", "pack_02")
        .with_item("MakeBubbles", "pack_free", 1)
        .with_item("WhackAMole", "pack_01", 2)
        .with_item("Cook", "pack_02", 3)
}

/// A backend selling both paid packs, minting signed receipts.
pub fn test_backend() -> SimulatedBackend {
    let backend = SimulatedBackend::new()
        .with_product("shop.pack01", "$0.99")
        .with_product("shop.pack02", "$1.99");
    backend.set_receipt_minter(Arc::new(|product: &ProductId, txn: &str, state: PurchaseState| {
        signed_receipt_with(&signing_key(), product.as_str(), txn, state)
    }));
    backend
}

pub struct Harness {
    pub service: PurchaseService,
    pub backend: SimulatedBackend,
    pub store: Arc<EntitlementStore>,
    pub kv: MemoryKeyValueStore,
}

impl Harness {
    pub fn new(backend: SimulatedBackend, validator: Arc<dyn ReceiptValidator>) -> Self {
        let kv = MemoryKeyValueStore::new();
        Self::with_storage(backend, validator, kv)
    }

    pub fn with_storage(
        backend: SimulatedBackend,
        validator: Arc<dyn ReceiptValidator>,
        kv: MemoryKeyValueStore,
    ) -> Self {
        let store = Arc::new(EntitlementStore::open(Arc::new(kv.clone()), PackId::default_pack()));
        let service = PurchaseService::new(
            Arc::new(backend.clone()),
            validator,
            store.clone(),
            Arc::new(test_catalog()),
        );
        Self { service, backend, store, kv }
    }

    /// Builds the harness and waits for the backend connection.
    pub async fn connected(backend: SimulatedBackend, validator: Arc<dyn ReceiptValidator>) -> Self {
        let harness = Self::new(backend, validator);
        harness.service.initialize();
        assert!(harness.service.wait_ready(READY_TIMEOUT).await, "backend never connected");
        harness
    }

    /// Reopens the store over the same storage, as after a restart.
    pub fn reopened_store(&self) -> EntitlementStore {
        EntitlementStore::open(Arc::new(self.kv.clone()), PackId::default_pack())
    }
}

pub fn drain(rx: &mut broadcast::Receiver<EntitlementEvent>) -> Vec<EntitlementEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
