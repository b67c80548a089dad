//! Shared test helpers for orchestrator tests.

#![allow(dead_code)]

use async_trait::async_trait;
use packgate_entitlement::{KeyValueStore, MemoryKeyValueStore, StoreResult};
use packgate_orchestrator::{
    AppContext, Collaborator, OrchestratorConfig, OrchestratorError, OrchestratorResult,
};
use packgate_purchase::SimulatedBackend;
use packgate_types::Catalog;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Short budgets so timeout paths finish quickly.
pub fn fast_config() -> OrchestratorConfig {
    OrchestratorConfig {
        store_timeout_ms: 200,
        purchase_service_timeout_ms: 150,
        sync_timeout_ms: 150,
        auto_start: false,
    }
}

pub fn test_catalog() -> Catalog {
    Catalog::new("pack_free")
        .with_product("shop.pack01", "pack_01")
        .with_product("shop.pack02", "pack_02")
        .with_item("MakeBubbles", "pack_free", 1)
        .with_item("WhackAMole", "pack_01", 2)
        .with_item("Cook", "pack_02", 3)
}

pub fn test_backend() -> SimulatedBackend {
    SimulatedBackend::new()
        .with_product("shop.pack01", "$0.99")
        .with_product("shop.pack02", "$1.99")
}

pub fn context_with(backend: &SimulatedBackend, storage: Arc<dyn KeyValueStore>) -> Arc<AppContext> {
    AppContext::builder(test_catalog())
        .backend(Arc::new(backend.clone()))
        .storage(storage)
        .build()
        .unwrap()
}

pub fn context(backend: &SimulatedBackend) -> Arc<AppContext> {
    context_with(backend, Arc::new(MemoryKeyValueStore::new()))
}

/// What a collaborator saw when it was initialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub name: String,
    pub store_loaded: bool,
    pub purchases_ready: bool,
}

/// Collaborator that records the context state it was initialized against.
pub struct RecordingCollaborator {
    pub name: String,
    pub log: Arc<Mutex<Vec<Observation>>>,
    pub fail: bool,
}

impl RecordingCollaborator {
    pub fn new(name: &str, log: Arc<Mutex<Vec<Observation>>>) -> Arc<Self> {
        Arc::new(Self { name: name.to_string(), log, fail: false })
    }

    pub fn failing(name: &str, log: Arc<Mutex<Vec<Observation>>>) -> Arc<Self> {
        Arc::new(Self { name: name.to_string(), log, fail: true })
    }
}

#[async_trait]
impl Collaborator for RecordingCollaborator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self, context: &AppContext) -> OrchestratorResult<()> {
        self.log.lock().unwrap().push(Observation {
            name: self.name.clone(),
            store_loaded: context.store().is_some(),
            purchases_ready: context
                .purchase_service()
                .is_some_and(|service| service.is_initialized()),
        });
        if self.fail {
            return Err(OrchestratorError::Collaborator {
                name: self.name.clone(),
                reason: "scripted failure".to_string(),
            });
        }
        Ok(())
    }
}

/// Storage whose first read blocks the calling thread.
pub struct SlowStorage {
    inner: MemoryKeyValueStore,
    delay: Duration,
}

impl SlowStorage {
    pub fn new(delay: Duration) -> Self {
        Self { inner: MemoryKeyValueStore::new(), delay }
    }
}

impl KeyValueStore for SlowStorage {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        std::thread::sleep(self.delay);
        self.inner.get(key)
    }

    fn set_many(&self, entries: &[(&str, String)]) -> StoreResult<()> {
        self.inner.set_many(entries)
    }
}
