//! The shared application context.
//!
//! Built once at the application root and handed around as `Arc<AppContext>`.
//! Components the orchestrator constructs are placed into write-once slots, so
//! a component registered up front is reused instead of rebuilt.

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::orchestrator::Collaborator;
use packgate_entitlement::{EntitlementStore, FeatureGate, KeyValueStore, MemoryKeyValueStore};
use packgate_purchase::{BillingBackend, PurchaseService};
use packgate_receipt::{NoOpValidator, ReceiptValidator};
use packgate_types::Catalog;
use std::sync::{Arc, OnceLock};

/// Registry of the packgate components for one running application.
pub struct AppContext {
    catalog: Arc<Catalog>,
    storage: Arc<dyn KeyValueStore>,
    backend: Arc<dyn BillingBackend>,
    validator: Arc<dyn ReceiptValidator>,
    collaborators: Vec<Arc<dyn Collaborator>>,
    store: OnceLock<Arc<EntitlementStore>>,
    purchase_service: OnceLock<PurchaseService>,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("platform", &self.backend.platform())
            .field("validator", &self.validator.name())
            .field("collaborators", &self.collaborators.len())
            .field("store", &self.store.get().is_some())
            .field("purchase_service", &self.purchase_service.get().is_some())
            .finish_non_exhaustive()
    }
}

impl AppContext {
    #[must_use]
    pub fn builder(catalog: Catalog) -> AppContextBuilder {
        AppContextBuilder::new(catalog)
    }

    #[must_use]
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    #[must_use]
    pub fn storage(&self) -> &Arc<dyn KeyValueStore> {
        &self.storage
    }

    #[must_use]
    pub fn backend(&self) -> &Arc<dyn BillingBackend> {
        &self.backend
    }

    #[must_use]
    pub fn validator(&self) -> &Arc<dyn ReceiptValidator> {
        &self.validator
    }

    #[must_use]
    pub fn collaborators(&self) -> &[Arc<dyn Collaborator>] {
        &self.collaborators
    }

    /// Returns the entitlement store once it has been loaded.
    #[must_use]
    pub fn store(&self) -> Option<Arc<EntitlementStore>> {
        self.store.get().cloned()
    }

    /// Returns the purchase service once it has been constructed.
    #[must_use]
    pub fn purchase_service(&self) -> Option<PurchaseService> {
        self.purchase_service.get().cloned()
    }

    /// Returns an access gate over whatever store is currently loaded.
    ///
    /// Before the store exists only the default pack's items are accessible.
    #[must_use]
    pub fn gate(&self) -> FeatureGate {
        FeatureGate::with_optional_store(self.catalog.clone(), self.store())
    }

    /// Stores `store` unless one is already registered. Returns the registered one.
    pub(crate) fn install_store(&self, store: Arc<EntitlementStore>) -> Arc<EntitlementStore> {
        self.store.get_or_init(|| store).clone()
    }

    /// Returns the registered purchase service, constructing it over `store`
    /// if none exists yet.
    pub(crate) fn purchase_service_or_init(&self, store: &Arc<EntitlementStore>) -> PurchaseService {
        self.purchase_service
            .get_or_init(|| {
                PurchaseService::new(
                    self.backend.clone(),
                    self.validator.clone(),
                    store.clone(),
                    self.catalog.clone(),
                )
            })
            .clone()
    }
}

/// Assembles an [`AppContext`].
pub struct AppContextBuilder {
    catalog: Catalog,
    storage: Option<Arc<dyn KeyValueStore>>,
    backend: Option<Arc<dyn BillingBackend>>,
    validator: Option<Arc<dyn ReceiptValidator>>,
    collaborators: Vec<Arc<dyn Collaborator>>,
    store: Option<Arc<EntitlementStore>>,
    purchase_service: Option<PurchaseService>,
}

impl AppContextBuilder {
    fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            storage: None,
            backend: None,
            validator: None,
            collaborators: Vec::new(),
            store: None,
            purchase_service: None,
        }
    }

    /// Sets durable storage. Defaults to in-memory storage.
    #[must_use]
    pub fn storage(mut self, storage: Arc<dyn KeyValueStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Sets the billing backend. Required.
    #[must_use]
    pub fn backend(mut self, backend: Arc<dyn BillingBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Sets the receipt validator. Defaults to [`NoOpValidator`].
    #[must_use]
    pub fn validator(mut self, validator: Arc<dyn ReceiptValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Adds a collaborator, initialized in registration order.
    #[must_use]
    pub fn collaborator(mut self, collaborator: Arc<dyn Collaborator>) -> Self {
        self.collaborators.push(collaborator);
        self
    }

    /// Registers an already-loaded store; the store stage will reuse it.
    #[must_use]
    pub fn store(mut self, store: Arc<EntitlementStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Registers an already-constructed purchase service; the purchase stage
    /// will reuse it.
    #[must_use]
    pub fn purchase_service(mut self, service: PurchaseService) -> Self {
        self.purchase_service = Some(service);
        self
    }

    /// Builds the context.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::MissingComponent`] without a backend, or a
    /// catalog error if the catalog is inconsistent.
    pub fn build(self) -> OrchestratorResult<Arc<AppContext>> {
        self.catalog.validate()?;
        let backend = self
            .backend
            .ok_or(OrchestratorError::MissingComponent("billing backend"))?;

        // A registered purchase service already owns a store.
        let store = self
            .store
            .or_else(|| self.purchase_service.as_ref().map(|s| s.store().clone()));

        Ok(Arc::new(AppContext {
            catalog: Arc::new(self.catalog),
            storage: self
                .storage
                .unwrap_or_else(|| Arc::new(MemoryKeyValueStore::new())),
            backend,
            validator: self.validator.unwrap_or_else(|| Arc::new(NoOpValidator)),
            collaborators: self.collaborators,
            store: store.map(OnceLock::from).unwrap_or_default(),
            purchase_service: self
                .purchase_service
                .map(OnceLock::from)
                .unwrap_or_default(),
        }))
    }
}
