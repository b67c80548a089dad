//! Purchase and restore orchestration over a billing backend.

use crate::billing::{BillingBackend, ProductDefinition, StoreProduct, Transaction};
use crate::error::{BillingError, PurchaseError};
use packgate_entitlement::EntitlementStore;
use packgate_receipt::{Receipt, ReceiptValidator};
use packgate_types::{Catalog, PackId, ProductId, ReceiptVerdict};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Price shown when the store has not reported one.
pub const PRICE_UNAVAILABLE: &str = "---";

/// Result of one purchase attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseOutcome {
    Success(PackId),
    Failed { pack_id: PackId, reason: PurchaseError },
}

impl PurchaseOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    #[must_use]
    pub fn pack_id(&self) -> &PackId {
        match self {
            Self::Success(pack_id) | Self::Failed { pack_id, .. } => pack_id,
        }
    }
}

/// Decision taken for one receipt during restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreEntry {
    pub product_id: ProductId,
    pub pack_id: PackId,
    pub verdict: ReceiptVerdict,
}

/// Everything a restore pass decided.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub entries: Vec<RestoreEntry>,
}

impl RestoreReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counts entries with the given verdict.
    #[must_use]
    pub fn count(&self, verdict: ReceiptVerdict) -> usize {
        self.entries.iter().filter(|e| e.verdict == verdict).count()
    }

    /// Returns the verdict reached for a pack, if it had a receipt.
    #[must_use]
    pub fn verdict_for(&self, pack_id: &str) -> Option<ReceiptVerdict> {
        self.entries
            .iter()
            .find(|e| e.pack_id.as_str() == pack_id)
            .map(|e| e.verdict)
    }
}

/// Wraps the billing backend and applies its results to the entitlement store.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct PurchaseService {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Arc<dyn BillingBackend>,
    validator: Arc<dyn ReceiptValidator>,
    store: Arc<EntitlementStore>,
    catalog: Arc<Catalog>,
    products: RwLock<HashMap<ProductId, StoreProduct>>,
    ready: watch::Sender<bool>,
    connecting: AtomicBool,
}

impl std::fmt::Debug for PurchaseService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PurchaseService")
            .field("platform", &self.inner.backend.platform())
            .field("validator", &self.inner.validator.name())
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

impl PurchaseService {
    /// Creates an unconnected service. Call [`Self::initialize`] to connect.
    pub fn new(
        backend: Arc<dyn BillingBackend>,
        validator: Arc<dyn ReceiptValidator>,
        store: Arc<EntitlementStore>,
        catalog: Arc<Catalog>,
    ) -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                backend,
                validator,
                store,
                catalog,
                products: RwLock::new(HashMap::new()),
                ready,
                connecting: AtomicBool::new(false),
            }),
        }
    }

    /// Starts connecting to the backend in the background.
    ///
    /// Returns immediately. Readiness is reported through
    /// [`Self::is_initialized`] and [`Self::ready`]. A failed connection is
    /// logged and may be retried by calling this again.
    pub fn initialize(&self) {
        if self.is_initialized() {
            debug!("purchase service already initialized");
            return;
        }
        if self.inner.connecting.swap(true, Ordering::AcqRel) {
            debug!("purchase service connection already in progress");
            return;
        }

        let inner = self.inner.clone();
        tokio::spawn(async move {
            inner.connect().await;
            inner.connecting.store(false, Ordering::Release);
        });
    }

    /// Returns true once the backend connection succeeded.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        *self.inner.ready.borrow()
    }

    /// Returns a receiver that flips to `true` when the service becomes ready.
    #[must_use]
    pub fn ready(&self) -> watch::Receiver<bool> {
        self.inner.ready.subscribe()
    }

    /// Waits up to `timeout` for readiness. Returns whether the service is ready.
    pub async fn wait_ready(&self, timeout: Duration) -> bool {
        let mut rx = self.ready();
        match tokio::time::timeout(timeout, rx.wait_for(|ready| *ready)).await {
            Ok(result) => result.is_ok(),
            Err(_) => false,
        }
    }

    /// Returns the entitlement store this service writes to.
    #[must_use]
    pub fn store(&self) -> &Arc<EntitlementStore> {
        &self.inner.store
    }

    /// Buys a pack and waits for the outcome.
    ///
    /// The backend call runs on its own task; if this future is dropped the
    /// purchase still completes and still updates the store.
    pub async fn purchase_product(&self, pack_id: &str) -> PurchaseOutcome {
        let pack = PackId::new(pack_id);

        let product_id = match self.inner.check_purchasable(&pack) {
            Ok(product_id) => product_id,
            Err(reason) => {
                error!(pack = %pack, "purchase rejected: {reason}");
                return PurchaseOutcome::Failed { pack_id: pack, reason };
            }
        };

        self.inner.store.mark_pending(pack.as_str());
        info!(pack = %pack, product = %product_id, "starting purchase");

        let inner = self.inner.clone();
        let task_pack = pack.clone();
        let handle = tokio::spawn(async move { inner.complete_purchase(task_pack, product_id).await });

        match handle.await {
            Ok(outcome) => outcome,
            Err(e) => PurchaseOutcome::Failed {
                pack_id: pack,
                reason: PurchaseError::Interrupted(e.to_string()),
            },
        }
    }

    /// Callback form of [`Self::purchase_product`]. Exactly one of the
    /// callbacks runs.
    pub fn purchase_product_with<S, F>(&self, pack_id: &str, on_success: S, on_failed: F) -> JoinHandle<()>
    where
        S: FnOnce(PackId) + Send + 'static,
        F: FnOnce(PackId, PurchaseError) + Send + 'static,
    {
        let service = self.clone();
        let pack_id = pack_id.to_string();
        tokio::spawn(async move {
            match service.purchase_product(&pack_id).await {
                PurchaseOutcome::Success(pack) => on_success(pack),
                PurchaseOutcome::Failed { pack_id, reason } => on_failed(pack_id, reason),
            }
        })
    }

    /// Re-derives entitlements from the backend's receipts.
    ///
    /// Safe to call repeatedly; each pass re-applies the same decisions. When
    /// the service is not initialized nothing changes and an empty report is
    /// returned.
    pub async fn restore_purchases(&self) -> RestoreReport {
        let inner = self.inner.clone();
        match tokio::spawn(async move { inner.restore().await }).await {
            Ok(report) => report,
            Err(e) => {
                error!("restore task failed: {e}");
                RestoreReport::default()
            }
        }
    }

    /// Callback form of [`Self::restore_purchases`]. `on_completed` runs
    /// exactly once, including when there was nothing to restore.
    pub fn restore_purchases_with<C>(&self, on_completed: C) -> JoinHandle<()>
    where
        C: FnOnce(RestoreReport) + Send + 'static,
    {
        let service = self.clone();
        tokio::spawn(async move {
            let report = service.restore_purchases().await;
            on_completed(report);
        })
    }

    /// Applies a transaction the backend delivered on its own (e.g. a
    /// purchase interrupted by a restart). Returns the granted pack.
    pub fn handle_transaction(&self, transaction: &Transaction) -> Option<PackId> {
        let Some(mapping) = self
            .inner
            .catalog
            .mapping_for_product(transaction.product_id.as_str())
        else {
            error!(product = %transaction.product_id, "transaction for unknown product");
            return None;
        };

        info!(
            pack = %mapping.pack_id,
            transaction = %transaction.transaction_id,
            "applying backend transaction"
        );
        self.inner.store.grant_pack(mapping.pack_id.as_str());
        Some(mapping.pack_id.clone())
    }

    /// Returns the localized price, or [`PRICE_UNAVAILABLE`].
    #[must_use]
    pub fn get_product_price(&self, pack_id: &str) -> String {
        if !self.is_initialized() {
            return PRICE_UNAVAILABLE.to_string();
        }
        self.inner
            .store_product_for_pack(pack_id)
            .map(|p| p.localized_price)
            .filter(|price| !price.is_empty())
            .unwrap_or_else(|| PRICE_UNAVAILABLE.to_string())
    }

    /// Returns true if the pack can be bought right now.
    #[must_use]
    pub fn is_product_available(&self, pack_id: &str) -> bool {
        if !self.is_initialized() {
            return false;
        }
        self.inner
            .store_product_for_pack(pack_id)
            .is_some_and(|p| p.available_to_purchase)
    }
}

impl Inner {
    fn is_initialized(&self) -> bool {
        *self.ready.borrow()
    }

    async fn connect(&self) {
        let definitions: Vec<ProductDefinition> = self
            .catalog
            .products()
            .iter()
            .map(|m| ProductDefinition {
                product_id: m.product_id.clone(),
                kind: m.kind,
            })
            .collect();

        info!(
            platform = self.backend.platform(),
            products = definitions.len(),
            "connecting to billing backend"
        );
        for definition in &definitions {
            debug!(product = %definition.product_id, "registering product");
        }

        match self.backend.connect(&definitions).await {
            Ok(products) => {
                self.cache_products(&products);
                let report = self.apply_receipts(&products).await;
                info!(receipts = report.entries.len(), "billing backend connected");
                self.ready.send_replace(true);
            }
            Err(e) => error!("billing backend failed to connect: {e}"),
        }
    }

    fn check_purchasable(&self, pack: &PackId) -> Result<ProductId, PurchaseError> {
        let Some(mapping) = self.catalog.product_for_pack(pack.as_str()) else {
            return Err(PurchaseError::UnknownProduct(pack.clone()));
        };
        if !self.is_initialized() {
            return Err(PurchaseError::NotInitialized);
        }
        let available = self
            .products_lock()
            .get(&mapping.product_id)
            .is_some_and(|p| p.available_to_purchase);
        if !available {
            return Err(PurchaseError::ProductUnavailable(pack.clone()));
        }
        Ok(mapping.product_id.clone())
    }

    async fn complete_purchase(&self, pack: PackId, product_id: ProductId) -> PurchaseOutcome {
        match self.backend.purchase(&product_id).await {
            Ok(transaction) => {
                if transaction.product_id != product_id {
                    warn!(
                        expected = %product_id,
                        got = %transaction.product_id,
                        "backend completed a different product"
                    );
                }
                info!(pack = %pack, transaction = %transaction.transaction_id, "purchase succeeded");
                self.store.grant_pack(pack.as_str());
                PurchaseOutcome::Success(pack)
            }
            Err(BillingError::DuplicateTransaction) => {
                info!(pack = %pack, "duplicate transaction, pack already purchased");
                self.store.grant_pack(pack.as_str());
                PurchaseOutcome::Success(pack)
            }
            Err(BillingError::Deferred) => {
                info!(pack = %pack, "purchase deferred, pack stays pending");
                PurchaseOutcome::Failed {
                    pack_id: pack,
                    reason: PurchaseError::Billing(BillingError::Deferred),
                }
            }
            Err(e) => {
                error!(pack = %pack, "purchase failed: {e}");
                self.store.clear_pending(pack.as_str());
                PurchaseOutcome::Failed {
                    pack_id: pack,
                    reason: PurchaseError::Billing(e),
                }
            }
        }
    }

    async fn restore(&self) -> RestoreReport {
        if !self.is_initialized() {
            error!("cannot restore purchases: purchase service not initialized");
            return RestoreReport::default();
        }

        info!("restoring purchases");
        let products = match self.backend.products().await {
            Ok(products) => {
                self.cache_products(&products);
                products
            }
            Err(e) => {
                warn!("could not refresh products, using cached metadata: {e}");
                self.products_lock().values().cloned().collect()
            }
        };

        let report = self.apply_receipts(&products).await;
        info!(
            granted = report.count(ReceiptVerdict::Granted),
            unverified = report.count(ReceiptVerdict::GrantedUnverified),
            revoked = report.count(ReceiptVerdict::Revoked),
            "restore complete"
        );
        report
    }

    async fn apply_receipts(&self, products: &[StoreProduct]) -> RestoreReport {
        let mut report = RestoreReport::default();

        for product in products.iter().filter(|p| p.has_receipt) {
            let Some(mapping) = self.catalog.mapping_for_product(product.product_id.as_str()) else {
                warn!(product = %product.product_id, "receipt for product missing from catalog");
                continue;
            };

            let verdict = match self.backend.receipt(&product.product_id).await {
                Ok(Some(receipt)) => self.judge(&mapping.pack_id, &receipt),
                Ok(None) => {
                    debug!(product = %product.product_id, "receipt flagged but not returned");
                    ReceiptVerdict::UnchangedNoReceipt
                }
                Err(e) => {
                    warn!(product = %product.product_id, "could not fetch receipt: {e}");
                    ReceiptVerdict::UnchangedNoReceipt
                }
            };

            report.entries.push(RestoreEntry {
                product_id: product.product_id.clone(),
                pack_id: mapping.pack_id.clone(),
                verdict,
            });
        }

        report
    }

    fn judge(&self, pack: &PackId, receipt: &Receipt) -> ReceiptVerdict {
        match self.validator.validate(receipt) {
            Ok(validated) if validated.state.is_active() => {
                debug!(pack = %pack, transaction = %validated.transaction_id, "receipt verified");
                self.store.grant_pack(pack.as_str());
                ReceiptVerdict::Granted
            }
            Ok(validated) => {
                info!(pack = %pack, state = ?validated.state, "purchase no longer active");
                self.store.revoke_pack(pack.as_str());
                ReceiptVerdict::Revoked
            }
            Err(e) if !e.is_rejection() => {
                warn!(
                    pack = %pack,
                    validator = self.validator.name(),
                    "granting without verification (degraded trust): {e}"
                );
                self.store.grant_pack(pack.as_str());
                ReceiptVerdict::GrantedUnverified
            }
            Err(e) => {
                warn!(pack = %pack, "receipt rejected: {e}");
                self.store.revoke_pack(pack.as_str());
                ReceiptVerdict::Revoked
            }
        }
    }

    fn products_lock(&self) -> std::sync::RwLockReadGuard<'_, HashMap<ProductId, StoreProduct>> {
        self.products.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn cache_products(&self, products: &[StoreProduct]) {
        let mut cache = self.products.write().unwrap_or_else(PoisonError::into_inner);
        cache.clear();
        for product in products {
            cache.insert(product.product_id.clone(), product.clone());
        }
    }

    fn store_product_for_pack(&self, pack_id: &str) -> Option<StoreProduct> {
        let mapping = self.catalog.product_for_pack(pack_id)?;
        self.products_lock().get(&mapping.product_id).cloned()
    }
}
