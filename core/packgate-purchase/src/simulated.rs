//! An in-process billing backend.
//!
//! Used by tests and by the maintenance CLI on machines without a platform
//! store. Behaviour is scripted: connect outcome, per-product availability,
//! queued purchase failures, receipts and artificial latency.

use crate::billing::{BillingBackend, ProductDefinition, StoreProduct, Transaction};
use crate::error::BillingError;
use async_trait::async_trait;
use packgate_receipt::{PurchaseState, Receipt};
use packgate_types::ProductId;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use uuid::Uuid;

/// Produces receipt bodies for simulated purchases.
pub type ReceiptMinter = Arc<dyn Fn(&ProductId, &str, PurchaseState) -> String + Send + Sync>;

/// How [`SimulatedBackend::connect`] behaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectBehavior {
    /// Connects immediately.
    Succeed,
    /// Connects after a delay.
    Delay(Duration),
    /// Fails with [`BillingError::Unavailable`].
    Fail(String),
    /// Never completes.
    Hang,
}

#[derive(Debug, Clone)]
struct SimProduct {
    price: String,
    available: bool,
    has_receipt: bool,
    receipt: Option<Receipt>,
}

struct SimState {
    connect: ConnectBehavior,
    registered: bool,
    products: BTreeMap<ProductId, SimProduct>,
    scripted_failures: HashMap<ProductId, VecDeque<BillingError>>,
    purchase_delay: Duration,
    query_delay: Duration,
    minter: ReceiptMinter,
    connect_calls: usize,
    purchase_calls: Vec<ProductId>,
}

/// Scriptable in-memory [`BillingBackend`]. Clones share state.
#[derive(Clone)]
pub struct SimulatedBackend {
    state: Arc<Mutex<SimState>>,
}

impl fmt::Debug for SimulatedBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("SimulatedBackend")
            .field("connect", &state.connect)
            .field("products", &state.products.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn unsigned_receipt(product_id: &ProductId, transaction_id: &str, state: PurchaseState) -> String {
    format!("unsigned:{product_id}:{transaction_id}:{state:?}")
}

impl SimulatedBackend {
    /// Creates a backend with no products that connects immediately.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                connect: ConnectBehavior::Succeed,
                registered: false,
                products: BTreeMap::new(),
                scripted_failures: HashMap::new(),
                purchase_delay: Duration::ZERO,
                query_delay: Duration::ZERO,
                minter: Arc::new(unsigned_receipt),
                connect_calls: 0,
                purchase_calls: Vec::new(),
            })),
        }
    }

    /// Lists a product for sale.
    #[must_use]
    pub fn with_product(self, product_id: impl Into<ProductId>, price: impl Into<String>) -> Self {
        self.lock().products.insert(
            product_id.into(),
            SimProduct {
                price: price.into(),
                available: true,
                has_receipt: false,
                receipt: None,
            },
        );
        self
    }

    pub fn set_connect_behavior(&self, behavior: ConnectBehavior) {
        self.lock().connect = behavior;
    }

    /// Sets how receipt bodies are produced for purchases.
    pub fn set_receipt_minter(&self, minter: ReceiptMinter) {
        self.lock().minter = minter;
    }

    pub fn set_available(&self, product_id: &str, available: bool) {
        if let Some(product) = self.lock().products.get_mut(product_id) {
            product.available = available;
        }
    }

    /// Stores a receipt for a product, as if bought earlier or elsewhere.
    pub fn set_receipt(&self, product_id: &str, data: impl Into<String>) {
        if let Some(product) = self.lock().products.get_mut(product_id) {
            product.has_receipt = true;
            product.receipt = Some(Receipt::new(product_id, data));
        }
    }

    /// Flags a receipt as present but makes fetching it return nothing.
    pub fn set_receipt_missing(&self, product_id: &str) {
        if let Some(product) = self.lock().products.get_mut(product_id) {
            product.has_receipt = true;
            product.receipt = None;
        }
    }

    /// Removes any receipt for a product.
    pub fn clear_receipt(&self, product_id: &str) {
        if let Some(product) = self.lock().products.get_mut(product_id) {
            product.has_receipt = false;
            product.receipt = None;
        }
    }

    /// Makes the next purchase of `product_id` fail with `error`.
    pub fn fail_next_purchase(&self, product_id: &str, error: BillingError) {
        self.lock()
            .scripted_failures
            .entry(ProductId::new(product_id))
            .or_default()
            .push_back(error);
    }

    pub fn set_purchase_delay(&self, delay: Duration) {
        self.lock().purchase_delay = delay;
    }

    /// Delays `products()` and `receipt()` calls.
    pub fn set_query_delay(&self, delay: Duration) {
        self.lock().query_delay = delay;
    }

    /// Returns every receipt the backend currently holds.
    #[must_use]
    pub fn receipts(&self) -> Vec<Receipt> {
        self.lock()
            .products
            .values()
            .filter_map(|p| p.receipt.clone())
            .collect()
    }

    #[must_use]
    pub fn connect_calls(&self) -> usize {
        self.lock().connect_calls
    }

    /// Returns every product a purchase was attempted for, in order.
    #[must_use]
    pub fn purchase_calls(&self) -> Vec<ProductId> {
        self.lock().purchase_calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> Vec<StoreProduct> {
        self.lock()
            .products
            .iter()
            .map(|(id, p)| StoreProduct {
                product_id: id.clone(),
                localized_price: p.price.clone(),
                available_to_purchase: p.available,
                has_receipt: p.has_receipt,
            })
            .collect()
    }
}

#[async_trait]
impl BillingBackend for SimulatedBackend {
    fn platform(&self) -> &'static str {
        "simulated"
    }

    async fn connect(&self, products: &[ProductDefinition]) -> Result<Vec<StoreProduct>, BillingError> {
        let behavior = {
            let mut state = self.lock();
            state.connect_calls += 1;
            state.connect.clone()
        };

        match behavior {
            ConnectBehavior::Succeed => {}
            ConnectBehavior::Delay(delay) => tokio::time::sleep(delay).await,
            ConnectBehavior::Fail(reason) => return Err(BillingError::Unavailable(reason)),
            ConnectBehavior::Hang => std::future::pending::<()>().await,
        }

        {
            let mut state = self.lock();
            state.registered = true;
            for definition in products {
                state
                    .products
                    .entry(definition.product_id.clone())
                    .or_insert_with(|| SimProduct {
                        price: String::new(),
                        available: false,
                        has_receipt: false,
                        receipt: None,
                    });
            }
        }
        Ok(self.snapshot())
    }

    async fn products(&self) -> Result<Vec<StoreProduct>, BillingError> {
        let (registered, delay) = {
            let state = self.lock();
            (state.registered, state.query_delay)
        };
        if !registered {
            return Err(BillingError::Unavailable("not connected".to_string()));
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(self.snapshot())
    }

    async fn purchase(&self, product_id: &ProductId) -> Result<Transaction, BillingError> {
        let (scripted, delay) = {
            let mut state = self.lock();
            state.purchase_calls.push(product_id.clone());
            let scripted = state
                .scripted_failures
                .get_mut(product_id)
                .and_then(VecDeque::pop_front);
            (scripted, state.purchase_delay)
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = scripted {
            return Err(error);
        }

        let minter = {
            let state = self.lock();
            match state.products.get(product_id) {
                Some(product) if !product.available => {
                    return Err(BillingError::ProductUnavailable(product_id.to_string()));
                }
                Some(product) if product.has_receipt => return Err(BillingError::DuplicateTransaction),
                Some(_) => state.minter.clone(),
                None => return Err(BillingError::ProductUnavailable(product_id.to_string())),
            }
        };

        // The minter is caller code and may call back into the backend.
        let transaction_id = Uuid::now_v7().to_string();
        let receipt = Receipt::new(
            product_id.clone(),
            minter(product_id, &transaction_id, PurchaseState::Purchased),
        );

        let mut state = self.lock();
        let Some(product) = state.products.get_mut(product_id) else {
            return Err(BillingError::ProductUnavailable(product_id.to_string()));
        };
        if product.has_receipt {
            return Err(BillingError::DuplicateTransaction);
        }
        product.has_receipt = true;
        product.receipt = Some(receipt.clone());

        Ok(Transaction {
            product_id: product_id.clone(),
            transaction_id,
            receipt: Some(receipt),
        })
    }

    async fn receipt(&self, product_id: &ProductId) -> Result<Option<Receipt>, BillingError> {
        let delay = self.lock().query_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .lock()
            .products
            .get(product_id)
            .and_then(|p| p.receipt.clone()))
    }
}
