//! Startup sequencing.

use crate::config::OrchestratorConfig;
use crate::context::AppContext;
use crate::error::OrchestratorResult;
use async_trait::async_trait;
use packgate_entitlement::EntitlementStore;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Where startup currently is. Stages only ever advance in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InitStage {
    NotStarted,
    InitializingStore,
    InitializingPurchaseService,
    InitializingCollaborators,
    SyncingPurchases,
    Ready,
}

impl InitStage {
    #[must_use]
    pub fn is_ready(self) -> bool {
        self == Self::Ready
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InitializingStore => "initializing_store",
            Self::InitializingPurchaseService => "initializing_purchase_service",
            Self::InitializingCollaborators => "initializing_collaborators",
            Self::SyncingPurchases => "syncing_purchases",
            Self::Ready => "ready",
        }
    }
}

impl fmt::Display for InitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A host component constructed during the collaborator stage, after the
/// store and purchase service exist (menus, shop screens and the like).
#[async_trait]
pub trait Collaborator: Send + Sync {
    /// Returns the collaborator name, for logs.
    fn name(&self) -> &str;

    /// Sets the collaborator up. Errors are logged and do not stop startup.
    async fn initialize(&self, context: &AppContext) -> OrchestratorResult<()>;
}

/// Outcome of the store stage.
enum StoreLoad {
    Loaded(Arc<EntitlementStore>),
    /// Still loading after the budget ran out.
    Late(JoinHandle<Arc<EntitlementStore>>),
    Failed,
}

/// Clears the in-flight flag when a run ends, including when its future is dropped.
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        if flag.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(Self(flag))
        }
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Brings packgate up in a fixed order and always reaches [`InitStage::Ready`].
///
/// Every waiting stage has a budget. When a budget runs out the stage logs a
/// warning and startup moves on; the abandoned work keeps running and fills
/// its context slot if it finishes later.
pub struct InitOrchestrator {
    context: Arc<AppContext>,
    config: OrchestratorConfig,
    stage: watch::Sender<InitStage>,
    running: AtomicBool,
    initialized: AtomicBool,
}

impl fmt::Debug for InitOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitOrchestrator")
            .field("stage", &self.stage())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl InitOrchestrator {
    #[must_use]
    pub fn new(context: Arc<AppContext>, config: OrchestratorConfig) -> Self {
        let (stage, _) = watch::channel(InitStage::NotStarted);
        Self {
            context,
            config,
            stage,
            running: AtomicBool::new(false),
            initialized: AtomicBool::new(false),
        }
    }

    /// Creates an orchestrator and, if `auto_start` is set, starts it on a
    /// spawned task. Must be called from within a tokio runtime.
    #[must_use]
    pub fn launch(context: Arc<AppContext>, config: OrchestratorConfig) -> Arc<Self> {
        let orchestrator = Arc::new(Self::new(context, config));
        if orchestrator.config.auto_start {
            let task = orchestrator.clone();
            tokio::spawn(async move { task.start().await });
        }
        orchestrator
    }

    #[must_use]
    pub fn context(&self) -> &Arc<AppContext> {
        &self.context
    }

    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    #[must_use]
    pub fn stage(&self) -> InitStage {
        *self.stage.borrow()
    }

    /// Returns a receiver that observes stage changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<InitStage> {
        self.stage.subscribe()
    }

    /// Returns true once startup has reached `Ready` at least once. Stays
    /// true while a foreground re-sync runs.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Waits up to `timeout` for startup to finish.
    pub async fn wait_until_ready(&self, timeout: Duration) -> bool {
        if self.is_initialized() {
            return true;
        }
        let mut rx = self.subscribe();
        match tokio::time::timeout(timeout, rx.wait_for(|stage| stage.is_ready())).await {
            Ok(result) => result.is_ok(),
            Err(_) => false,
        }
    }

    /// Runs the startup pipeline to completion.
    ///
    /// Does nothing if startup already finished or is running elsewhere.
    pub async fn start(&self) {
        if self.is_initialized() {
            debug!("packgate already initialized");
            return;
        }
        let Some(_run) = RunGuard::acquire(&self.running) else {
            debug!("packgate initialization already in progress");
            return;
        };

        let started = Instant::now();
        info!(platform = self.context.backend().platform(), "initializing packgate");

        self.set_stage(InitStage::InitializingStore);
        let store = self.init_store().await;

        self.set_stage(InitStage::InitializingPurchaseService);
        self.init_purchase_service(store).await;

        self.set_stage(InitStage::InitializingCollaborators);
        self.init_collaborators().await;

        self.set_stage(InitStage::SyncingPurchases);
        self.sync_purchases().await;

        self.initialized.store(true, Ordering::Release);
        self.set_stage(InitStage::Ready);
        info!(elapsed = ?started.elapsed(), "packgate initialized");
        self.log_access();
    }

    /// Re-checks receipts after the app returns to the foreground.
    ///
    /// Only runs once startup has finished; re-enters `SyncingPurchases` and
    /// returns to `Ready`.
    pub async fn on_foreground(&self) {
        if !self.is_initialized() {
            debug!("foreground before initialization finished, skipping sync");
            return;
        }
        let Some(_run) = RunGuard::acquire(&self.running) else {
            debug!("sync already in progress");
            return;
        };

        self.set_stage(InitStage::SyncingPurchases);
        self.sync_purchases().await;
        self.set_stage(InitStage::Ready);
    }

    fn set_stage(&self, stage: InitStage) {
        debug!(stage = %stage, "init stage");
        self.stage.send_replace(stage);
    }

    async fn init_store(&self) -> StoreLoad {
        if let Some(store) = self.context.store() {
            debug!("reusing registered entitlement store");
            return StoreLoad::Loaded(store);
        }

        let context = self.context.clone();
        let mut load = tokio::task::spawn_blocking(move || {
            let store = EntitlementStore::open(
                context.storage().clone(),
                context.catalog().default_pack().clone(),
            );
            context.install_store(Arc::new(store))
        });

        match tokio::time::timeout(self.config.store_timeout(), &mut load).await {
            Ok(Ok(store)) => StoreLoad::Loaded(store),
            Ok(Err(e)) => {
                error!("entitlement store failed to load: {e}");
                StoreLoad::Failed
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.config.store_timeout_ms,
                    "entitlement store not ready in time, continuing without it"
                );
                StoreLoad::Late(load)
            }
        }
    }

    async fn init_purchase_service(&self, store: StoreLoad) {
        let store = match store {
            StoreLoad::Loaded(store) => store,
            StoreLoad::Late(load) => {
                warn!("purchase service deferred until the entitlement store loads");
                let context = self.context.clone();
                tokio::spawn(async move {
                    match load.await {
                        Ok(store) => {
                            info!("entitlement store loaded late, starting purchase service");
                            context.purchase_service_or_init(&store).initialize();
                        }
                        Err(e) => error!("entitlement store failed to load: {e}"),
                    }
                });
                return;
            }
            StoreLoad::Failed => {
                warn!("skipping purchase service: entitlement store unavailable");
                return;
            }
        };

        let service = self.context.purchase_service_or_init(&store);
        service.initialize();
        if !service.wait_ready(self.config.purchase_service_timeout()).await {
            warn!(
                timeout_ms = self.config.purchase_service_timeout_ms,
                "billing backend not ready in time, continuing without purchases"
            );
        }
    }

    async fn init_collaborators(&self) {
        for collaborator in self.context.collaborators() {
            debug!(collaborator = collaborator.name(), "initializing collaborator");
            if let Err(e) = collaborator.initialize(&self.context).await {
                error!(collaborator = collaborator.name(), "collaborator failed to initialize: {e}");
            }
        }
    }

    async fn sync_purchases(&self) {
        let service = match self.context.purchase_service() {
            Some(service) => service,
            None => {
                let Some(store) = self.context.store() else {
                    debug!("no purchase service, skipping purchase sync");
                    return;
                };
                debug!("entitlement store loaded late, starting purchase service");
                let service = self.context.purchase_service_or_init(&store);
                service.initialize();
                service.wait_ready(self.config.purchase_service_timeout()).await;
                service
            }
        };
        if !service.is_initialized() {
            debug!("billing backend not connected, skipping purchase sync");
            return;
        }

        match tokio::time::timeout(self.config.sync_timeout(), service.restore_purchases()).await {
            Ok(report) => info!(receipts = report.entries.len(), "purchases synced"),
            Err(_) => warn!(
                timeout_ms = self.config.sync_timeout_ms,
                "purchase sync not finished in time, continuing"
            ),
        }
    }

    fn log_access(&self) {
        for entry in self.context.gate().access_report() {
            debug!(
                item = %entry.item_id,
                pack = %entry.pack_id,
                order = entry.display_order,
                accessible = entry.accessible,
                "item access"
            );
        }
    }
}
