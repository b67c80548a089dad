//! Session plumbing for the packgate maintenance tool.
//!
//! A [`Session`] assembles the full packgate stack over a data directory: a
//! JSON-file entitlement store and a simulated billing backend whose receipts
//! are kept next to it. Every session runs the normal startup pipeline before
//! a command executes, so the tool sees exactly what an app launch would.

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use packgate_entitlement::{EntitlementStore, JsonFileKeyValueStore};
use packgate_orchestrator::{AppContext, InitOrchestrator, PackgateConfig};
use packgate_purchase::{PurchaseOutcome, PurchaseService, SimulatedBackend};
use packgate_receipt::{Receipt, ValidatorConfig};
use packgate_types::{Catalog, PackId};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Entitlement storage file inside the data directory.
pub const STORE_FILE: &str = "entitlements.json";
/// Simulated backend receipts inside the data directory.
pub const RECEIPTS_FILE: &str = "receipts.json";

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show packs, prices and item access
    Status,
    /// Check whether an item can be opened
    Access { item: String },
    /// Buy a pack through the simulated store
    Purchase { pack: String },
    /// Re-derive entitlements from stored receipts
    Restore,
    /// Unlock a pack locally without a purchase
    Grant { pack: String },
    /// Lock a pack locally
    Revoke { pack: String },
    /// Wipe local entitlements back to the free pack
    Reset,
}

/// Catalog used when the config file does not provide one.
#[must_use]
pub fn builtin_catalog() -> Catalog {
    Catalog::new("pack_free")
        .with_product("com.packgate.pack01", "pack_01")
        .with_product("com.packgate.pack02", "pack_02")
        .with_product("com.packgate.pack03", "pack_03")
        .with_item("MakeBubbles", "pack_free", 1)
        .with_item("PopBalloons", "pack_free", 2)
        .with_item("WhackAMole", "pack_01", 3)
        .with_item("FlowerBlooming", "pack_01", 4)
        .with_item("Cook", "pack_02", 5)
        .with_item("Paint", "pack_02", 6)
        .with_item("Orchestra", "pack_03", 7)
}

/// A simulated store selling every catalog product.
fn simulated_backend(catalog: &Catalog) -> SimulatedBackend {
    catalog
        .products()
        .iter()
        .enumerate()
        .fold(SimulatedBackend::new(), |backend, (i, mapping)| {
            backend.with_product(mapping.product_id.clone(), format!("${i}.99"))
        })
}

fn load_receipts(path: &Path) -> Result<Vec<Receipt>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read receipts from {}", path.display()))?;
    serde_json::from_str(&json).context("failed to parse receipts file")
}

/// One packgate stack over a data directory.
pub struct Session {
    orchestrator: Arc<InitOrchestrator>,
    backend: SimulatedBackend,
    receipts_path: PathBuf,
}

impl Session {
    /// Builds the stack over `data_dir` and runs startup to `Ready`.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory, receipts or configuration
    /// cannot be used, or if the configuration asks for a receipt validator
    /// the simulated store's unsigned receipts cannot pass.
    pub async fn open(data_dir: &Path, config: PackgateConfig) -> Result<Self> {
        // Simulated receipts are unsigned; a signing validator would revoke them on restore.
        if config.validator != ValidatorConfig::None {
            bail!("the simulated store issues unsigned receipts, set the validator kind to \"none\"");
        }
        fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let catalog = config.catalog.unwrap_or_else(builtin_catalog);
        let backend = simulated_backend(&catalog);
        let receipts_path = data_dir.join(RECEIPTS_FILE);
        for receipt in load_receipts(&receipts_path)? {
            debug!(product = %receipt.product_id, "loading stored receipt");
            backend.set_receipt(receipt.product_id.as_str(), receipt.data);
        }

        let storage = JsonFileKeyValueStore::open(data_dir.join(STORE_FILE))
            .context("failed to open entitlement storage")?;
        let validator = config
            .validator
            .build()
            .context("invalid validator configuration")?;

        let context = AppContext::builder(catalog)
            .storage(Arc::new(storage))
            .backend(Arc::new(backend.clone()))
            .validator(validator)
            .build()
            .context("failed to assemble packgate")?;

        let orchestrator = Arc::new(InitOrchestrator::new(context, config.orchestrator));
        orchestrator.start().await;

        Ok(Self {
            orchestrator,
            backend,
            receipts_path,
        })
    }

    #[must_use]
    pub fn orchestrator(&self) -> &Arc<InitOrchestrator> {
        &self.orchestrator
    }

    /// Runs one command and returns its report.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be carried out.
    pub async fn run(&self, command: &Command) -> Result<String> {
        match command {
            Command::Status => Ok(self.status()),
            Command::Access { item } => self.access(item),
            Command::Purchase { pack } => self.purchase(pack).await,
            Command::Restore => self.restore().await,
            Command::Grant { pack } => self.grant(pack),
            Command::Revoke { pack } => self.revoke(pack),
            Command::Reset => {
                self.store()?.clear_all();
                Ok("entitlements reset".to_string())
            }
        }
    }

    fn store(&self) -> Result<Arc<EntitlementStore>> {
        self.orchestrator
            .context()
            .store()
            .context("entitlement store is not available")
    }

    fn purchase_service(&self) -> Result<PurchaseService> {
        self.orchestrator
            .context()
            .purchase_service()
            .context("purchase service is not available")
    }

    fn catalog(&self) -> &Catalog {
        self.orchestrator.context().catalog()
    }

    /// Default pack first, then packs in product order.
    fn packs(&self) -> Vec<PackId> {
        let catalog = self.catalog();
        std::iter::once(catalog.default_pack().clone())
            .chain(catalog.products().iter().map(|m| m.pack_id.clone()))
            .collect()
    }

    fn ensure_known_pack(&self, pack: &str) -> Result<()> {
        let catalog = self.catalog();
        if catalog.is_default_pack(pack) || catalog.product_for_pack(pack).is_some() {
            Ok(())
        } else {
            bail!("unknown pack: {pack}")
        }
    }

    fn status(&self) -> String {
        let context = self.orchestrator.context();
        let gate = context.gate();
        let store = context.store();
        let service = context.purchase_service();

        let mut out = String::new();
        let _ = writeln!(out, "stage: {}", self.orchestrator.stage());
        let _ = writeln!(out, "packs:");
        for pack in self.packs() {
            let state = if gate.is_pack_owned(pack.as_str()) {
                "owned"
            } else if store.as_ref().is_some_and(|s| s.is_pending(pack.as_str())) {
                "pending"
            } else {
                "locked"
            };
            let price = if self.catalog().is_default_pack(pack.as_str()) {
                String::new()
            } else {
                service
                    .as_ref()
                    .map(|s| s.get_product_price(pack.as_str()))
                    .unwrap_or_else(|| packgate_purchase::PRICE_UNAVAILABLE.to_string())
            };
            let _ = writeln!(
                out,
                "  {:<12} {:<8} {:>3} items  {price}",
                pack.as_str(),
                state,
                gate.item_count_in_pack(pack.as_str())
            );
        }
        let _ = writeln!(out, "items:");
        for entry in gate.access_report() {
            let _ = writeln!(
                out,
                "  {:>3}  {:<16} {:<12} {}",
                entry.display_order,
                entry.item_id.as_str(),
                entry.pack_id.as_str(),
                if entry.accessible { "open" } else { "locked" }
            );
        }
        out.trim_end().to_string()
    }

    fn access(&self, item: &str) -> Result<String> {
        let gate = self.orchestrator.context().gate();
        let Some(pack) = gate.catalog().pack_for_item(item) else {
            bail!("unknown item: {item}")
        };
        let verdict = if gate.can_access(item) { "open" } else { "locked" };
        Ok(format!("{item}: {verdict} ({pack})"))
    }

    async fn purchase(&self, pack: &str) -> Result<String> {
        let service = self.purchase_service()?;
        match service.purchase_product(pack).await {
            PurchaseOutcome::Success(pack) => {
                self.save_receipts()?;
                info!(pack = %pack, "purchase recorded");
                Ok(format!("purchased {pack}"))
            }
            PurchaseOutcome::Failed { pack_id, reason } => {
                bail!("purchase of {pack_id} failed: {reason}")
            }
        }
    }

    async fn restore(&self) -> Result<String> {
        let service = self.purchase_service()?;
        if !service.is_initialized() {
            bail!("billing backend is not connected");
        }
        let report = service.restore_purchases().await;
        if report.is_empty() {
            return Ok("no receipts to restore".to_string());
        }

        let mut out = String::new();
        for entry in &report.entries {
            let _ = writeln!(out, "{}: {:?}", entry.pack_id, entry.verdict);
        }
        Ok(out.trim_end().to_string())
    }

    fn grant(&self, pack: &str) -> Result<String> {
        self.ensure_known_pack(pack)?;
        if self.store()?.grant_pack(pack) {
            Ok(format!("granted {pack}"))
        } else {
            Ok(format!("{pack} already owned"))
        }
    }

    fn revoke(&self, pack: &str) -> Result<String> {
        self.ensure_known_pack(pack)?;
        if self.catalog().is_default_pack(pack) {
            bail!("{pack} is the default pack and cannot be revoked");
        }
        if self.store()?.revoke_pack(pack) {
            Ok(format!("revoked {pack}"))
        } else {
            Ok(format!("{pack} was not owned"))
        }
    }

    fn save_receipts(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.backend.receipts())?;
        fs::write(&self.receipts_path, json).with_context(|| {
            format!("failed to write receipts to {}", self.receipts_path.display())
        })
    }
}
