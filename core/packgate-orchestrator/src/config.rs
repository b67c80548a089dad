//! Startup and application configuration.

use crate::error::OrchestratorResult;
use packgate_receipt::ValidatorConfig;
use packgate_types::Catalog;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Per-stage startup budgets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrchestratorConfig {
    /// Budget for loading the entitlement store (ms).
    pub store_timeout_ms: u64,
    /// Budget for connecting the billing backend (ms).
    pub purchase_service_timeout_ms: u64,
    /// Budget for the startup receipt sync (ms).
    pub sync_timeout_ms: u64,
    /// Whether [`crate::InitOrchestrator::launch`] starts the pipeline immediately.
    pub auto_start: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            store_timeout_ms: 5_000,
            purchase_service_timeout_ms: 30_000,
            sync_timeout_ms: 10_000,
            auto_start: true,
        }
    }
}

impl OrchestratorConfig {
    #[must_use]
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    #[must_use]
    pub fn purchase_service_timeout(&self) -> Duration {
        Duration::from_millis(self.purchase_service_timeout_ms)
    }

    #[must_use]
    pub fn sync_timeout(&self) -> Duration {
        Duration::from_millis(self.sync_timeout_ms)
    }
}

/// Everything a packgate host reads from its config file.
///
/// ```json
/// {
///   "catalog": { "defaultPack": "pack_free", "products": [], "items": [] },
///   "orchestrator": { "purchaseServiceTimeoutMs": 15000 },
///   "validator": { "kind": "ed25519", "publicKey": "..." }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PackgateConfig {
    /// Catalog override. Hosts fall back to a built-in catalog when absent.
    pub catalog: Option<Catalog>,
    pub orchestrator: OrchestratorConfig,
    pub validator: ValidatorConfig,
}

impl PackgateConfig {
    /// Parses and validates a config document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the catalog is inconsistent.
    pub fn from_json(json: &str) -> OrchestratorResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        if let Some(catalog) = &config.catalog {
            catalog.validate()?;
        }
        Ok(config)
    }

    /// Reads a config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or fails [`Self::from_json`].
    pub fn load(path: &Path) -> OrchestratorResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
