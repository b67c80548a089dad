//! Content access checks.
//!
//! The gate maps a content item to its pack through the catalog and asks the
//! entitlement store whether that pack is owned. It never talks to billing.
//! Until the store exists only the default pack's items are reachable, which
//! keeps a playable baseline while startup is still running.

use crate::store::EntitlementStore;
use packgate_types::{Catalog, CatalogItem, ItemId, PackId};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Access state of one catalog item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessEntry {
    pub item_id: ItemId,
    pub pack_id: PackId,
    pub display_order: u32,
    pub accessible: bool,
}

/// Stateless item → pack → ownership lookup.
#[derive(Debug, Clone)]
pub struct FeatureGate {
    catalog: Arc<Catalog>,
    store: Option<Arc<EntitlementStore>>,
}

impl FeatureGate {
    /// Creates a gate backed by a loaded store.
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, store: Arc<EntitlementStore>) -> Self {
        Self {
            catalog,
            store: Some(store),
        }
    }

    /// Creates a gate for a store that may not be constructed yet.
    #[must_use]
    pub fn with_optional_store(catalog: Arc<Catalog>, store: Option<Arc<EntitlementStore>>) -> Self {
        Self { catalog, store }
    }

    /// Returns the catalog the gate resolves items against.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Returns true if the item may be opened. Unknown items are denied.
    #[must_use]
    pub fn can_access(&self, item_id: &str) -> bool {
        if item_id.is_empty() {
            error!("access check with empty item id");
            return false;
        }

        let Some(item) = self.catalog.item(item_id) else {
            error!(item = item_id, "access check for unknown item");
            return false;
        };

        let allowed = self.is_pack_owned(item.pack_id.as_str());
        debug!(item = item_id, pack = %item.pack_id, allowed, "access check");
        allowed
    }

    /// Returns true if the item at menu position `display_order` may be opened.
    #[must_use]
    pub fn can_access_by_display_order(&self, display_order: u32) -> bool {
        match self.catalog.item_by_display_order(display_order) {
            Some(item) => self.can_access(item.item_id.as_str()),
            None => {
                error!(display_order, "access check for unknown display order");
                false
            }
        }
    }

    /// Returns true if the pack is owned. Without a store only the default
    /// pack counts as owned.
    #[must_use]
    pub fn is_pack_owned(&self, pack_id: &str) -> bool {
        if pack_id.is_empty() {
            return false;
        }
        match &self.store {
            Some(store) => store.has_pack(pack_id),
            None => {
                warn!(pack = pack_id, "entitlement store not ready, only the default pack is open");
                self.catalog.is_default_pack(pack_id)
            }
        }
    }

    #[must_use]
    pub fn is_pack_locked(&self, pack_id: &str) -> bool {
        !self.is_pack_owned(pack_id)
    }

    #[must_use]
    pub fn is_item_locked(&self, item_id: &str) -> bool {
        !self.can_access(item_id)
    }

    /// Returns the items gated by a pack, in catalog order.
    #[must_use]
    pub fn items_in_pack(&self, pack_id: &str) -> Vec<CatalogItem> {
        if pack_id.is_empty() {
            return Vec::new();
        }
        self.catalog.items_in_pack(pack_id).cloned().collect()
    }

    #[must_use]
    pub fn item_count_in_pack(&self, pack_id: &str) -> usize {
        if pack_id.is_empty() {
            return 0;
        }
        self.catalog.items_in_pack(pack_id).count()
    }

    /// Lists every catalog item with its current access state, ordered by
    /// display position.
    #[must_use]
    pub fn access_report(&self) -> Vec<AccessEntry> {
        let mut entries: Vec<AccessEntry> = self
            .catalog
            .items()
            .iter()
            .map(|item| AccessEntry {
                item_id: item.item_id.clone(),
                pack_id: item.pack_id.clone(),
                display_order: item.display_order,
                accessible: self.is_pack_owned(item.pack_id.as_str()),
            })
            .collect();
        entries.sort_by_key(|e| e.display_order);
        entries
    }
}
