//! The entitlement record and its persisted JSON documents.

use packgate_types::PackId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Storage key holding the owned-pack document.
pub const OWNED_PACKS_KEY: &str = "purchased_packs";

/// Storage key holding the pending-pack document.
pub const PENDING_PACKS_KEY: &str = "pending_packs";

/// Owned and pending packs.
///
/// A pack is never in both sets at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementRecord {
    pub owned_packs: BTreeSet<PackId>,
    pub pending_packs: BTreeSet<PackId>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OwnedPacksDoc {
    #[serde(default)]
    pub owned_packs: Vec<PackId>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PendingPacksDoc {
    #[serde(default)]
    pub pending_packs: Vec<PackId>,
}

impl EntitlementRecord {
    pub(crate) fn owned_doc(&self) -> OwnedPacksDoc {
        OwnedPacksDoc {
            owned_packs: self.owned_packs.iter().cloned().collect(),
        }
    }

    pub(crate) fn pending_doc(&self) -> PendingPacksDoc {
        PendingPacksDoc {
            pending_packs: self.pending_packs.iter().cloned().collect(),
        }
    }

    /// Drops empty ids and any pending entry that is already owned.
    pub(crate) fn normalize(&mut self) {
        self.owned_packs.retain(|p| !p.is_empty());
        self.pending_packs.retain(|p| !p.is_empty());
        let owned = &self.owned_packs;
        self.pending_packs.retain(|p| !owned.contains(p));
    }
}
