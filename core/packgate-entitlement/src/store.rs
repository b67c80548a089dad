//! The authoritative local entitlement record.
//!
//! All mutations are synchronous: the in-memory record is changed and the full
//! record is written back to storage before the lock is released, so no reader
//! can ever observe a half-applied change.

use crate::error::StoreResult;
use crate::events::EntitlementEvent;
use crate::kv::KeyValueStore;
use crate::record::{
    EntitlementRecord, OwnedPacksDoc, PendingPacksDoc, OWNED_PACKS_KEY, PENDING_PACKS_KEY,
};
use packgate_types::PackId;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tracing::{debug, error, info};

const EVENT_CAPACITY: usize = 64;

/// Owned and pending packs for this device, persisted after every change.
pub struct EntitlementStore {
    storage: Arc<dyn KeyValueStore>,
    default_pack: PackId,
    record: Mutex<EntitlementRecord>,
    events: broadcast::Sender<EntitlementEvent>,
}

impl std::fmt::Debug for EntitlementStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntitlementStore")
            .field("default_pack", &self.default_pack)
            .field("record", &*self.lock())
            .finish_non_exhaustive()
    }
}

impl EntitlementStore {
    /// Loads the record from `storage` and seeds `default_pack`.
    ///
    /// Never fails: unreadable storage is logged and treated as a first launch.
    pub fn open(storage: Arc<dyn KeyValueStore>, default_pack: PackId) -> Self {
        let record = load_record(storage.as_ref());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let store = Self {
            storage,
            default_pack,
            record: Mutex::new(record),
            events,
        };

        let default_pack = store.default_pack.clone();
        store.grant_pack(default_pack.as_str());
        store
    }

    /// Returns the free pack that can never be revoked.
    #[must_use]
    pub fn default_pack(&self) -> &PackId {
        &self.default_pack
    }

    /// Subscribes to `Unlocked`/`Revoked` notifications. Drop the receiver to
    /// unsubscribe.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EntitlementEvent> {
        self.events.subscribe()
    }

    /// Returns true if the pack is owned. Unknown or empty ids are not owned.
    #[must_use]
    pub fn has_pack(&self, pack_id: &str) -> bool {
        if pack_id.is_empty() {
            return false;
        }
        self.lock().owned_packs.contains(pack_id)
    }

    /// Returns true if the pack awaits purchase confirmation.
    #[must_use]
    pub fn is_pending(&self, pack_id: &str) -> bool {
        if pack_id.is_empty() {
            return false;
        }
        self.lock().pending_packs.contains(pack_id)
    }

    /// Grants a pack. Returns true if ownership changed.
    ///
    /// Clears any pending mark and fires [`EntitlementEvent::Unlocked`] only on
    /// the not-owned → owned transition.
    pub fn grant_pack(&self, pack_id: &str) -> bool {
        if pack_id.is_empty() {
            return false;
        }

        let mut record = self.lock();
        let was_pending = record.pending_packs.remove(pack_id);
        let newly_owned = record.owned_packs.insert(PackId::new(pack_id));
        if !newly_owned && !was_pending {
            return false;
        }
        self.save(&record);
        drop(record);

        if newly_owned {
            info!(pack = pack_id, "pack granted");
            let _ = self.events.send(EntitlementEvent::Unlocked(PackId::new(pack_id)));
        }
        newly_owned
    }

    /// Revokes a pack (refund, cancellation, failed receipt). Returns true if
    /// ownership changed.
    ///
    /// The default pack is never revoked. Pending marks are left as they are.
    pub fn revoke_pack(&self, pack_id: &str) -> bool {
        if pack_id.is_empty() || pack_id == self.default_pack.as_str() {
            return false;
        }

        let mut record = self.lock();
        if !record.owned_packs.remove(pack_id) {
            return false;
        }
        self.save(&record);
        drop(record);

        info!(pack = pack_id, "pack revoked");
        let _ = self.events.send(EntitlementEvent::Revoked(PackId::new(pack_id)));
        true
    }

    /// Marks a pack as awaiting purchase confirmation.
    ///
    /// No-op for the default pack and for packs already owned.
    pub fn mark_pending(&self, pack_id: &str) {
        if pack_id.is_empty() || pack_id == self.default_pack.as_str() {
            return;
        }

        let mut record = self.lock();
        if record.owned_packs.contains(pack_id) {
            return;
        }
        if record.pending_packs.insert(PackId::new(pack_id)) {
            debug!(pack = pack_id, "pack marked pending");
            self.save(&record);
        }
    }

    /// Removes a pending mark. No-op for the default pack.
    pub fn clear_pending(&self, pack_id: &str) {
        if pack_id.is_empty() || pack_id == self.default_pack.as_str() {
            return;
        }

        let mut record = self.lock();
        if record.pending_packs.remove(pack_id) {
            debug!(pack = pack_id, "pending mark cleared");
            self.save(&record);
        }
    }

    /// Returns a copy of the owned packs.
    #[must_use]
    pub fn owned_packs(&self) -> BTreeSet<PackId> {
        self.lock().owned_packs.clone()
    }

    /// Returns a copy of the pending packs.
    #[must_use]
    pub fn pending_packs(&self) -> BTreeSet<PackId> {
        self.lock().pending_packs.clone()
    }

    /// Returns a copy of the whole record.
    #[must_use]
    pub fn snapshot(&self) -> EntitlementRecord {
        self.lock().clone()
    }

    /// Wipes every entitlement and re-seeds the default pack.
    ///
    /// Maintenance reset; fires `Revoked` for every pack that was owned.
    pub fn clear_all(&self) {
        let mut record = self.lock();
        let removed: Vec<PackId> = record
            .owned_packs
            .iter()
            .filter(|p| **p != self.default_pack)
            .cloned()
            .collect();
        record.owned_packs.clear();
        record.pending_packs.clear();
        record.owned_packs.insert(self.default_pack.clone());
        self.save(&record);
        drop(record);

        info!(removed = removed.len(), "all entitlements cleared");
        for pack in removed {
            let _ = self.events.send(EntitlementEvent::Revoked(pack));
        }
    }

    fn lock(&self) -> MutexGuard<'_, EntitlementRecord> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn save(&self, record: &EntitlementRecord) {
        match write_record(self.storage.as_ref(), record) {
            Ok(()) => debug!(
                owned = record.owned_packs.len(),
                pending = record.pending_packs.len(),
                "entitlements saved"
            ),
            Err(e) => error!("failed to save entitlements: {e}"),
        }
    }
}

fn write_record(storage: &dyn KeyValueStore, record: &EntitlementRecord) -> StoreResult<()> {
    let owned = serde_json::to_string(&record.owned_doc())?;
    let pending = serde_json::to_string(&record.pending_doc())?;
    storage.set_many(&[(OWNED_PACKS_KEY, owned), (PENDING_PACKS_KEY, pending)])
}

fn load_record(storage: &dyn KeyValueStore) -> EntitlementRecord {
    let owned = match read_doc::<OwnedPacksDoc>(storage, OWNED_PACKS_KEY) {
        Ok(Some(doc)) => doc.owned_packs,
        Ok(None) => {
            info!("no stored entitlements, starting fresh");
            Vec::new()
        }
        Err(e) => {
            error!("failed to load entitlements, starting fresh: {e}");
            Vec::new()
        }
    };

    let pending = match read_doc::<PendingPacksDoc>(storage, PENDING_PACKS_KEY) {
        Ok(doc) => doc.map(|d| d.pending_packs).unwrap_or_default(),
        Err(e) => {
            error!("failed to load pending packs, discarding: {e}");
            Vec::new()
        }
    };

    let mut record = EntitlementRecord {
        owned_packs: owned.into_iter().collect(),
        pending_packs: pending.into_iter().collect(),
    };
    record.normalize();
    info!(
        owned = record.owned_packs.len(),
        pending = record.pending_packs.len(),
        "entitlements loaded"
    );
    record
}

fn read_doc<T: serde::de::DeserializeOwned>(
    storage: &dyn KeyValueStore,
    key: &str,
) -> StoreResult<Option<T>> {
    match storage.get(key)? {
        Some(json) if !json.trim().is_empty() => Ok(Some(serde_json::from_str(&json)?)),
        _ => Ok(None),
    }
}
