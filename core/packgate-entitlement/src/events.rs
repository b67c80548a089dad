use packgate_types::PackId;

/// Ownership change broadcast by [`crate::EntitlementStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntitlementEvent {
    /// The pack went from not owned to owned.
    Unlocked(PackId),
    /// The pack went from owned to not owned.
    Revoked(PackId),
}

impl EntitlementEvent {
    /// Returns the pack the event concerns.
    #[must_use]
    pub fn pack_id(&self) -> &PackId {
        match self {
            Self::Unlocked(id) | Self::Revoked(id) => id,
        }
    }
}
