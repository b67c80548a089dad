use serde::{Deserialize, Serialize};

/// Per-product decision taken while restoring purchases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReceiptVerdict {
    /// Receipt verified, purchase is current. Pack granted.
    Granted,
    /// Receipt refunded, cancelled or failed verification. Pack revoked.
    Revoked,
    /// Backend flagged a receipt but returned none. Nothing changed.
    UnchangedNoReceipt,
    /// No validator for this platform; pack granted on trust.
    GrantedUnverified,
}

impl ReceiptVerdict {
    /// Returns true if the verdict leaves the pack owned.
    #[must_use]
    pub fn grants(&self) -> bool {
        matches!(self, Self::Granted | Self::GrantedUnverified)
    }

    /// Returns true if the verdict was reached with degraded trust.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::GrantedUnverified)
    }
}
