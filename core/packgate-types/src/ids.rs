//! Identifier types used throughout packgate.
//!
//! All identifiers are opaque strings supplied by the catalog or the billing
//! platform. They are newtyped so a product id can never be passed where a
//! pack id is expected.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// The pack every device owns from first launch.
pub const DEFAULT_PACK: &str = "pack_free";

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps an existing identifier string.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns true if the identifier is the empty string.
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id! {
    /// Identifies a purchasable content bundle.
    PackId
}

string_id! {
    /// The billing platform's identifier for a purchasable SKU.
    ProductId
}

string_id! {
    /// Identifies a single piece of gated content (a game, a scene).
    ItemId
}

impl PackId {
    /// Returns the built-in free pack id.
    #[must_use]
    pub fn default_pack() -> Self {
        Self::new(DEFAULT_PACK)
    }
}
