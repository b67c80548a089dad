//! The static product and item catalog.
//!
//! The catalog is data owned by the host application. It maps platform
//! product ids to packs (for the billing side) and content items to packs
//! (for the access gate). It is read-only once constructed.

use crate::ids::{ItemId, PackId, ProductId, DEFAULT_PACK};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How the billing platform treats a product.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProductKind {
    /// Bought once, owned forever. The only kind that grants packs.
    #[default]
    NonConsumable,
    /// Used up on purchase.
    Consumable,
    /// Recurring billing.
    Subscription,
}

/// Associates a platform product with the pack it unlocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductMapping {
    /// Platform billing identifier.
    pub product_id: ProductId,
    /// Pack unlocked by the product.
    pub pack_id: PackId,
    /// Product kind registered with the backend.
    #[serde(default)]
    pub kind: ProductKind,
}

impl ProductMapping {
    /// Creates a non-consumable mapping.
    #[must_use]
    pub fn new(product_id: impl Into<ProductId>, pack_id: impl Into<PackId>) -> Self {
        Self {
            product_id: product_id.into(),
            pack_id: pack_id.into(),
            kind: ProductKind::NonConsumable,
        }
    }
}

/// A gated content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub item_id: ItemId,
    pub pack_id: PackId,
    /// Position in the menu, 1-based.
    #[serde(default)]
    pub display_order: u32,
}

impl CatalogItem {
    #[must_use]
    pub fn new(item_id: impl Into<ItemId>, pack_id: impl Into<PackId>, display_order: u32) -> Self {
        Self {
            item_id: item_id.into(),
            pack_id: pack_id.into(),
            display_order,
        }
    }
}

fn default_pack() -> PackId {
    PackId::new(DEFAULT_PACK)
}

/// Ordered product list plus the item-to-pack table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    #[serde(default = "default_pack")]
    default_pack: PackId,
    #[serde(default)]
    products: Vec<ProductMapping>,
    #[serde(default)]
    items: Vec<CatalogItem>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(default_pack())
    }
}

impl Catalog {
    /// Creates an empty catalog with the given free pack.
    #[must_use]
    pub fn new(default_pack: impl Into<PackId>) -> Self {
        Self {
            default_pack: default_pack.into(),
            products: Vec::new(),
            items: Vec::new(),
        }
    }

    /// Adds a non-consumable product mapping.
    #[must_use]
    pub fn with_product(mut self, product_id: impl Into<ProductId>, pack_id: impl Into<PackId>) -> Self {
        self.products.push(ProductMapping::new(product_id, pack_id));
        self
    }

    /// Adds a content item.
    #[must_use]
    pub fn with_item(
        mut self,
        item_id: impl Into<ItemId>,
        pack_id: impl Into<PackId>,
        display_order: u32,
    ) -> Self {
        self.items.push(CatalogItem::new(item_id, pack_id, display_order));
        self
    }

    /// Parses a catalog from JSON and validates it.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the catalog is inconsistent.
    pub fn from_json(json: &str) -> Result<Self> {
        let catalog: Self = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Checks that the mapping is bidirectional and every product grants a pack.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCatalog`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.default_pack.is_empty() {
            return Err(Error::InvalidCatalog("default pack id is empty".into()));
        }

        let mut product_ids = HashSet::new();
        let mut pack_ids = HashSet::new();
        for mapping in &self.products {
            if mapping.product_id.is_empty() || mapping.pack_id.is_empty() {
                return Err(Error::InvalidCatalog("product mapping has an empty id".into()));
            }
            if mapping.kind != ProductKind::NonConsumable {
                return Err(Error::InvalidCatalog(format!(
                    "product {} is not non-consumable",
                    mapping.product_id
                )));
            }
            if mapping.pack_id == self.default_pack {
                return Err(Error::InvalidCatalog(format!(
                    "product {} maps to the default pack",
                    mapping.product_id
                )));
            }
            if !product_ids.insert(&mapping.product_id) {
                return Err(Error::InvalidCatalog(format!(
                    "duplicate product id {}",
                    mapping.product_id
                )));
            }
            if !pack_ids.insert(&mapping.pack_id) {
                return Err(Error::InvalidCatalog(format!(
                    "pack {} is sold by more than one product",
                    mapping.pack_id
                )));
            }
        }

        let mut item_ids = HashSet::new();
        for item in &self.items {
            if !item_ids.insert(&item.item_id) {
                return Err(Error::InvalidCatalog(format!("duplicate item id {}", item.item_id)));
            }
        }

        Ok(())
    }

    /// Returns the free pack every device owns.
    #[must_use]
    pub fn default_pack(&self) -> &PackId {
        &self.default_pack
    }

    /// Returns true if `pack_id` is the free pack.
    #[must_use]
    pub fn is_default_pack(&self, pack_id: &str) -> bool {
        self.default_pack.as_str() == pack_id
    }

    /// Returns the products in registration order.
    #[must_use]
    pub fn products(&self) -> &[ProductMapping] {
        &self.products
    }

    /// Returns the content items.
    #[must_use]
    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    /// Looks up the product that sells a pack.
    #[must_use]
    pub fn product_for_pack(&self, pack_id: &str) -> Option<&ProductMapping> {
        self.products.iter().find(|p| p.pack_id.as_str() == pack_id)
    }

    /// Looks up the mapping for a platform product id.
    #[must_use]
    pub fn mapping_for_product(&self, product_id: &str) -> Option<&ProductMapping> {
        self.products.iter().find(|p| p.product_id.as_str() == product_id)
    }

    /// Looks up a content item.
    #[must_use]
    pub fn item(&self, item_id: &str) -> Option<&CatalogItem> {
        self.items.iter().find(|i| i.item_id.as_str() == item_id)
    }

    /// Resolves the pack that gates an item.
    #[must_use]
    pub fn pack_for_item(&self, item_id: &str) -> Option<&PackId> {
        self.item(item_id).map(|i| &i.pack_id)
    }

    /// Looks up the item shown at a menu position.
    #[must_use]
    pub fn item_by_display_order(&self, display_order: u32) -> Option<&CatalogItem> {
        self.items.iter().find(|i| i.display_order == display_order)
    }

    /// Iterates over the items gated by a pack.
    pub fn items_in_pack<'a>(&'a self, pack_id: &'a str) -> impl Iterator<Item = &'a CatalogItem> + 'a {
        self.items.iter().filter(move |i| i.pack_id.as_str() == pack_id)
    }
}
