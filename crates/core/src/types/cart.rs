//! Cart mapping stored on each user record.
//!
//! The cart is a mapping from product ID to a per-product entry. On the wire
//! each entry is an object with a single `qty` field, and the whole cart is a
//! JSON object keyed by product ID:
//!
//! ```json
//! { "shirt-1": { "qty": 3 }, "hoodie-2": { "qty": 1 } }
//! ```
//!
//! Key order within one read is deterministic, but callers must not rely on
//! ordering being stable across distinct writes of the record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// A single cart line: how many units of one product.
///
/// Quantities are never clamped to a business maximum, and a zero quantity is
/// a valid stored state - entries only leave the cart via [`Cart::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartEntry {
    /// Unit count for this product.
    #[serde(rename = "qty")]
    pub quantity: u32,
}

/// The per-user cart: product ID mapped to its entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart(BTreeMap<ProductId, CartEntry>);

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `quantity` units of a product.
    ///
    /// Creates the entry if the product is not yet in the cart; otherwise the
    /// existing quantity accumulates (saturating at `u32::MAX`).
    pub fn add(&mut self, product_id: ProductId, quantity: u32) {
        self.0
            .entry(product_id)
            .and_modify(|entry| entry.quantity = entry.quantity.saturating_add(quantity))
            .or_insert(CartEntry { quantity });
    }

    /// Remove a product's entry entirely.
    ///
    /// Returns `true` if an entry was present. Removing an absent product
    /// leaves the cart untouched.
    pub fn remove(&mut self, product_id: &ProductId) -> bool {
        self.0.remove(product_id).is_some()
    }

    /// Get the entry for a product, if present.
    #[must_use]
    pub fn get(&self, product_id: &ProductId) -> Option<&CartEntry> {
        self.0.get(product_id)
    }

    /// Whether the cart holds an entry for this product.
    #[must_use]
    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.0.contains_key(product_id)
    }

    /// Number of distinct products in the cart.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the cart has no entries at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total unit count across all entries (saturating).
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.0
            .values()
            .fold(0_u32, |acc, entry| acc.saturating_add(entry.quantity))
    }

    /// Iterate entries in stored key order.
    pub fn iter(&self) -> impl Iterator<Item = (&ProductId, &CartEntry)> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a Cart {
    type Item = (&'a ProductId, &'a CartEntry);
    type IntoIter = std::collections::btree_map::Iter<'a, ProductId, CartEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
