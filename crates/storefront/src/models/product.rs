//! Read-only product records from the `products` collection.

use serde::Deserialize;

use urban_threads_core::{Price, ProductId};

/// A catalog product.
///
/// The storefront only ever reads products; the catalog is maintained
/// elsewhere. Decoding is lenient about cosmetic fields (name, description,
/// image) because the collection predates this application, but a price that
/// is negative or not a number makes the whole record malformed - callers
/// treat such records as missing rather than surface a bad price.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    /// Document key in the `products` collection.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Short description (may be empty).
    pub description: String,
    /// Unit price in USD. Zero when the record carries no price.
    pub price: Price,
    /// Absolute URL of the product image, if any.
    pub image_url: Option<String>,
}

/// Wire shape of a product document's fields.
#[derive(Debug, Deserialize)]
struct ProductFields {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    price: Option<Price>,
    #[serde(rename = "imageURL", default)]
    image_url: Option<String>,
}

impl Product {
    /// Fallback display name for records without one.
    pub const UNNAMED: &'static str = "Unnamed product";

    /// Decode a product from its document fields.
    ///
    /// # Errors
    ///
    /// Returns a decode error if `fields` is not an object or carries an
    /// invalid price (negative or non-numeric).
    pub fn from_fields(
        id: ProductId,
        fields: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        let wire: ProductFields = serde_json::from_value(fields)?;
        Ok(Self {
            id,
            name: wire.name.unwrap_or_else(|| Self::UNNAMED.to_string()),
            description: wire.description.unwrap_or_default(),
            price: wire.price.unwrap_or(Price::ZERO),
            image_url: wire.image_url,
        })
    }
}
