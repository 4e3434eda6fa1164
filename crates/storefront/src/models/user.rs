//! The per-user document stored in the `users` collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use urban_threads_core::{Cart, Email};

/// A user record, keyed by the identity service's user ID.
///
/// Created lazily: the record does not exist until the user's first cart
/// write (or sign-up), and it is created whole via the store's
/// create-if-absent operation with [`UserRecord::new`] as the default value.
/// After that, cart changes only ever merge the `cart` field - the other
/// fields are never rewritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Email address at the time the record was created.
    pub email: Email,
    /// Display name from the identity service, if any.
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
    /// When the record was first created.
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    /// The cart mapping. Always present once the record exists; records
    /// written before the cart field was introduced decode as empty.
    #[serde(default)]
    pub cart: Cart,
}

impl UserRecord {
    /// The default value written when a record is first created: the user's
    /// identity fields, a creation timestamp, and an empty cart.
    #[must_use]
    pub fn new(email: Email, display_name: Option<String>) -> Self {
        Self {
            email,
            display_name,
            created_at: Utc::now(),
            cart: Cart::new(),
        }
    }
}
