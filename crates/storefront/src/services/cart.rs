//! Cart operations against the signed-in user's stored record.
//!
//! The cart is a field of the user document in the external store; there is
//! no server-side copy. Every operation takes the acting [`CurrentUser`]
//! explicitly - nothing here can run without a caller who already proved who
//! they are (see `crate::middleware::RequireUser`).
//!
//! # Concurrency
//!
//! Mutations are read-modify-write cycles guarded by the document revision:
//! a write that loses a race fails with `RevisionMismatch` and is retried
//! against a fresh read, so two tabs adding at once both land instead of one
//! silently overwriting the other. Retries are bounded; exhaustion surfaces
//! [`CartError::Contention`].

use std::sync::Arc;

use serde_json::json;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use urban_threads_core::{Cart, Price, ProductId, UserId};

use crate::docstore::{CreateOutcome, Document, DocumentStore, StoreError};
use crate::models::{CurrentUser, Product, UserRecord, collections};
use crate::services::CatalogService;

/// How many revision races a single cart write will absorb before giving up.
const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Document store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The stored user record exists but cannot be decoded.
    #[error("user record {user_id} failed to decode: {source}")]
    Corrupt {
        /// Owner of the undecodable record.
        user_id: UserId,
        #[source]
        source: serde_json::Error,
    },

    /// Concurrent writers kept winning; the update was not applied.
    #[error("cart update kept losing revision races")]
    Contention,
}

/// One renderable cart row: a stored entry joined onto its product.
#[derive(Debug, Clone)]
pub struct CartLine {
    /// The product this line refers to.
    pub product: Product,
    /// Units of the product in the cart.
    pub quantity: u32,
    /// `price × quantity` for this line.
    pub subtotal: Price,
}

/// The user's cart joined against the catalog, ready to render.
#[derive(Debug, Clone)]
pub struct CartContents {
    /// Lines in stored-key order. Entries whose product no longer exists in
    /// the catalog are absent.
    pub lines: Vec<CartLine>,
    /// Sum of the line subtotals.
    pub total: Price,
}

impl CartContents {
    /// Whether there is anything to check out.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl Default for CartContents {
    fn default() -> Self {
        Self {
            lines: Vec::new(),
            total: Price::ZERO,
        }
    }
}

/// Cart operations over the `users` collection.
///
/// Cheap to clone; clones share the underlying store handle.
#[derive(Clone)]
pub struct CartService {
    inner: Arc<CartServiceInner>,
}

struct CartServiceInner {
    store: Arc<dyn DocumentStore>,
    catalog: CatalogService,
}

impl CartService {
    /// Create a new cart service.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, catalog: CatalogService) -> Self {
        Self {
            inner: Arc::new(CartServiceInner { store, catalog }),
        }
    }

    /// Add `quantity` units of a product to the user's cart.
    ///
    /// Creates the user record on first use (empty cart, signup timestamp).
    /// Adding a product already in the cart accumulates the quantities.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails, the stored record is corrupt, or
    /// the write keeps losing revision races.
    #[instrument(skip(self, user), fields(user_id = %user.id, product_id = %product_id, quantity))]
    pub async fn add_to_cart(
        &self,
        user: &CurrentUser,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), CartError> {
        self.ensure_user_record(user).await?;
        self.update_cart(user, |cart| {
            cart.add(product_id.clone(), quantity);
            true
        })
        .await
    }

    /// Remove a product line from the user's cart.
    ///
    /// Removing a product that is not in the cart is a no-op: the stored
    /// record is left untouched and no write is issued.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails, the stored record is corrupt, or
    /// the write keeps losing revision races.
    #[instrument(skip(self, user), fields(user_id = %user.id, product_id = %product_id))]
    pub async fn remove_from_cart(
        &self,
        user: &CurrentUser,
        product_id: &ProductId,
    ) -> Result<(), CartError> {
        self.update_cart(user, |cart| cart.remove(product_id)).await
    }

    /// Load the user's cart joined against the catalog.
    ///
    /// A user with no record yet has an empty cart. Entries whose product no
    /// longer exists are skipped and contribute nothing to the total.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the stored record is corrupt.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn load_cart(&self, user: &CurrentUser) -> Result<CartContents, CartError> {
        let document = self
            .inner
            .store
            .get(collections::USERS, user.id.as_str())
            .await?;
        let Some(document) = document else {
            return Ok(CartContents::default());
        };

        let record = decode_record(&user.id, &document)?;

        let mut lines = Vec::with_capacity(record.cart.len());
        let mut total = Price::ZERO;
        for (product_id, entry) in &record.cart {
            let Some(product) = self.inner.catalog.get_product(product_id).await? else {
                warn!(
                    product_id = %product_id,
                    "cart references a product that no longer exists, skipping line"
                );
                continue;
            };
            let subtotal = product.price.times(entry.quantity);
            total = total + subtotal;
            lines.push(CartLine {
                product,
                quantity: entry.quantity,
                subtotal,
            });
        }

        Ok(CartContents { lines, total })
    }

    /// Clear the user's cart after a confirmed checkout.
    ///
    /// The clear is unconditional (no revision guard): the user confirmed
    /// "everything currently in the cart", so a concurrent add losing to
    /// the clear is acceptable.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails. On error the stored cart
    /// is untouched.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn checkout_cart(&self, user: &CurrentUser) -> Result<(), CartError> {
        let result = self
            .inner
            .store
            .merge(
                collections::USERS,
                user.id.as_str(),
                &json!({ "cart": {} }),
                None,
            )
            .await;

        match result {
            Ok(_) => Ok(()),
            // No record means the user never put anything in the cart.
            Err(StoreError::NotFound) => Ok(()),
            Err(error) => Err(error.into()),
        }
    }

    /// Create the user's record if it does not exist yet.
    ///
    /// A single atomic create-if-absent: when two requests race, the loser's
    /// default body is discarded by the store and the winner's record stands.
    /// Called lazily before the first cart write, and eagerly (best-effort)
    /// at registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the store request fails.
    pub async fn ensure_user_record(&self, user: &CurrentUser) -> Result<(), CartError> {
        let record = UserRecord::new(user.email.clone(), user.display_name.clone());
        let fields = serde_json::to_value(&record).map_err(StoreError::from)?;

        let outcome = self
            .inner
            .store
            .create(collections::USERS, user.id.as_str(), &fields)
            .await?;
        if outcome == CreateOutcome::Created {
            debug!(user_id = %user.id, "created user record");
        }
        Ok(())
    }

    /// Read-modify-write the stored cart under a revision guard.
    ///
    /// `apply` mutates the decoded cart and reports whether anything changed;
    /// an unchanged cart skips the write entirely. A lost race rereads and
    /// reapplies, at most [`MAX_WRITE_ATTEMPTS`] times.
    async fn update_cart<F>(&self, user: &CurrentUser, mut apply: F) -> Result<(), CartError>
    where
        F: FnMut(&mut Cart) -> bool,
    {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let document = self
                .inner
                .store
                .get(collections::USERS, user.id.as_str())
                .await?;
            let Some(document) = document else {
                // No record, so nothing to change.
                return Ok(());
            };

            let mut record = decode_record(&user.id, &document)?;
            if !apply(&mut record.cart) {
                debug!(user_id = %user.id, "cart unchanged, skipping write");
                return Ok(());
            }

            let result = self
                .inner
                .store
                .merge(
                    collections::USERS,
                    user.id.as_str(),
                    &json!({ "cart": record.cart }),
                    Some(&document.revision),
                )
                .await;

            match result {
                Ok(_) => return Ok(()),
                Err(StoreError::RevisionMismatch) => {
                    debug!(
                        user_id = %user.id,
                        attempt,
                        "cart write lost a revision race, retrying"
                    );
                }
                Err(error) => return Err(error.into()),
            }
        }

        Err(CartError::Contention)
    }
}

fn decode_record(user_id: &UserId, document: &Document) -> Result<UserRecord, CartError> {
    serde_json::from_value(document.fields.clone()).map_err(|source| CartError::Corrupt {
        user_id: user_id.clone(),
        source,
    })
}
