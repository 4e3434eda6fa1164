//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::docstore::DocumentStore;
use crate::identity::IdentityProvider;
use crate::services::{CartService, CatalogService};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the external service clients and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    identity: Arc<dyn IdentityProvider>,
    catalog: CatalogService,
    cart: CartService,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `store` - Document store client (catalog and user records)
    /// * `identity` - Identity service client
    #[must_use]
    pub fn new(
        config: StorefrontConfig,
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let catalog = CatalogService::new(Arc::clone(&store));
        let cart = CartService::new(store, catalog.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                identity,
                catalog,
                cart,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the identity service client.
    #[must_use]
    pub fn identity(&self) -> &Arc<dyn IdentityProvider> {
        &self.inner.identity
    }

    /// Get a reference to the catalog service.
    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    /// Get a reference to the cart service.
    #[must_use]
    pub fn cart(&self) -> &CartService {
        &self.inner.cart
    }
}
