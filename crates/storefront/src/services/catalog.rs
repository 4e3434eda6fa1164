//! Product catalog read side.
//!
//! Products live in the `products` collection of the external document store
//! and are maintained by back-office tooling; the storefront only reads them.
//! Listings and point reads are cached with `moka` (5-minute TTL): catalog
//! data changes rarely, and every cart page fans out into one product lookup
//! per line.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, instrument, warn};

use urban_threads_core::ProductId;

use crate::docstore::{DocumentStore, StoreError};
use crate::models::{Product, collections};

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Product(Box<Product>),
    Products(Vec<Product>),
}

/// Read-side facade over the `products` collection.
///
/// Cheap to clone; clones share the HTTP client and the cache.
#[derive(Clone)]
pub struct CatalogService {
    inner: Arc<CatalogServiceInner>,
}

struct CatalogServiceInner {
    store: Arc<dyn DocumentStore>,
    cache: Cache<String, CacheValue>,
}

impl CatalogService {
    /// Create a new catalog service over the given document store.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(CatalogServiceInner { store, cache }),
        }
    }

    /// List every product in the catalog.
    ///
    /// Documents that fail to decode are skipped with a warning rather than
    /// poisoning the whole listing.
    ///
    /// # Errors
    ///
    /// Returns an error if the document store request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let cache_key = "products".to_string();

        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product listing");
            return Ok(products);
        }

        let documents = self.inner.store.list(collections::PRODUCTS).await?;

        let mut products = Vec::with_capacity(documents.len());
        for document in documents {
            match Product::from_fields(ProductId::new(document.id.clone()), document.fields) {
                Ok(product) => products.push(product),
                Err(error) => {
                    warn!(
                        product_id = %document.id,
                        %error,
                        "skipping malformed product document"
                    );
                }
            }
        }

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// Get a single product by ID.
    ///
    /// Returns `None` for a product that is absent *or* malformed - callers
    /// treat both the same way (a cart line pointing at it is skipped).
    ///
    /// # Errors
    ///
    /// Returns an error if the document store request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>, StoreError> {
        let cache_key = format!("product:{product_id}");

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(Some(*product));
        }

        let document = self
            .inner
            .store
            .get(collections::PRODUCTS, product_id.as_str())
            .await?;
        let Some(document) = document else {
            return Ok(None);
        };

        match Product::from_fields(product_id.clone(), document.fields) {
            Ok(product) => {
                self.inner
                    .cache
                    .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
                    .await;
                Ok(Some(product))
            }
            Err(error) => {
                warn!(
                    product_id = %product_id,
                    %error,
                    "treating malformed product document as missing"
                );
                Ok(None)
            }
        }
    }
}
