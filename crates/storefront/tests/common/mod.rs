//! Shared fixtures for the integration tests: in-memory stand-ins for the
//! two hosted services plus helpers to assemble a routable app around them.

// Not every test binary uses every fixture.
#![allow(dead_code)]

pub mod identity;
pub mod store;

pub use identity::InMemoryIdentity;
pub use store::InMemoryStore;

use std::sync::Arc;

use axum::Router;
use secrecy::SecretString;
use serde_json::json;
use url::Url;

use urban_threads_core::{Email, UserId};
use urban_threads_storefront::config::{DocstoreConfig, IdentityConfig, StorefrontConfig};
use urban_threads_storefront::middleware::create_session_layer;
use urban_threads_storefront::models::CurrentUser;
use urban_threads_storefront::routes;
use urban_threads_storefront::state::AppState;

/// A configuration that never leaves the process.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        host: "127.0.0.1".parse().expect("loopback"),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        identity: IdentityConfig {
            api_url: Url::parse("https://identity.test/").expect("url"),
            api_key: SecretString::from("test-identity-key"),
            oauth_client_id: "storefront-test".to_string(),
            oauth_client_secret: SecretString::from("test-oauth-secret"),
        },
        docstore: DocstoreConfig {
            api_url: Url::parse("https://docstore.test/").expect("url"),
            api_key: SecretString::from("test-docstore-key"),
        },
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 1.0,
    }
}

/// The signed-in user the service-level tests act as.
#[must_use]
pub fn test_user() -> CurrentUser {
    CurrentUser {
        id: UserId::from("user-1"),
        email: Email::parse("jo@example.com").expect("valid email"),
        display_name: None,
    }
}

/// Seed one product document with the standard catalog fields.
pub fn seed_product(store: &InMemoryStore, id: &str, name: &str, price: f64) {
    store.seed(
        "products",
        id,
        json!({
            "name": name,
            "description": format!("{name} in heavyweight cotton"),
            "price": price,
            "imageURL": format!("https://cdn.urbanthreads.test/{id}.jpg"),
        }),
    );
}

/// Assemble the full route tree over in-memory services, with the session
/// layer applied the way `main` applies it.
#[must_use]
pub fn test_app(store: Arc<InMemoryStore>, identity: Arc<InMemoryIdentity>) -> Router {
    let config = test_config();
    let session_layer = create_session_layer(&config);
    let state = AppState::new(config, store, identity);

    Router::new()
        .merge(routes::routes())
        .layer(session_layer)
        .with_state(state)
}
