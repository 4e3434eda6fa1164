//! Hosted document store client.
//!
//! # Architecture
//!
//! The document store is the source of truth for the product catalog and the
//! per-user records - the storefront keeps NO local copy and does direct API
//! calls. Access goes through the [`DocumentStore`] trait so services can be
//! exercised against an in-memory store in tests; [`HttpDocumentStore`] is
//! the production implementation.
//!
//! # Concurrency
//!
//! Every stored document carries an opaque [`Revision`] token that changes on
//! each write. [`DocumentStore::merge`] accepts the revision observed at read
//! time and the store rejects the write with [`StoreError::RevisionMismatch`]
//! if the document has moved on, which lets callers run lost-update-free
//! read-modify-write loops. [`DocumentStore::create`] is create-if-absent in
//! one round trip, so "ensure the record exists" never races with itself.

mod http;

pub use http::HttpDocumentStore;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when talking to the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with a non-success status.
    #[error("store returned HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body excerpt.
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A conditional merge lost the race: the document's revision no longer
    /// matches the one observed at read time.
    #[error("document revision changed since read")]
    RevisionMismatch,

    /// The addressed document does not exist.
    #[error("document not found")]
    NotFound,
}

/// Opaque per-document revision token.
///
/// Changes on every write. Callers pass it back verbatim to make a merge
/// conditional; they never inspect its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision(String);

impl Revision {
    /// Wrap a raw revision token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for transmission back to the store.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A document read from the store.
#[derive(Debug, Clone)]
pub struct Document {
    /// Document key within its collection.
    pub id: String,
    /// Revision observed at read time.
    pub revision: Revision,
    /// The document body (always a JSON object for well-formed documents).
    pub fields: serde_json::Value,
}

/// Outcome of a create-if-absent operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The document did not exist and was written.
    Created,
    /// A document with this key already existed; nothing was written.
    AlreadyExists,
}

/// Minimal consumed contract of the hosted document database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Point-read one document. Absence is `Ok(None)`, not an error.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the request fails or the response is
    /// malformed.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Read every document in a collection.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the request fails or the response is
    /// malformed.
    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// Create a document with the given body only if the key is free.
    ///
    /// Atomic on the store side: concurrent creators race safely and exactly
    /// one wins. The loser's default value is discarded and the existing
    /// document is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the request fails; an existing document is
    /// reported via [`CreateOutcome::AlreadyExists`], not an error.
    async fn create(
        &self,
        collection: &str,
        id: &str,
        fields: &serde_json::Value,
    ) -> Result<CreateOutcome, StoreError>;

    /// Merge fields into an existing document.
    ///
    /// Each top-level field in `patch` replaces the stored field wholesale;
    /// stored fields not named in `patch` are left untouched. (This is a
    /// field-level set, not a recursive merge - writing `{"cart": {}}`
    /// empties the cart field.)
    ///
    /// With `expected` set, the write only applies if the document's current
    /// revision matches - the compare-and-swap that read-modify-write loops
    /// rely on. Returns the document's new revision.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the document does not exist and
    /// [`StoreError::RevisionMismatch`] if `expected` is stale.
    async fn merge(
        &self,
        collection: &str,
        id: &str,
        patch: &serde_json::Value,
        expected: Option<&Revision>,
    ) -> Result<Revision, StoreError>;
}
