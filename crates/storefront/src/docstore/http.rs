//! HTTP implementation of the document store contract.
//!
//! Wire mapping:
//!
//! - `GET  {base}/v1/{collection}/{id}` - point read, `404` means absent
//! - `GET  {base}/v1/{collection}` - full collection listing
//! - `PUT  {base}/v1/{collection}/{id}` + `If-None-Match: *` - create-if-absent,
//!   `412` means the key was taken
//! - `PATCH {base}/v1/{collection}/{id}` [+ `If-Match: <revision>`] - field
//!   merge, `412` means the revision moved, `404` means no such document
//!
//! Revision tokens travel in response bodies and go back verbatim in
//! `If-Match`.

use std::sync::Arc;

use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::instrument;

use crate::config::DocstoreConfig;

use super::{CreateOutcome, Document, DocumentStore, Revision, StoreError};

/// Client for the hosted document store API.
///
/// Cheaply cloneable; all clones share one connection pool.
#[derive(Clone)]
pub struct HttpDocumentStore {
    inner: Arc<HttpDocumentStoreInner>,
}

struct HttpDocumentStoreInner {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

/// One document as the store serializes it.
#[derive(Debug, Deserialize)]
struct DocumentWire {
    id: String,
    revision: String,
    fields: serde_json::Value,
}

impl From<DocumentWire> for Document {
    fn from(wire: DocumentWire) -> Self {
        Self {
            id: wire.id,
            revision: Revision::new(wire.revision),
            fields: wire.fields,
        }
    }
}

/// Body of a collection listing.
#[derive(Debug, Deserialize)]
struct ListResponse {
    documents: Vec<DocumentWire>,
}

/// Body of a successful write (create or merge).
#[derive(Debug, Deserialize)]
struct WriteResponse {
    revision: String,
}

impl HttpDocumentStore {
    /// Create a new document store client.
    #[must_use]
    pub fn new(config: &DocstoreConfig) -> Self {
        let endpoint = config.api_url.as_str().trim_end_matches('/').to_string();

        Self {
            inner: Arc::new(HttpDocumentStoreInner {
                client: reqwest::Client::new(),
                endpoint,
                api_key: config.api_key.expose_secret().to_string(),
            }),
        }
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!("{}/v1/{collection}/{id}", self.inner.endpoint)
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/v1/{collection}", self.inner.endpoint)
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.inner
            .client
            .request(method, url)
            .bearer_auth(&self.inner.api_key)
    }

    /// Turn a non-success response into `StoreError::Status`, keeping an
    /// excerpt of the body for diagnostics.
    async fn status_error(response: reqwest::Response) -> StoreError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message: String = body.chars().take(200).collect();
        tracing::error!(status, body = %message, "document store returned non-success status");
        StoreError::Status { status, message }
    }
}

#[async_trait::async_trait]
impl DocumentStore for HttpDocumentStore {
    #[instrument(skip(self), fields(collection = %collection, id = %id))]
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let response = self
            .request(reqwest::Method::GET, self.document_url(collection, id))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let wire: DocumentWire = serde_json::from_str(&response.text().await?)?;
        Ok(Some(wire.into()))
    }

    #[instrument(skip(self), fields(collection = %collection))]
    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let response = self
            .request(reqwest::Method::GET, self.collection_url(collection))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let wire: ListResponse = serde_json::from_str(&response.text().await?)?;
        Ok(wire.documents.into_iter().map(Document::from).collect())
    }

    #[instrument(skip(self, fields), fields(collection = %collection, id = %id))]
    async fn create(
        &self,
        collection: &str,
        id: &str,
        fields: &serde_json::Value,
    ) -> Result<CreateOutcome, StoreError> {
        let response = self
            .request(reqwest::Method::PUT, self.document_url(collection, id))
            .header("If-None-Match", "*")
            .json(fields)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::PRECONDITION_FAILED {
            return Ok(CreateOutcome::AlreadyExists);
        }
        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        Ok(CreateOutcome::Created)
    }

    #[instrument(skip(self, patch, expected), fields(collection = %collection, id = %id))]
    async fn merge(
        &self,
        collection: &str,
        id: &str,
        patch: &serde_json::Value,
        expected: Option<&Revision>,
    ) -> Result<Revision, StoreError> {
        let mut request = self
            .request(reqwest::Method::PATCH, self.document_url(collection, id))
            .json(patch);

        if let Some(revision) = expected {
            request = request.header("If-Match", revision.as_str());
        }

        let response = request.send().await?;

        if response.status() == reqwest::StatusCode::PRECONDITION_FAILED {
            return Err(StoreError::RevisionMismatch);
        }
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound);
        }
        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let wire: WriteResponse = serde_json::from_str(&response.text().await?)?;
        Ok(Revision::new(wire.revision))
    }
}
