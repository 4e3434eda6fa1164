//! In-memory document store with the same semantics as the hosted service:
//! create-if-absent, per-document revisions, and field-level merge. On top of
//! that it is instrumented for assertions - tests can count writes, inject
//! revision races, and take the whole store "offline".

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use urban_threads_storefront::docstore::{
    CreateOutcome, Document, DocumentStore, Revision, StoreError,
};

#[derive(Default)]
struct StoreState {
    collections: BTreeMap<String, BTreeMap<String, StoredDocument>>,
    revision_counter: u64,
}

#[derive(Clone)]
struct StoredDocument {
    revision: u64,
    fields: Value,
}

/// Instrumented in-memory [`DocumentStore`].
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
    writes: AtomicU64,
    forced_races: AtomicU32,
    offline: AtomicBool,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a document directly, bypassing the write instrumentation.
    pub fn seed(&self, collection: &str, id: &str, fields: Value) {
        let state = &mut *self.state.lock().expect("store lock");
        state.revision_counter += 1;
        let revision = state.revision_counter;
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), StoredDocument { revision, fields });
    }

    /// Current fields of a document, if present.
    pub fn fields(&self, collection: &str, id: &str) -> Option<Value> {
        let state = self.state.lock().expect("store lock");
        state
            .collections
            .get(collection)?
            .get(id)
            .map(|doc| doc.fields.clone())
    }

    /// Successful writes (creates and merges) issued through the trait.
    /// Seeding does not count.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make the next `count` guarded merges lose their revision check, as if
    /// a concurrent writer touched the document between read and write.
    pub fn force_revision_races(&self, count: u32) {
        self.forced_races.store(count, Ordering::SeqCst);
    }

    /// While set, every call fails with an HTTP 503 status error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Status {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.check_online()?;
        let state = self.state.lock().expect("store lock");
        Ok(state
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|doc| Document {
                id: id.to_string(),
                revision: Revision::new(doc.revision.to_string()),
                fields: doc.fields.clone(),
            }))
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.check_online()?;
        let state = self.state.lock().expect("store lock");
        Ok(state
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, doc)| Document {
                        id: id.clone(),
                        revision: Revision::new(doc.revision.to_string()),
                        fields: doc.fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create(
        &self,
        collection: &str,
        id: &str,
        fields: &Value,
    ) -> Result<CreateOutcome, StoreError> {
        self.check_online()?;
        let state = &mut *self.state.lock().expect("store lock");
        let docs = state.collections.entry(collection.to_string()).or_default();
        if docs.contains_key(id) {
            return Ok(CreateOutcome::AlreadyExists);
        }

        state.revision_counter += 1;
        let revision = state.revision_counter;
        docs.insert(
            id.to_string(),
            StoredDocument {
                revision,
                fields: fields.clone(),
            },
        );
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(CreateOutcome::Created)
    }

    async fn merge(
        &self,
        collection: &str,
        id: &str,
        patch: &Value,
        expected: Option<&Revision>,
    ) -> Result<Revision, StoreError> {
        self.check_online()?;
        let state = &mut *self.state.lock().expect("store lock");

        let StoreState {
            collections,
            revision_counter,
        } = state;
        let Some(doc) = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
        else {
            return Err(StoreError::NotFound);
        };

        // An injected race plays a phantom concurrent writer: the revision
        // moves and the guarded merge sees a mismatch. A retry that re-reads
        // will observe the new revision.
        if expected.is_some() && self.forced_races.load(Ordering::SeqCst) > 0 {
            self.forced_races.fetch_sub(1, Ordering::SeqCst);
            *revision_counter += 1;
            doc.revision = *revision_counter;
            return Err(StoreError::RevisionMismatch);
        }

        if let Some(expected) = expected {
            let current = doc.revision.to_string();
            if expected.as_str() != current {
                return Err(StoreError::RevisionMismatch);
            }
        }

        // Field-level set: each top-level patch field replaces the stored
        // field wholesale.
        if let (Some(target), Some(source)) = (doc.fields.as_object_mut(), patch.as_object()) {
            for (key, value) in source {
                target.insert(key.clone(), value.clone());
            }
        }

        *revision_counter += 1;
        doc.revision = *revision_counter;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(Revision::new(doc.revision.to_string()))
    }
}
