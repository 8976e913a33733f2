//! Document store client and repositories.
//!
//! # Collections
//!
//! - `stores` - Places that can be rated
//! - `ratings` - One score + review per document, keyed to a store by `storeId`
//! - `users` - Login accounts (email + password hash)
//!
//! Ratings live only in the flat `ratings` collection; there is no per-store
//! nested layout.
//!
//! # Backends
//!
//! [`DocumentDb`] is an explicit handle passed to every repository; there are
//! no process-wide collection references. It runs on either
//! [`MemoryBackend`] (no database configured, tests) or [`PgBackend`]. Every
//! committed write is published on a change feed that drives
//! [`Subscription`]s.

pub mod batch;
pub mod document;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod ratings;
pub mod stores;
pub mod subscription;
pub mod users;

use std::sync::Arc;

use rand::Rng;
use rand::distr::Alphanumeric;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::broadcast;

pub use batch::{MAX_BATCH_WRITES, WriteBatch};
pub use document::{Document, FieldValue, Fields, WriteFields};
pub use memory::MemoryBackend;
pub use postgres::{PgBackend, create_pool};
pub use query::{Direction, Query};
pub use subscription::Subscription;

/// Length of generated document IDs.
const DOCUMENT_ID_LENGTH: usize = 20;

/// Capacity of the change feed before slow subscribers start lagging.
const CHANGE_FEED_CAPACITY: usize = 256;

/// Errors raised by a document backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend could not be reached. Safe to retry.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// A batch staged more writes than a single commit allows.
    #[error("batch of {size} writes exceeds the limit of {max}")]
    BatchTooLarge {
        /// Number of staged writes.
        size: usize,
        /// Maximum allowed writes.
        max: usize,
    },

    /// An update targeted a document that does not exist.
    #[error("document not found: {collection}/{id}")]
    NotFound {
        /// Collection name.
        collection: String,
        /// Document id.
        id: String,
    },

    /// A write payload did not serialize to a JSON object.
    #[error("document data must be a JSON object")]
    NotAnObject,

    /// Database error from sqlx.
    #[error("database error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// Document data could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BackendError {
    /// Returns `true` for failures that may succeed if retried.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Unavailable(_)
                | Self::Postgres(sqlx::Error::PoolTimedOut | sqlx::Error::Io(_))
        )
    }
}

/// Errors that can occur in repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The backend failed.
    #[error("backend error: {0}")]
    Backend(BackendError),

    /// Data in the store is corrupted or does not match the model.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl From<BackendError> for RepositoryError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotFound { .. } => Self::NotFound,
            other => Self::Backend(other),
        }
    }
}

/// Decode a document, reporting mismatches as data corruption.
pub(crate) fn decode<T: DeserializeOwned>(doc: &Document) -> Result<T, RepositoryError> {
    doc.decode().map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid document {}: {e}", doc.id))
    })
}

/// Decode a query result, skipping documents that do not match the model.
///
/// One malformed legacy document must not hide the rest of a listing; each
/// skipped document is logged.
pub(crate) fn decode_all<T: DeserializeOwned>(collection: &str, docs: &[Document]) -> Vec<T> {
    docs.iter()
        .filter_map(|doc| match doc.decode::<T>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(
                    collection,
                    id = %doc.id,
                    error = %e,
                    "Skipping undecodable document"
                );
                None
            }
        })
        .collect()
}

/// Generate a random document id.
#[must_use]
pub fn new_document_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(DOCUMENT_ID_LENGTH)
        .map(char::from)
        .collect()
}

/// A document backend.
#[derive(Clone)]
pub enum Backend {
    Memory(MemoryBackend),
    Postgres(PgBackend),
}

/// A committed write, published to subscribers.
#[derive(Debug, Clone)]
pub struct Change {
    pub collection: String,
    pub ids: Vec<String>,
}

/// Handle to the document store.
///
/// Cheaply cloneable via `Arc`; clones share the backend and change feed.
#[derive(Clone)]
pub struct DocumentDb {
    inner: Arc<DocumentDbInner>,
}

struct DocumentDbInner {
    backend: Backend,
    changes: broadcast::Sender<Change>,
}

impl DocumentDb {
    #[must_use]
    pub fn new(backend: Backend) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            inner: Arc::new(DocumentDbInner { backend, changes }),
        }
    }

    /// A fresh, empty in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Backend::Memory(MemoryBackend::new()))
    }

    #[must_use]
    pub fn backend(&self) -> &Backend {
        &self.inner.backend
    }

    /// The in-memory backend, if that is what this handle runs on.
    #[must_use]
    pub fn memory_backend(&self) -> Option<&MemoryBackend> {
        match &self.inner.backend {
            Backend::Memory(m) => Some(m),
            Backend::Postgres(_) => None,
        }
    }

    /// Check that the backend is reachable.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if it cannot be reached.
    pub async fn ping(&self) -> Result<(), BackendError> {
        match &self.inner.backend {
            Backend::Memory(_) => Ok(()),
            Backend::Postgres(pg) => pg.ping().await,
        }
    }

    /// Read a single document.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the read fails.
    pub async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, BackendError> {
        match &self.inner.backend {
            Backend::Memory(m) => m.get(collection, id).await,
            Backend::Postgres(pg) => pg.get(collection, id).await,
        }
    }

    /// Run a one-shot query.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the query fails.
    pub async fn query(&self, query: &Query) -> Result<Vec<Document>, BackendError> {
        match &self.inner.backend {
            Backend::Memory(m) => m.query(query).await,
            Backend::Postgres(pg) => pg.query(query).await,
        }
    }

    /// Create a document with a backend-assigned id.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the write fails.
    pub async fn add(&self, collection: &str, fields: WriteFields) -> Result<String, BackendError> {
        let id = match &self.inner.backend {
            Backend::Memory(m) => m.insert(collection, fields).await?,
            Backend::Postgres(pg) => pg.insert(collection, fields).await?,
        };
        self.publish(collection, vec![id.clone()]);
        Ok(id)
    }

    /// Merge fields into an existing document.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the document does not exist.
    pub async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: WriteFields,
    ) -> Result<(), BackendError> {
        match &self.inner.backend {
            Backend::Memory(m) => m.update(collection, id, fields).await?,
            Backend::Postgres(pg) => pg.update(collection, id, fields).await?,
        }
        self.publish(collection, vec![id.to_owned()]);
        Ok(())
    }

    /// Commit a batch atomically. Returns the number of documents removed.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::BatchTooLarge` for oversized batches, or the
    /// backend's error if the commit fails. Nothing is applied on error.
    pub async fn commit(&self, batch: WriteBatch) -> Result<usize, BackendError> {
        if batch.is_empty() {
            return Ok(0);
        }
        let removed = match &self.inner.backend {
            Backend::Memory(m) => m.commit(&batch).await?,
            Backend::Postgres(pg) => pg.commit(&batch).await?,
        };
        for collection in batch.collections() {
            let ids = batch
                .deletes()
                .iter()
                .filter(|r| r.collection == collection)
                .map(|r| r.id.clone())
                .collect();
            self.publish(&collection, ids);
        }
        Ok(removed)
    }

    /// Subscribe to the live result of `query`.
    #[must_use]
    pub fn subscribe<T>(&self, query: Query) -> Subscription<T>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        Subscription::spawn(self.clone(), query)
    }

    pub(crate) fn changes(&self) -> broadcast::Receiver<Change> {
        self.inner.changes.subscribe()
    }

    fn publish(&self, collection: &str, ids: Vec<String>) {
        // No receivers is fine
        let _ = self.inner.changes.send(Change {
            collection: collection.to_owned(),
            ids,
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_shape() {
        let id = new_document_id();
        assert_eq!(id.len(), DOCUMENT_ID_LENGTH);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_not_found_maps_to_repository_not_found() {
        let err: RepositoryError = BackendError::NotFound {
            collection: "stores".into(),
            id: "x".into(),
        }
        .into();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[test]
    fn test_transient_classification() {
        assert!(BackendError::Unavailable("down".into()).is_transient());
        assert!(!BackendError::NotAnObject.is_transient());
        assert!(
            !BackendError::BatchTooLarge {
                size: 501,
                max: 500
            }
            .is_transient()
        );
    }

    #[tokio::test]
    async fn test_empty_commit_is_noop() {
        let db = DocumentDb::in_memory();
        let mut changes = db.changes();
        assert_eq!(db.commit(WriteBatch::new()).await.unwrap(), 0);
        assert!(changes.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_writes_publish_changes() {
        let db = DocumentDb::in_memory();
        let mut changes = db.changes();
        let id = db.add("stores", WriteFields::new()).await.unwrap();
        let change = changes.recv().await.unwrap();
        assert_eq!(change.collection, "stores");
        assert_eq!(change.ids, vec![id]);
    }
}
