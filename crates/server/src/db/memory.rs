//! In-process document backend.
//!
//! Used when no database URL is configured and throughout the test suite.
//! All state lives behind one `RwLock`; a batch commit holds the write lock
//! for its whole duration, which makes it atomic with respect to every other
//! read and write.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::RwLock;

use super::batch::{MAX_BATCH_WRITES, WriteBatch};
use super::document::{Document, Fields, WriteFields};
use super::query::Query;
use super::{BackendError, new_document_id};

#[derive(Default)]
struct MemoryState {
    collections: HashMap<String, BTreeMap<String, Fields>>,
    /// Last instant handed out for a server timestamp.
    last_stamp: Option<DateTime<Utc>>,
}

impl MemoryState {
    /// Next commit instant, strictly after every earlier one.
    fn next_stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_stamp {
            Some(last) if now <= last => last + TimeDelta::microseconds(1),
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }
}

/// Injected failures, consumed one per operation.
#[derive(Default)]
struct Faults {
    queries: AtomicU32,
    commits: AtomicU32,
}

impl Faults {
    fn take(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// In-memory document backend.
///
/// Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<RwLock<MemoryState>>,
    faults: Arc<Faults>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` queries fail with `BackendError::Unavailable`.
    pub fn fail_next_queries(&self, n: u32) {
        self.faults.queries.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` batch commits fail with `BackendError::Unavailable`.
    pub fn fail_next_commits(&self, n: u32) {
        self.faults.commits.store(n, Ordering::SeqCst);
    }

    /// Number of documents currently in `collection`.
    pub async fn count(&self, collection: &str) -> usize {
        self.state
            .read()
            .await
            .collections
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    pub(crate) async fn get(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, BackendError> {
        let state = self.state.read().await;
        Ok(state
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|data| Document {
                id: id.to_owned(),
                data: data.clone(),
            }))
    }

    pub(crate) async fn query(&self, query: &Query) -> Result<Vec<Document>, BackendError> {
        if Faults::take(&self.faults.queries) {
            return Err(BackendError::Unavailable("injected query failure".into()));
        }

        let state = self.state.read().await;
        let Some(docs) = state.collections.get(query.collection_name()) else {
            return Ok(Vec::new());
        };

        let candidates = docs.iter().map(|(id, data)| Document {
            id: id.clone(),
            data: data.clone(),
        });
        Ok(query.apply(candidates))
    }

    pub(crate) async fn insert(
        &self,
        collection: &str,
        fields: WriteFields,
    ) -> Result<String, BackendError> {
        let mut state = self.state.write().await;
        let now = state.next_stamp();
        let docs = state.collections.entry(collection.to_owned()).or_default();

        let mut id = new_document_id();
        while docs.contains_key(&id) {
            id = new_document_id();
        }
        docs.insert(id.clone(), fields.resolve(now));
        Ok(id)
    }

    pub(crate) async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: WriteFields,
    ) -> Result<(), BackendError> {
        let mut state = self.state.write().await;
        let now = state.next_stamp();
        let data = state
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| BackendError::NotFound {
                collection: collection.to_owned(),
                id: id.to_owned(),
            })?;
        fields.apply(data, now);
        Ok(())
    }

    pub(crate) async fn commit(&self, batch: &WriteBatch) -> Result<usize, BackendError> {
        if batch.len() > MAX_BATCH_WRITES {
            return Err(BackendError::BatchTooLarge {
                size: batch.len(),
                max: MAX_BATCH_WRITES,
            });
        }

        let mut state = self.state.write().await;
        // Checked under the lock so an injected failure still applies nothing
        if Faults::take(&self.faults.commits) {
            return Err(BackendError::Unavailable("injected commit failure".into()));
        }

        let mut removed = 0;
        for r in batch.deletes() {
            if let Some(docs) = state.collections.get_mut(&r.collection)
                && docs.remove(&r.id).is_some()
            {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
