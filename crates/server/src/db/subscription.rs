//! Live query subscriptions.
//!
//! A subscription owns a background task that runs its query once, then
//! re-runs it after every committed write to the queried collection and
//! publishes the decoded result. Dropping the [`Subscription`] (or calling
//! [`Subscription::cancel`]) stops the task.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use super::{DocumentDb, decode_all};
use super::query::Query;

/// A live view of the documents matching a query.
pub struct Subscription<T> {
    rx: watch::Receiver<Option<Vec<T>>>,
    task: JoinHandle<()>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Subscription<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub(crate) fn spawn(db: DocumentDb, query: Query) -> Self {
        let (tx, rx) = watch::channel(None);
        // Register for changes before the first read so no write is missed
        let changes = db.changes();
        let task = tokio::spawn(run(db, query, changes, tx));

        Self {
            rx,
            task,
            _marker: PhantomData,
        }
    }

    /// Wait for the next snapshot.
    ///
    /// The first call resolves with the initial result. Returns `None` once
    /// the subscription has stopped.
    pub async fn changed(&mut self) -> Option<Vec<T>> {
        self.rx.changed().await.ok()?;
        self.rx.borrow_and_update().clone()
    }

    /// The latest snapshot, or `None` before the first read completes.
    #[must_use]
    pub fn current(&self) -> Option<Vec<T>> {
        self.rx.borrow().clone()
    }

    /// Stop the subscription.
    pub fn cancel(self) {
        drop(self);
    }

    /// Returns `true` once the background task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run<T>(
    db: DocumentDb,
    query: Query,
    mut changes: broadcast::Receiver<super::Change>,
    tx: watch::Sender<Option<Vec<T>>>,
) where
    T: DeserializeOwned + Send + Sync + 'static,
{
    loop {
        match db.query(&query).await {
            Ok(docs) => {
                let decoded: Vec<T> = decode_all(query.collection_name(), &docs);
                if tx.send(Some(decoded)).is_err() {
                    return;
                }
            }
            Err(e) => {
                // Keep the last snapshot; the next change triggers a retry
                tracing::warn!(
                    collection = query.collection_name(),
                    error = %e,
                    "Subscription query failed"
                );
            }
        }

        loop {
            match changes.recv().await {
                Ok(change) if change.collection == query.collection_name() => break,
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Subscription lagged, re-querying");
                    break;
                }
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use serde::Deserialize;

    use super::*;
    use crate::db::WriteFields;
    use crate::db::query::Direction;

    #[derive(Debug, Clone, Deserialize, PartialEq)]
    struct Named {
        id: String,
        name: String,
    }

    async fn next<T>(sub: &mut Subscription<T>) -> Vec<T>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        tokio::time::timeout(Duration::from_secs(2), sub.changed())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_initial_snapshot_then_updates() {
        let db = DocumentDb::in_memory();
        db.add("stores", WriteFields::new().set("name", "A"))
            .await
            .unwrap();

        let query = Query::collection("stores").order_by("name", Direction::Ascending);
        let mut sub = db.subscribe::<Named>(query);

        let first = next(&mut sub).await;
        assert_eq!(first.len(), 1);

        db.add("stores", WriteFields::new().set("name", "B"))
            .await
            .unwrap();
        let second = next(&mut sub).await;
        let names: Vec<_> = second.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(sub.current().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_other_collections_do_not_wake() {
        let db = DocumentDb::in_memory();
        let mut sub = db.subscribe::<Named>(Query::collection("stores"));
        assert!(next(&mut sub).await.is_empty());

        db.add("ratings", WriteFields::new().set("name", "x"))
            .await
            .unwrap();
        let woke = tokio::time::timeout(Duration::from_millis(100), sub.changed()).await;
        assert!(woke.is_err());
    }

    #[tokio::test]
    async fn test_undecodable_documents_are_skipped() {
        let db = DocumentDb::in_memory();
        db.add("stores", WriteFields::new().set("name", "ok"))
            .await
            .unwrap();
        db.add("stores", WriteFields::new().set("name", 42))
            .await
            .unwrap();

        let mut sub = db.subscribe::<Named>(Query::collection("stores"));
        let snapshot = next(&mut sub).await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.first().unwrap().name, "ok");
    }

    #[tokio::test]
    async fn test_drop_stops_task() {
        let db = DocumentDb::in_memory();
        let mut sub = db.subscribe::<Named>(Query::collection("stores"));
        next(&mut sub).await;

        let rx = sub.rx.clone();
        sub.cancel();
        // The sender is dropped with the aborted task
        tokio::time::timeout(Duration::from_secs(2), async {
            let mut rx = rx;
            while rx.changed().await.is_ok() {}
        })
        .await
        .unwrap();
    }
}
