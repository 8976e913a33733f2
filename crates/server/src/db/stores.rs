//! Store repository.
//!
//! Creates stamp the owner and both timestamps; updates stamp `updatedAt`
//! only. Neither accepts an id, owner or timestamp from the caller.

use scout_core::{Owner, PrincipalId, StoreId};

use super::{DocumentDb, Query, RepositoryError, Subscription, WriteFields, decode, decode_all};
use crate::models::{NewStore, Store, StorePatch};

/// Collection name for stores.
pub const STORES: &str = "stores";

/// Repository for store documents.
pub struct StoreRepository<'a> {
    db: &'a DocumentDb,
}

impl<'a> StoreRepository<'a> {
    /// Create a new store repository.
    #[must_use]
    pub const fn new(db: &'a DocumentDb) -> Self {
        Self { db }
    }

    /// Create a store owned by `principal`.
    ///
    /// Without a principal the owner is recorded as [`Owner::Unset`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the write fails.
    pub async fn create(
        &self,
        store: &NewStore,
        principal: Option<&PrincipalId>,
    ) -> Result<StoreId, RepositoryError> {
        let owner = Owner::from_principal(principal);
        let fields = WriteFields::from_serializable(store)?
            .set("userId", owner.as_field_value())
            .server_timestamp("createdAt")
            .server_timestamp("updatedAt");

        let id = self.db.add(STORES, fields).await?;
        tracing::debug!(store_id = %id, owned = owner.principal().is_some(), "Store created");
        Ok(StoreId::new(id))
    }

    /// Merge `patch` into a store and refresh `updatedAt`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the store does not exist.
    pub async fn update(&self, id: &StoreId, patch: &StorePatch) -> Result<(), RepositoryError> {
        let fields = WriteFields::from_serializable(patch)?.server_timestamp("updatedAt");
        self.db.update(STORES, id.as_str(), fields).await?;
        Ok(())
    }

    /// Get a store by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the read fails, or
    /// `RepositoryError::DataCorruption` if the document does not decode.
    pub async fn get(&self, id: &StoreId) -> Result<Option<Store>, RepositoryError> {
        self.db
            .get(STORES, id.as_str())
            .await?
            .map(|doc| decode(&doc))
            .transpose()
    }

    /// Returns `true` if a store with this id exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the read fails.
    pub async fn exists(&self, id: &StoreId) -> Result<bool, RepositoryError> {
        Ok(self.db.get(STORES, id.as_str()).await?.is_some())
    }

    /// List all stores by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the query fails. Documents that
    /// do not decode are skipped.
    pub async fn list(&self) -> Result<Vec<Store>, RepositoryError> {
        let docs = self.db.query(&Self::all_query()).await?;
        Ok(decode_all(STORES, &docs))
    }

    /// Live view of all stores, by name.
    #[must_use]
    pub fn watch_all(&self) -> Subscription<Store> {
        self.db.subscribe(Self::all_query())
    }

    /// Live view of one store. The snapshot is empty while it does not exist.
    #[must_use]
    pub fn watch(&self, id: &StoreId) -> Subscription<Store> {
        self.db.subscribe(Query::document(STORES, id.as_str()))
    }

    fn all_query() -> Query {
        Query::collection(STORES).order_by("name", super::Direction::Ascending)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use scout_core::GeoPoint;

    use super::*;

    fn new_store(name: &str) -> NewStore {
        NewStore {
            name: name.to_owned(),
            address: "Hauptstr. 1".to_owned(),
            location: GeoPoint::new(52.52, 13.40).unwrap(),
            converted_from_existing: None,
        }
    }

    #[tokio::test]
    async fn test_create_stamps_owner_and_timestamps() {
        let db = DocumentDb::in_memory();
        let repo = StoreRepository::new(&db);
        let alice = PrincipalId::parse("alice").unwrap();

        let id = repo
            .create(&new_store("Burger Bude"), Some(&alice))
            .await
            .unwrap();
        let store = repo.get(&id).await.unwrap().unwrap();

        assert_eq!(store.owner, Owner::Owned(alice));
        assert_eq!(store.created_at, store.updated_at);
        assert_eq!(store.name, "Burger Bude");
    }

    #[tokio::test]
    async fn test_create_without_principal_records_unset() {
        let db = DocumentDb::in_memory();
        let repo = StoreRepository::new(&db);

        let id = repo.create(&new_store("Anon"), None).await.unwrap();
        let raw = db.get(STORES, id.as_str()).await.unwrap().unwrap();

        assert_eq!(raw.field("userId").and_then(|v| v.as_str()), Some("unset"));
        assert_eq!(repo.get(&id).await.unwrap().unwrap().owner, Owner::Unset);
    }

    #[tokio::test]
    async fn test_partial_update_keeps_owner_and_created_at() {
        let db = DocumentDb::in_memory();
        let repo = StoreRepository::new(&db);
        let alice = PrincipalId::parse("alice").unwrap();
        let id = repo
            .create(&new_store("Old Name"), Some(&alice))
            .await
            .unwrap();
        let before = repo.get(&id).await.unwrap().unwrap();

        repo.update(
            &id,
            &StorePatch {
                name: Some("New Name".into()),
                ..StorePatch::default()
            },
        )
        .await
        .unwrap();
        let after = repo.get(&id).await.unwrap().unwrap();

        assert_eq!(after.name, "New Name");
        assert_eq!(after.address, before.address);
        assert_eq!(after.location, before.location);
        assert_eq!(after.owner, before.owner);
        assert_eq!(after.created_at, before.created_at);
        assert!(after.updated_at > before.updated_at);
    }

    #[tokio::test]
    async fn test_update_missing_store() {
        let db = DocumentDb::in_memory();
        let repo = StoreRepository::new(&db);
        let err = repo
            .update(
                &StoreId::new("missing"),
                &StorePatch {
                    name: Some("x".into()),
                    ..StorePatch::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_list_orders_by_name() {
        let db = DocumentDb::in_memory();
        let repo = StoreRepository::new(&db);
        repo.create(&new_store("Zur Linde"), None).await.unwrap();
        repo.create(&new_store("Alte Post"), None).await.unwrap();

        let names: Vec<_> = repo
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Alte Post", "Zur Linde"]);
    }

    #[tokio::test]
    async fn test_list_skips_undecodable_store() {
        let db = DocumentDb::in_memory();
        let repo = StoreRepository::new(&db);
        repo.create(&new_store("Valid"), None).await.unwrap();
        db.add(
            STORES,
            WriteFields::new()
                .set("name", "No location")
                .set("address", "Nowhere"),
        )
        .await
        .unwrap();

        let stores = repo.list().await.unwrap();
        assert_eq!(stores.len(), 1);
        assert_eq!(stores.first().unwrap().name, "Valid");
    }

    #[tokio::test]
    async fn test_watch_single_store_follows_updates() {
        let db = DocumentDb::in_memory();
        let repo = StoreRepository::new(&db);
        let id = repo.create(&new_store("Before"), None).await.unwrap();

        let mut sub = repo.watch(&id);
        let first = tokio::time::timeout(Duration::from_secs(2), sub.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.first().unwrap().name, "Before");

        repo.update(
            &id,
            &StorePatch {
                name: Some("After".into()),
                ..StorePatch::default()
            },
        )
        .await
        .unwrap();
        let second = tokio::time::timeout(Duration::from_secs(2), sub.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.first().unwrap().name, "After");
    }
}
