//! Rating repository.
//!
//! All ratings live in the flat `ratings` collection and point at their
//! store through `storeId`. Account deletion removes them through
//! [`RatingRepository::delete_owned_by`].

use std::collections::HashMap;

use scout_core::{Owner, PrincipalId, RatingId, StoreId};

use super::stores::StoreRepository;
use super::{
    Direction, DocumentDb, Query, RepositoryError, Subscription, WriteBatch, WriteFields, decode,
    decode_all,
};
use crate::models::{NewRating, Rating, RatingAverage, RatingPatch};

/// Collection name for ratings.
pub const RATINGS: &str = "ratings";

/// Repository for rating documents.
pub struct RatingRepository<'a> {
    db: &'a DocumentDb,
}

impl<'a> RatingRepository<'a> {
    /// Create a new rating repository.
    #[must_use]
    pub const fn new(db: &'a DocumentDb) -> Self {
        Self { db }
    }

    /// Rate a store as `principal`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the store does not exist, or
    /// `RepositoryError::Backend` if the write fails.
    pub async fn create(
        &self,
        store_id: &StoreId,
        rating: &NewRating,
        principal: Option<&PrincipalId>,
    ) -> Result<RatingId, RepositoryError> {
        if !StoreRepository::new(self.db).exists(store_id).await? {
            return Err(RepositoryError::NotFound);
        }

        let owner = Owner::from_principal(principal);
        let fields = WriteFields::from_serializable(rating)?
            .set("storeId", store_id.as_str())
            .set("userId", owner.as_field_value())
            .server_timestamp("createdAt")
            .server_timestamp("updatedAt");

        let id = self.db.add(RATINGS, fields).await?;
        tracing::debug!(rating_id = %id, store_id = %store_id, "Rating created");
        Ok(RatingId::new(id))
    }

    /// Merge `patch` into a rating and refresh `updatedAt`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the rating does not exist.
    pub async fn update(&self, id: &RatingId, patch: &RatingPatch) -> Result<(), RepositoryError> {
        let fields = WriteFields::from_serializable(patch)?.server_timestamp("updatedAt");
        self.db.update(RATINGS, id.as_str(), fields).await?;
        Ok(())
    }

    /// Get a rating by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the read fails, or
    /// `RepositoryError::DataCorruption` if the document does not decode.
    pub async fn get(&self, id: &RatingId) -> Result<Option<Rating>, RepositoryError> {
        self.db
            .get(RATINGS, id.as_str())
            .await?
            .map(|doc| decode(&doc))
            .transpose()
    }

    /// Ratings of one store, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the query fails. Documents that
    /// do not decode are skipped.
    pub async fn list_for_store(&self, store_id: &StoreId) -> Result<Vec<Rating>, RepositoryError> {
        let docs = self.db.query(&Self::store_query(store_id)).await?;
        Ok(decode_all(RATINGS, &docs))
    }

    /// Live view of one store's ratings, newest first.
    #[must_use]
    pub fn watch_for_store(&self, store_id: &StoreId) -> Subscription<Rating> {
        self.db.subscribe(Self::store_query(store_id))
    }

    /// Live view of every rating.
    #[must_use]
    pub fn watch_all(&self) -> Subscription<Rating> {
        self.db.subscribe(Query::collection(RATINGS))
    }

    /// Average score per store, best first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the query fails. Ratings that
    /// do not decode are left out of the averages.
    pub async fn averages(&self) -> Result<Vec<RatingAverage>, RepositoryError> {
        let docs = self.db.query(&Query::collection(RATINGS)).await?;
        let ratings: Vec<Rating> = decode_all(RATINGS, &docs);
        Ok(average_ratings(&ratings))
    }

    /// Delete every rating owned by `principal` in one atomic batch.
    ///
    /// The query completes before any delete is staged. Returns the number of
    /// ratings removed; zero when the principal owns none.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the query or commit fails. A
    /// failed commit removes nothing.
    pub async fn delete_owned_by(&self, principal: &PrincipalId) -> Result<usize, RepositoryError> {
        let owned = self
            .db
            .query(&Query::collection(RATINGS).where_eq("userId", principal.as_str()))
            .await?;

        let mut batch = WriteBatch::new();
        for doc in &owned {
            batch.delete(RATINGS, doc.id.clone());
        }

        let staged = batch.len();
        let removed = self.db.commit(batch).await?;
        if removed != staged {
            tracing::debug!(staged, removed, "Some ratings were already gone at commit");
        }
        Ok(removed)
    }

    fn store_query(store_id: &StoreId) -> Query {
        Query::collection(RATINGS)
            .where_eq("storeId", store_id.as_str())
            .order_by("createdAt", Direction::Descending)
    }
}

/// Group ratings by store and average their scores.
///
/// Sorted by average descending, then by count descending, then by store id.
#[must_use]
pub fn average_ratings(ratings: &[Rating]) -> Vec<RatingAverage> {
    let mut totals: HashMap<&StoreId, (f64, usize)> = HashMap::new();
    for rating in ratings {
        let entry = totals.entry(&rating.store_id).or_insert((0.0, 0));
        entry.0 += rating.rating.value();
        entry.1 += 1;
    }

    let mut averages: Vec<RatingAverage> = totals
        .into_iter()
        .map(|(store_id, (total, count))| {
            #[allow(clippy::cast_precision_loss)] // Rating counts stay far below 2^52
            let average = total / count as f64;
            RatingAverage {
                store_id: store_id.clone(),
                average,
                count,
            }
        })
        .collect();

    averages.sort_by(|a, b| {
        b.average
            .total_cmp(&a.average)
            .then_with(|| b.count.cmp(&a.count))
            .then_with(|| a.store_id.cmp(&b.store_id))
    });
    averages
}
