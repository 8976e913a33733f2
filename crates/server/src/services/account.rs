//! Account data deletion.
//!
//! Removes every rating owned by the calling principal in one atomic batch.
//! The principal comes only from the caller's verified session; there is no
//! parameter through which one account could name another.
//!
//! Stores the principal created are left in place, and ratings created
//! without a principal are never attributable to anyone, so neither is
//! touched.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use scout_core::PrincipalId;

use crate::db::ratings::RatingRepository;
use crate::db::{DocumentDb, RepositoryError};

/// Delay before the first retry; grows linearly per attempt.
const RETRY_BACKOFF: Duration = Duration::from_millis(50);

/// Errors from account data deletion.
#[derive(Debug, Error)]
pub enum AccountError {
    /// No verified principal on the call.
    #[error("authentication required")]
    Unauthenticated,

    /// The query or the batch commit failed. Nothing was deleted.
    #[error("failed to delete user data: {0}")]
    Internal(#[source] RepositoryError),
}

/// Acknowledgment returned to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeleteUserDataResponse {
    pub success: bool,
}

/// Account deletion service.
pub struct AccountService<'a> {
    ratings: RatingRepository<'a>,
    max_attempts: u32,
}

impl<'a> AccountService<'a> {
    /// Create the service. `max_attempts` is clamped to at least one.
    #[must_use]
    pub fn new(db: &'a DocumentDb, max_attempts: u32) -> Self {
        Self {
            ratings: RatingRepository::new(db),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Delete all ratings owned by `principal`.
    ///
    /// Transient backend failures are retried up to the configured number of
    /// attempts; each attempt re-runs the ownership query, so a retry after
    /// an unknown commit outcome deletes only what is still there. Returns
    /// the number of ratings removed.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Unauthenticated` without touching the store if
    /// `principal` is `None`, or `AccountError::Internal` if deletion failed.
    pub async fn delete_user_data(
        &self,
        principal: Option<&PrincipalId>,
    ) -> Result<usize, AccountError> {
        let Some(principal) = principal else {
            tracing::warn!("deleteUserData called without a verified principal");
            return Err(AccountError::Unauthenticated);
        };

        let mut attempt = 1;
        loop {
            match self.ratings.delete_owned_by(principal).await {
                Ok(removed) => {
                    tracing::info!(
                        user_id = %principal,
                        removed,
                        attempt,
                        "Deleted user data"
                    );
                    return Ok(removed);
                }
                Err(e) if is_transient(&e) && attempt < self.max_attempts => {
                    tracing::warn!(
                        user_id = %principal,
                        attempt,
                        error = %e,
                        "Transient failure deleting user data, retrying"
                    );
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(
                        user_id = %principal,
                        attempt,
                        error = %e,
                        "Error deleting user data"
                    );
                    return Err(AccountError::Internal(e));
                }
            }
        }
    }
}

fn is_transient(err: &RepositoryError) -> bool {
    matches!(err, RepositoryError::Backend(e) if e.is_transient())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use scout_core::{GeoPoint, Score, StoreId};

    use super::*;
    use crate::db::BackendError;
    use crate::db::ratings::RATINGS;
    use crate::db::stores::StoreRepository;
    use crate::models::{NewRating, NewStore};

    async fn seed(db: &DocumentDb) -> StoreId {
        StoreRepository::new(db)
            .create(
                &NewStore {
                    name: "Imbiss".into(),
                    address: "Markt 3".into(),
                    location: GeoPoint::new(50.0, 8.0).unwrap(),
                    converted_from_existing: None,
                },
                None,
            )
            .await
            .unwrap()
    }

    async fn rate(db: &DocumentDb, store: &StoreId, owner: Option<&PrincipalId>) {
        RatingRepository::new(db)
            .create(
                store,
                &NewRating {
                    rating: Score::new(4.0).unwrap(),
                    review: String::new(),
                    image_url: None,
                },
                owner,
            )
            .await
            .unwrap();
    }

    async fn count(db: &DocumentDb) -> usize {
        db.memory_backend().unwrap().count(RATINGS).await
    }

    #[tokio::test]
    async fn test_without_principal_deletes_nothing() {
        let db = DocumentDb::in_memory();
        let store = seed(&db).await;
        let p = PrincipalId::parse("p").unwrap();
        rate(&db, &store, Some(&p)).await;

        let err = AccountService::new(&db, 3)
            .delete_user_data(None)
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::Unauthenticated));
        assert_eq!(count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_principal_without_ratings_succeeds() {
        let db = DocumentDb::in_memory();
        let store = seed(&db).await;
        let other = PrincipalId::parse("other").unwrap();
        rate(&db, &store, Some(&other)).await;

        let p = PrincipalId::parse("p").unwrap();
        let removed = AccountService::new(&db, 3)
            .delete_user_data(Some(&p))
            .await
            .unwrap();
        assert_eq!(removed, 0);
        assert_eq!(count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_transient_commit_failure_is_retried() {
        let db = DocumentDb::in_memory();
        let store = seed(&db).await;
        let p = PrincipalId::parse("p").unwrap();
        rate(&db, &store, Some(&p)).await;
        rate(&db, &store, Some(&p)).await;

        db.memory_backend().unwrap().fail_next_commits(2);
        let removed = AccountService::new(&db, 3)
            .delete_user_data(Some(&p))
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_exhausted_retries_leave_data_intact() {
        let db = DocumentDb::in_memory();
        let store = seed(&db).await;
        let p = PrincipalId::parse("p").unwrap();
        rate(&db, &store, Some(&p)).await;

        db.memory_backend().unwrap().fail_next_commits(5);
        let err = AccountService::new(&db, 2)
            .delete_user_data(Some(&p))
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::Internal(_)));
        assert_eq!(count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_query_failure_without_retry() {
        let db = DocumentDb::in_memory();
        let store = seed(&db).await;
        let p = PrincipalId::parse("p").unwrap();
        rate(&db, &store, Some(&p)).await;

        db.memory_backend().unwrap().fail_next_queries(1);
        let err = AccountService::new(&db, 1)
            .delete_user_data(Some(&p))
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::Internal(_)));
        assert_eq!(count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_oversized_batch_is_not_retried() {
        let db = DocumentDb::in_memory();
        let store = seed(&db).await;
        let p = PrincipalId::parse("p").unwrap();
        for _ in 0..=crate::db::MAX_BATCH_WRITES {
            rate(&db, &store, Some(&p)).await;
        }

        let err = AccountService::new(&db, 3)
            .delete_user_data(Some(&p))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AccountError::Internal(RepositoryError::Backend(BackendError::BatchTooLarge { .. }))
        ));
        assert_eq!(count(&db).await, crate::db::MAX_BATCH_WRITES + 1);
    }
}
