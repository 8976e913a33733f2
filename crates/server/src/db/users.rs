//! User repository.
//!
//! Accounts are documents in the `users` collection. The document id is the
//! account's principal id; emails are stored normalized and must be unique.

use scout_core::{Email, PrincipalId};

use super::{BackendError, DocumentDb, Query, RepositoryError, WriteFields, decode};
use crate::models::User;

/// Collection name for accounts.
pub const USERS: &str = "users";

/// Repository for account documents.
pub struct UserRepository<'a> {
    db: &'a DocumentDb,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: &'a DocumentDb) -> Self {
        Self { db }
    }

    /// Create an account with a password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already registered.
    pub async fn create_with_password(
        &self,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        if self.get_by_email(email).await?.is_some() {
            return Err(RepositoryError::Conflict(format!(
                "email already registered: {email}"
            )));
        }

        let fields = WriteFields::new()
            .set("email", email.as_str())
            .set("passwordHash", password_hash)
            .server_timestamp("createdAt");

        let id = self.db.add(USERS, fields).await.map_err(|e| match e {
            BackendError::Postgres(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                RepositoryError::Conflict(format!("email already registered: {email}"))
            }
            other => other.into(),
        })?;

        let doc = self
            .db
            .get(USERS, &id)
            .await?
            .ok_or_else(|| RepositoryError::DataCorruption(format!("user {id} vanished")))?;
        decode(&doc)
    }

    /// Get an account by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the query fails, or
    /// `RepositoryError::DataCorruption` if the stored account is invalid.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let docs = self
            .db
            .query(
                &Query::collection(USERS)
                    .where_eq("email", email.as_str())
                    .limit(1),
            )
            .await?;
        docs.first().map(decode).transpose()
    }

    /// Get an account by principal id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the read fails, or
    /// `RepositoryError::DataCorruption` if the stored account is invalid.
    pub async fn get_by_id(&self, id: &PrincipalId) -> Result<Option<User>, RepositoryError> {
        self.db
            .get(USERS, id.as_str())
            .await?
            .map(|doc| decode(&doc))
            .transpose()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_lookup() {
        let db = DocumentDb::in_memory();
        let repo = UserRepository::new(&db);
        let email = Email::parse("Burger@Example.com").unwrap();

        let user = repo.create_with_password(&email, "$argon2id$x").await.unwrap();
        assert_eq!(user.email.as_str(), "burger@example.com");

        let by_email = repo.get_by_email(&email).await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
        let by_id = repo.get_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(by_id.password_hash, "$argon2id$x");
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let db = DocumentDb::in_memory();
        let repo = UserRepository::new(&db);
        let email = Email::parse("a@b.c").unwrap();

        repo.create_with_password(&email, "h").await.unwrap();
        let err = repo.create_with_password(&email, "h").await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_unknown_email() {
        let db = DocumentDb::in_memory();
        let repo = UserRepository::new(&db);
        let email = Email::parse("nobody@example.com").unwrap();
        assert!(repo.get_by_email(&email).await.unwrap().is_none());
    }
}
