//! User management commands.
//!
//! # Environment Variables
//!
//! - `SCOUT_DATABASE_URL` - `PostgreSQL` connection string (fallback:
//!   `DATABASE_URL`)
//! - `ACCOUNT_DELETE_MAX_ATTEMPTS` - Attempts for `delete-data` on transient
//!   failures, shared with the server (default: 3)

use scout_core::Email;
use scout_server::config::{ConfigError, ServerConfig};
use scout_server::db::users::UserRepository;
use scout_server::db::{Backend, DocumentDb, PgBackend, RepositoryError};
use scout_server::services::account::{AccountError, AccountService};
use scout_server::services::auth::{AuthError, AuthService};
use thiserror::Error;

use super::{CommandError, database_url};

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Account(#[from] AccountError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("No user with email: {0}")]
    UnknownUser(String),
}

async fn connect() -> Result<DocumentDb, UserError> {
    let url = database_url()?;
    tracing::info!("Connecting to database...");
    let pool = scout_server::db::create_pool(&url)
        .await
        .map_err(CommandError::from)?;
    Ok(DocumentDb::new(Backend::Postgres(PgBackend::new(pool))))
}

/// Create a new login. Returns the new principal id.
pub async fn create(email: &str, password: &str) -> Result<String, UserError> {
    let db = connect().await?;

    let user = AuthService::new(&db)
        .register_with_password(email, password)
        .await?;

    tracing::info!("User created successfully! ID: {}, Email: {}", user.id, user.email);
    Ok(user.id.to_string())
}

/// Delete every rating owned by the user with `email`.
pub async fn delete_data(email: &str) -> Result<usize, UserError> {
    let email = Email::parse(email).map_err(|_| UserError::InvalidEmail(email.to_owned()))?;
    let max_attempts = delete_max_attempts()?;
    let db = connect().await?;

    let user = UserRepository::new(&db)
        .get_by_email(&email)
        .await?
        .ok_or_else(|| UserError::UnknownUser(email.to_string()))?;

    let removed = AccountService::new(&db, max_attempts)
        .delete_user_data(Some(&user.id))
        .await?;

    tracing::info!("Deleted {} ratings for {}", removed, email);
    Ok(removed)
}

/// Retry budget for `delete-data`, read the same way the server reads it.
fn delete_max_attempts() -> Result<u32, UserError> {
    Ok(ServerConfig::from_env()?.delete_max_attempts)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    #[allow(unsafe_code)]
    fn test_delete_attempts_follow_server_setting() {
        // SAFETY: the only test in this crate that touches the environment
        unsafe { std::env::set_var("ACCOUNT_DELETE_MAX_ATTEMPTS", "7") };
        assert_eq!(delete_max_attempts().unwrap(), 7);

        unsafe { std::env::set_var("ACCOUNT_DELETE_MAX_ATTEMPTS", "0") };
        assert!(matches!(delete_max_attempts(), Err(UserError::Config(_))));

        unsafe { std::env::remove_var("ACCOUNT_DELETE_MAX_ATTEMPTS") };
    }
}
