//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! scout-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `SCOUT_DATABASE_URL` - `PostgreSQL` connection string (fallback:
//!   `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Document store migrations: `crates/server/migrations/`. The session table
//! is created by `tower-sessions-sqlx-store`.

use thiserror::Error;
use tower_sessions_sqlx_store::PostgresStore;

use super::{CommandError, database_url};

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run document store and session migrations.
pub async fn run() -> Result<(), MigrationError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to database...");
    let pool = scout_server::db::create_pool(&database_url).await?;

    tracing::info!("Running document store migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Running session store migrations...");
    PostgresStore::new(pool).migrate().await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
