//! `PostgreSQL` document backend.
//!
//! Documents live in a single `documents` table keyed by
//! `(collection, id)` with the fields in a `jsonb` column. Server timestamps
//! come from the database clock (`clock_timestamp()`), and `written_at`
//! keeps them strictly increasing per document.
//!
//! # Migrations
//!
//! The schema is in `crates/server/migrations/` and is applied via:
//! ```bash
//! cargo run -p scout-cli -- migrate
//! ```

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use super::batch::{MAX_BATCH_WRITES, WriteBatch};
use super::document::{Document, Fields, WriteFields};
use super::query::Query;
use super::{BackendError, new_document_id};

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Document backend over a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub(crate) async fn ping(&self) -> Result<(), BackendError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub(crate) async fn get(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, BackendError> {
        let row = sqlx::query("SELECT id, data FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| row_to_document(&r)).transpose()
    }

    pub(crate) async fn query(&self, query: &Query) -> Result<Vec<Document>, BackendError> {
        let mut sql =
            QueryBuilder::<Postgres>::new("SELECT id, data FROM documents WHERE collection = ");
        sql.push_bind(query.collection_name());

        if let Some(id) = query.document_id() {
            sql.push(" AND id = ").push_bind(id);
        }
        for filter in query.filters() {
            sql.push(" AND data -> ")
                .push_bind(filter.field.as_str())
                .push(" = ")
                .push_bind(Json(&filter.value));
        }
        match query.ordering() {
            Some((field, direction)) => {
                sql.push(" AND jsonb_exists(data, ")
                    .push_bind(field)
                    .push(") ORDER BY data -> ")
                    .push_bind(field)
                    .push(" ")
                    .push(direction.as_sql())
                    .push(", id ASC");
            }
            None => {
                sql.push(" ORDER BY id ASC");
            }
        }
        if let Some(limit) = query.max_results() {
            sql.push(" LIMIT ")
                .push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        let rows = sql.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_document).collect()
    }

    pub(crate) async fn insert(
        &self,
        collection: &str,
        fields: WriteFields,
    ) -> Result<String, BackendError> {
        let mut tx = self.pool.begin().await?;
        let now: DateTime<Utc> = sqlx::query_scalar("SELECT clock_timestamp()")
            .fetch_one(&mut *tx)
            .await?;

        let id = new_document_id();
        let data = fields.resolve(now);
        sqlx::query(
            "INSERT INTO documents (collection, id, data, written_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(collection)
        .bind(&id)
        .bind(Json(&data))
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(id)
    }

    pub(crate) async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: WriteFields,
    ) -> Result<(), BackendError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT data, written_at, clock_timestamp() AS now FROM documents \
             WHERE collection = $1 AND id = $2 FOR UPDATE",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| BackendError::NotFound {
            collection: collection.to_owned(),
            id: id.to_owned(),
        })?;

        let Json(mut data): Json<Fields> = row.try_get("data")?;
        let written_at: DateTime<Utc> = row.try_get("written_at")?;
        let now: DateTime<Utc> = row.try_get("now")?;
        let stamp = if now <= written_at {
            written_at + TimeDelta::microseconds(1)
        } else {
            now
        };

        fields.apply(&mut data, stamp);
        sqlx::query(
            "UPDATE documents SET data = $3, written_at = $4 WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .bind(Json(&data))
        .bind(stamp)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    pub(crate) async fn commit(&self, batch: &WriteBatch) -> Result<usize, BackendError> {
        if batch.len() > MAX_BATCH_WRITES {
            return Err(BackendError::BatchTooLarge {
                size: batch.len(),
                max: MAX_BATCH_WRITES,
            });
        }

        let mut tx = self.pool.begin().await?;
        let mut removed = 0;
        for collection in batch.collections() {
            let ids: Vec<String> = batch
                .deletes()
                .iter()
                .filter(|r| r.collection == collection)
                .map(|r| r.id.clone())
                .collect();
            let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = ANY($2)")
                .bind(&collection)
                .bind(ids)
                .execute(&mut *tx)
                .await?;
            removed += usize::try_from(result.rows_affected()).unwrap_or(usize::MAX);
        }
        tx.commit().await?;
        Ok(removed)
    }
}

fn row_to_document(row: &sqlx::postgres::PgRow) -> Result<Document, BackendError> {
    let id: String = row.try_get("id")?;
    let Json(data): Json<Fields> = row.try_get("data")?;
    Ok(Document { id, data })
}
