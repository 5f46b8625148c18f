//! PostgreSQL storage backend.

use async_trait::async_trait;
use serde_json::json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

use crate::domain::entities::UrlRecord;
use crate::domain::repositories::UrlStorage;
use crate::error::AppError;
use crate::utils::db_error::is_unique_violation_on_short_url;

/// Rows per multi-row INSERT, keeping bind parameters well under the
/// protocol limit of 65535.
const INSERT_CHUNK: usize = 1000;

/// PostgreSQL repository for short URL records.
///
/// The unique constraint on `short_url` decides collisions; the pool
/// provides the only concurrency control needed on the client side.
pub struct PgUrlStorage {
    pool: Arc<PgPool>,
}

#[derive(Debug, FromRow)]
struct UrlRow {
    short_url: String,
    original_url: String,
    user_id: String,
    is_deleted: Option<bool>,
}

impl From<UrlRow> for UrlRecord {
    fn from(row: UrlRow) -> Self {
        Self {
            id: row.short_url,
            original_url: row.original_url,
            owner_id: row.user_id,
            deleted: row.is_deleted.unwrap_or(false),
        }
    }
}

impl PgUrlStorage {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    async fn find_many(&self, ids: &[String]) -> Result<HashMap<String, UrlRecord>, AppError> {
        let rows: Vec<UrlRow> = sqlx::query_as(
            r#"
            SELECT short_url, original_url, user_id, is_deleted
            FROM urls
            WHERE short_url = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.short_url.clone(), UrlRecord::from(row)))
            .collect())
    }
}

#[async_trait]
impl UrlStorage for PgUrlStorage {
    async fn save(&self, record: UrlRecord) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO urls (user_id, short_url, original_url, is_deleted)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&record.owner_id)
        .bind(&record.id)
        .bind(&record.original_url)
        .bind(record.deleted)
        .execute(self.pool.as_ref())
        .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) if is_unique_violation_on_short_url(&e) => {
                match self.get(&record.id).await? {
                    Some(existing) if existing.is_identical(&record) => Ok(false),
                    _ => Err(AppError::conflict(vec![record.id])),
                }
            }
            Err(e) => Err(AppError::from(e).with_context("save", json!({ "id": record.id }))),
        }
    }

    async fn save_batch(&self, records: Vec<UrlRecord>) -> Result<(), AppError> {
        let mut inserted: HashSet<String> = HashSet::new();

        for (chunk_no, chunk) in records.chunks(INSERT_CHUNK).enumerate() {
            let mut builder: QueryBuilder<Postgres> =
                QueryBuilder::new("INSERT INTO urls (user_id, short_url, original_url, is_deleted) ");
            builder.push_values(chunk, |mut row, record| {
                row.push_bind(record.owner_id.as_str())
                    .push_bind(record.id.as_str())
                    .push_bind(record.original_url.as_str())
                    .push_bind(record.deleted);
            });
            builder.push(" ON CONFLICT (short_url) DO NOTHING RETURNING short_url");

            let ids: Vec<String> = builder
                .build_query_scalar()
                .fetch_all(self.pool.as_ref())
                .await
                .map_err(|e| {
                    let start = chunk_no * INSERT_CHUNK;
                    AppError::from(e).with_context(
                        "save_batch",
                        json!({ "range": format!("{}..{}", start, start + chunk.len()) }),
                    )
                })?;
            inserted.extend(ids);
        }

        // Within one statement the first row for an identifier wins.
        let mut first_seen: HashMap<&str, &UrlRecord> = HashMap::new();
        for record in &records {
            first_seen.entry(record.id.as_str()).or_insert(record);
        }

        let mut rejected_ids: Vec<String> = records
            .iter()
            .filter(|r| !inserted.contains(&r.id))
            .map(|r| r.id.clone())
            .collect();
        rejected_ids.sort();
        rejected_ids.dedup();
        let stored = if rejected_ids.is_empty() {
            HashMap::new()
        } else {
            self.find_many(&rejected_ids).await?
        };

        let mut conflicts: Vec<String> = Vec::new();
        for record in &records {
            let existing = if inserted.contains(&record.id) {
                first_seen.get(record.id.as_str()).copied()
            } else {
                stored.get(&record.id)
            };
            let identical = existing.is_some_and(|existing| existing.is_identical(record));
            if !identical && !conflicts.contains(&record.id) {
                conflicts.push(record.id.clone());
            }
        }

        debug!(
            "Batch of {} records: {} inserted, {} conflicting",
            records.len(),
            inserted.len(),
            conflicts.len()
        );

        if conflicts.is_empty() {
            Ok(())
        } else {
            Err(AppError::conflict(conflicts))
        }
    }

    async fn get(&self, id: &str) -> Result<Option<UrlRecord>, AppError> {
        let row: Option<UrlRow> = sqlx::query_as(
            r#"
            SELECT short_url, original_url, user_id, is_deleted
            FROM urls
            WHERE short_url = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(|e| AppError::from(e).with_context("get", json!({ "id": id })))?;

        Ok(row.map(UrlRecord::from))
    }

    async fn get_user_urls(&self, owner_id: &str) -> Result<Vec<UrlRecord>, AppError> {
        let rows: Vec<UrlRow> = sqlx::query_as(
            r#"
            SELECT short_url, original_url, user_id, is_deleted
            FROM urls
            WHERE user_id = $1
            ORDER BY id
            "#,
        )
        .bind(owner_id)
        .fetch_all(self.pool.as_ref())
        .await
        .map_err(|e| {
            AppError::from(e).with_context("get_user_urls", json!({ "owner_id": owner_id }))
        })?;

        Ok(rows.into_iter().map(UrlRecord::from).collect())
    }

    async fn delete_user_urls(&self, owner_id: &str, ids: &[String]) -> Result<(), AppError> {
        if ids.is_empty() {
            return Ok(());
        }

        let result = sqlx::query(
            r#"
            UPDATE urls
            SET is_deleted = TRUE
            WHERE user_id = $1 AND short_url = ANY($2)
            "#,
        )
        .bind(owner_id)
        .bind(ids)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| {
            AppError::from(e).with_context(
                "delete_user_urls",
                json!({ "owner_id": owner_id, "ids": ids }),
            )
        })?;

        debug!(
            "Marked {} of {} URLs deleted for {}",
            result.rows_affected(),
            ids.len(),
            owner_id
        );
        Ok(())
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await
            .map_err(|e| AppError::from(e).with_context("ping", json!({})))?;
        Ok(())
    }
}
