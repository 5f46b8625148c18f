//! PostgreSQL connection pool bootstrap.

use serde_json::json;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{info, warn};

use crate::error::AppError;

/// Connection pool settings.
#[derive(Debug, Clone)]
pub struct PgSettings {
    pub database_url: String,
    pub max_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
    /// Extra connection attempts after the first one fails.
    pub connect_retries: usize,
}

impl PgSettings {
    /// Settings with library defaults for the given connection string.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: 10,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
            connect_retries: 3,
        }
    }
}

/// Connects to PostgreSQL and applies the embedded migrations.
///
/// Failed connection attempts are retried with jittered exponential backoff.
///
/// # Errors
///
/// Returns [`AppError::Storage`] if no connection could be established or
/// the migrations fail.
pub async fn connect_pool(settings: &PgSettings) -> Result<PgPool, AppError> {
    let strategy = ExponentialBackoff::from_millis(100)
        .max_delay(Duration::from_secs(5))
        .map(jitter)
        .take(settings.connect_retries);

    let pool = Retry::start(strategy, || async {
        PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.connect_timeout)
            .idle_timeout(settings.idle_timeout)
            .max_lifetime(settings.max_lifetime)
            .connect(&settings.database_url)
            .await
            .inspect_err(|e| warn!("Database connection attempt failed: {}", e))
    })
    .await
    .map_err(|e| {
        AppError::storage_with(
            "Failed to connect to database",
            json!({ "attempts": settings.connect_retries + 1 }),
            e,
        )
    })?;
    info!("Connected to database");

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database schema is up to date");

    Ok(pool)
}
