//! Storage backend selection and service wiring.
//!
//! The backend is chosen once from [`Config::storage`]; everything downstream
//! only sees `Arc<dyn UrlStorage>`.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::application::services::UrlService;
use crate::config::{Config, StorageKind};
use crate::domain::repositories::UrlStorage;
use crate::infrastructure::persistence::{
    FileUrlStorage, MemoryUrlStorage, PgUrlStorage, connect_pool,
};

/// Opens the storage backend selected by `config`.
///
/// # Errors
///
/// Returns an error if the backend parameter is missing, the journal cannot
/// be replayed, or the database is unreachable.
pub async fn open_storage(config: &Config) -> Result<Arc<dyn UrlStorage>> {
    let storage: Arc<dyn UrlStorage> = match config.storage {
        StorageKind::Memory => {
            tracing::info!("Using in-memory storage");
            Arc::new(MemoryUrlStorage::new())
        }
        StorageKind::File => {
            let path = config
                .file_storage_path
                .as_deref()
                .context("FILE_STORAGE_PATH must be set for file storage")?;

            let storage = FileUrlStorage::open(path)
                .await
                .with_context(|| format!("Failed to open journal '{}'", path))?;
            tracing::info!("Using journal storage at {}", storage.path().display());
            Arc::new(storage)
        }
        StorageKind::Postgres => {
            let settings = config
                .pg_settings()
                .context("DATABASE_DSN must be set for postgres storage")?;

            let pool = connect_pool(&settings)
                .await
                .context("Failed to initialize database")?;
            tracing::info!("Using PostgreSQL storage");
            Arc::new(PgUrlStorage::new(Arc::new(pool)))
        }
    };

    Ok(storage)
}

/// Builds a [`UrlService`] over `storage` using the configured base URL and
/// deletion settings.
pub fn build_service(config: &Config, storage: Arc<dyn UrlStorage>) -> UrlService<dyn UrlStorage> {
    UrlService::new(
        storage,
        config.base_url.clone(),
        config.batch_size,
        config.delete_timeout(),
    )
}
