//! Storage capability set for short URL records.

use crate::domain::entities::UrlRecord;
use crate::error::AppError;
use async_trait::async_trait;

/// Storage interface for short URL records.
///
/// Every backend must be safe to call from any number of concurrent tasks.
/// Records are never physically removed; deletion only sets
/// [`UrlRecord::deleted`], and a deleted record never becomes live again.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::MemoryUrlStorage`] - process memory
/// - [`crate::infrastructure::persistence::FileUrlStorage`] - append-only journal file
/// - [`crate::infrastructure::persistence::PgUrlStorage`] - PostgreSQL table
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UrlStorage: Send + Sync {
    /// Persists a record.
    ///
    /// Saving a record identical to the stored one is a no-op.
    ///
    /// # Returns
    ///
    /// - `Ok(true)` if the record was inserted
    /// - `Ok(false)` if an identical record was already stored
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the identifier already maps to a
    /// different record; the stored record is left unchanged.
    ///
    /// Returns [`AppError::Storage`] on backend failures.
    async fn save(&self, record: UrlRecord) -> Result<bool, AppError>;

    /// Persists several records.
    ///
    /// Non-conflicting records are persisted even when others conflict.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] listing every conflicting identifier.
    ///
    /// Returns [`AppError::Storage`] on backend failures.
    async fn save_batch(&self, records: Vec<UrlRecord>) -> Result<(), AppError>;

    /// Looks up a record by identifier, deleted or not.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(record))` if the identifier exists
    /// - `Ok(None)` if it does not
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Storage`] on backend failures.
    async fn get(&self, id: &str) -> Result<Option<UrlRecord>, AppError>;

    /// Lists every record owned by `owner_id`, including deleted ones.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Storage`] on backend failures.
    async fn get_user_urls(&self, owner_id: &str) -> Result<Vec<UrlRecord>, AppError>;

    /// Marks the given identifiers as deleted.
    ///
    /// Identifiers that do not exist or belong to another owner are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Storage`] on backend failures.
    async fn delete_user_urls(&self, owner_id: &str, ids: &[String]) -> Result<(), AppError>;

    /// Checks that the backend is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Storage`] if the backend cannot serve requests.
    async fn ping(&self) -> Result<(), AppError>;
}
