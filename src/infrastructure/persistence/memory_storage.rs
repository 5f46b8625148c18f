//! In-process storage backend.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use super::{Placement, place, plan_batch, plan_deletion};
use crate::domain::entities::UrlRecord;
use crate::domain::repositories::UrlStorage;
use crate::error::AppError;

/// Storage backed by a map held in process memory.
///
/// The map is guarded by a read/write lock, so lookups run concurrently
/// while writes are exclusive. Nothing survives a restart.
pub struct MemoryUrlStorage {
    records: RwLock<HashMap<String, UrlRecord>>,
}

impl MemoryUrlStorage {
    /// Creates an empty storage.
    pub fn new() -> Self {
        debug!("Using in-memory URL storage");
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryUrlStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UrlStorage for MemoryUrlStorage {
    async fn save(&self, record: UrlRecord) -> Result<bool, AppError> {
        let mut records = self.records.write().await;

        match place(&records, &record) {
            Placement::New => {
                records.insert(record.id.clone(), record);
                Ok(true)
            }
            Placement::Identical => Ok(false),
            Placement::Conflict => Err(AppError::conflict(vec![record.id])),
        }
    }

    async fn save_batch(&self, batch: Vec<UrlRecord>) -> Result<(), AppError> {
        let mut records = self.records.write().await;

        let plan = plan_batch(&records, batch);
        for record in plan.inserts {
            records.insert(record.id.clone(), record);
        }

        if plan.conflicts.is_empty() {
            Ok(())
        } else {
            Err(AppError::conflict(plan.conflicts))
        }
    }

    async fn get(&self, id: &str) -> Result<Option<UrlRecord>, AppError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn get_user_urls(&self, owner_id: &str) -> Result<Vec<UrlRecord>, AppError> {
        let records = self.records.read().await;

        Ok(records
            .values()
            .filter(|r| r.is_owned_by(owner_id))
            .cloned()
            .collect())
    }

    async fn delete_user_urls(&self, owner_id: &str, ids: &[String]) -> Result<(), AppError> {
        let mut records = self.records.write().await;

        for record in plan_deletion(&records, owner_id, ids) {
            records.insert(record.id.clone(), record);
        }

        Ok(())
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}
