//! Append-only journal storage backend.
//!
//! Every write appends one JSON line per changed record to the journal file
//! before the in-memory index is updated. On startup the journal is replayed
//! from oldest to newest; a later line for an identifier replaces an earlier
//! one. The file is never compacted.

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{Placement, place, plan_batch, plan_deletion};
use crate::domain::entities::UrlRecord;
use crate::domain::repositories::UrlStorage;
use crate::error::AppError;

/// Storage backed by a JSON-lines journal file.
///
/// The index lock is held across the file append so that the order of lines
/// in the journal always matches the order of index updates.
pub struct FileUrlStorage {
    path: PathBuf,
    index: RwLock<HashMap<String, UrlRecord>>,
}

impl FileUrlStorage {
    /// Opens the journal at `path`, replaying it into memory.
    ///
    /// Missing parent directories and a missing file are created.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Storage`] if the file cannot be created or read,
    /// or if a line other than a torn final line cannot be decoded.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref().to_path_buf();
        let context = json!({ "path": path.display().to_string() });

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::from(e).with_context("open journal", context.clone()))?;
        }

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| AppError::from(e).with_context("open journal", context.clone()))?;

        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| AppError::from(e).with_context("read journal", context))?;

        let replayed = replay(&content)?;
        repair_tail(&path, &content, replayed.torn_at)
            .await
            .map_err(|e| {
                AppError::from(e).with_context(
                    "repair journal",
                    json!({ "path": path.display().to_string() }),
                )
            })?;

        let index = replayed.index;
        info!(
            "Replayed {} journal lines into {} records from {}",
            replayed.applied,
            index.len(),
            path.display()
        );

        Ok(Self {
            path,
            index: RwLock::new(index),
        })
    }

    /// Path of the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one line per record. Callers must hold the index write lock.
    async fn append(&self, records: &[UrlRecord]) -> Result<(), AppError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut buffer = Vec::new();
        for record in records {
            serde_json::to_writer(&mut buffer, record)?;
            buffer.push(b'\n');
        }

        let context = json!({
            "path": self.path.display().to_string(),
            "records": records.len(),
        });

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| AppError::from(e).with_context("append journal", context.clone()))?;

        file.write_all(&buffer)
            .await
            .map_err(|e| AppError::from(e).with_context("append journal", context.clone()))?;
        file.sync_data()
            .await
            .map_err(|e| AppError::from(e).with_context("append journal", context))?;

        debug!("Appended {} journal lines", records.len());
        Ok(())
    }
}

/// Result of replaying journal content.
#[derive(Debug)]
struct Replay {
    index: HashMap<String, UrlRecord>,
    applied: usize,
    /// Byte offset of an incomplete final line that was skipped.
    torn_at: Option<usize>,
}

/// Rebuilds the index from journal content.
fn replay(content: &str) -> Result<Replay, AppError> {
    let mut index = HashMap::new();
    let mut applied = 0;
    let mut torn_at = None;
    let torn_tail_allowed = !content.is_empty() && !content.ends_with('\n');
    let lines: Vec<&str> = content.lines().collect();

    for (number, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<UrlRecord>(line) {
            Ok(record) => {
                index.insert(record.id.clone(), record);
                applied += 1;
            }
            Err(e) if torn_tail_allowed && number + 1 == lines.len() => {
                warn!("Skipping incomplete journal line {}: {}", number + 1, e);
                torn_at = Some(content.rfind('\n').map_or(0, |pos| pos + 1));
            }
            Err(e) => {
                return Err(AppError::storage_with(
                    "Corrupt journal line",
                    json!({ "line": number + 1 }),
                    e,
                ));
            }
        }
    }

    Ok(Replay {
        index,
        applied,
        torn_at,
    })
}

/// Makes the journal end on a line boundary before new lines are appended.
///
/// An incomplete final line is cut off; a complete final line missing its
/// newline gets one.
async fn repair_tail(path: &Path, content: &str, torn_at: Option<usize>) -> std::io::Result<()> {
    if content.is_empty() || content.ends_with('\n') {
        return Ok(());
    }

    let mut file = OpenOptions::new().write(true).append(true).open(path).await?;
    match torn_at {
        Some(offset) => file.set_len(offset as u64).await?,
        None => file.write_all(b"\n").await?,
    }
    file.sync_data().await
}

#[async_trait]
impl UrlStorage for FileUrlStorage {
    async fn save(&self, record: UrlRecord) -> Result<bool, AppError> {
        let mut index = self.index.write().await;

        match place(&index, &record) {
            Placement::New => {
                self.append(std::slice::from_ref(&record)).await?;
                index.insert(record.id.clone(), record);
                Ok(true)
            }
            Placement::Identical => Ok(false),
            Placement::Conflict => Err(AppError::conflict(vec![record.id])),
        }
    }

    async fn save_batch(&self, records: Vec<UrlRecord>) -> Result<(), AppError> {
        let mut index = self.index.write().await;

        let plan = plan_batch(&index, records);
        self.append(&plan.inserts).await?;
        for record in plan.inserts {
            index.insert(record.id.clone(), record);
        }

        if plan.conflicts.is_empty() {
            Ok(())
        } else {
            Err(AppError::conflict(plan.conflicts))
        }
    }

    async fn get(&self, id: &str) -> Result<Option<UrlRecord>, AppError> {
        Ok(self.index.read().await.get(id).cloned())
    }

    async fn get_user_urls(&self, owner_id: &str) -> Result<Vec<UrlRecord>, AppError> {
        let index = self.index.read().await;

        Ok(index
            .values()
            .filter(|r| r.is_owned_by(owner_id))
            .cloned()
            .collect())
    }

    async fn delete_user_urls(&self, owner_id: &str, ids: &[String]) -> Result<(), AppError> {
        let mut index = self.index.write().await;

        let updates = plan_deletion(&index, owner_id, ids);
        self.append(&updates).await.map_err(|e| {
            e.with_context(
                "delete_user_urls",
                json!({ "owner_id": owner_id, "ids": ids }),
            )
        })?;
        for record in updates {
            index.insert(record.id.clone(), record);
        }

        Ok(())
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}
