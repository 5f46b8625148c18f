//! URL shortening, resolution and deletion service.

use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info};

use super::deletion::{DeletionReport, run_deletion};
use super::deletion_registry::{DeletionRegistry, DeletionStatus, DeletionTicket};
use crate::domain::entities::{BatchItem, BatchResponseItem, UrlRecord};
use crate::domain::repositories::UrlStorage;
use crate::error::AppError;
use crate::utils::id_generator::generate_id;
use crate::utils::short_url::{build_short_url, strip_base_url};

/// Outcome of shortening a single URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Shortened {
    pub id: String,
    pub short_url: String,
    /// The identifier was already stored, by this owner or another;
    /// `short_url` is still usable.
    pub existed: bool,
}

/// Outcome of shortening a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchShortened {
    /// One entry per submitted item, in submission order.
    pub items: Vec<BatchResponseItem>,
    /// Identifiers that collided with existing records.
    pub conflicts: Vec<String>,
}

impl BatchShortened {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// Service for creating, resolving and deleting short URLs.
///
/// Conflicts reported by storage are informational here: the computed
/// identifier is returned either way so the caller can build a short URL.
pub struct UrlService<S: UrlStorage + ?Sized> {
    storage: Arc<S>,
    base_url: String,
    batch_size: usize,
    delete_timeout: Duration,
    deletions: Arc<DeletionRegistry>,
}

impl<S: UrlStorage + ?Sized + 'static> UrlService<S> {
    /// Creates a new service.
    ///
    /// `base_url` is the prefix of every short URL; a trailing `/` is
    /// ignored. `batch_size` is the deletion group size (at least 1).
    pub fn new(
        storage: Arc<S>,
        base_url: impl Into<String>,
        batch_size: usize,
        delete_timeout: Duration,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            storage,
            base_url,
            batch_size: batch_size.max(1),
            delete_timeout,
            deletions: Arc::new(DeletionRegistry::new()),
        }
    }

    /// Full short URL for an identifier.
    pub fn short_url(&self, id: &str) -> String {
        build_short_url(&self.base_url, id)
    }

    /// Shortens `url` on behalf of `owner_id`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if `url` is empty.
    /// Returns [`AppError::Storage`] on backend failures.
    #[tracing::instrument(skip(self, url))]
    pub async fn shorten(&self, url: &str, owner_id: &str) -> Result<Shortened, AppError> {
        if url.is_empty() {
            return Err(AppError::bad_request(
                "URL must not be empty",
                json!({ "owner_id": owner_id }),
            ));
        }

        let id = generate_id(url);
        let record = UrlRecord::new(id.clone(), url.to_string(), owner_id.to_string());

        let existed = match self.storage.save(record).await {
            Ok(true) => {
                metrics::counter!("urls_shortened_total").increment(1);
                false
            }
            Ok(false) => {
                debug!("URL already shortened as {}", id);
                true
            }
            Err(AppError::Conflict { .. }) => {
                metrics::counter!("url_conflicts_total").increment(1);
                debug!("Identifier {} already taken", id);
                true
            }
            Err(e) => return Err(e.with_context("save", json!({ "id": id }))),
        };

        Ok(Shortened {
            short_url: self.short_url(&id),
            id,
            existed,
        })
    }

    /// Shortens every item of a batch on behalf of `owner_id`.
    ///
    /// Items that do not collide are persisted even when others do.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the batch is empty or any item has
    /// an empty URL; nothing is stored in that case.
    #[tracing::instrument(skip(self, items), fields(items = items.len()))]
    pub async fn shorten_batch(
        &self,
        items: Vec<BatchItem>,
        owner_id: &str,
    ) -> Result<BatchShortened, AppError> {
        if items.is_empty() {
            return Err(AppError::bad_request(
                "Batch must not be empty",
                json!({ "owner_id": owner_id }),
            ));
        }

        if let Some(position) = items.iter().position(|i| i.original_url.is_empty()) {
            return Err(AppError::bad_request(
                "URL must not be empty",
                json!({
                    "position": position,
                    "correlation_id": items[position].correlation_id,
                }),
            ));
        }

        let mut records = Vec::with_capacity(items.len());
        let mut response = Vec::with_capacity(items.len());

        for item in items {
            let id = generate_id(&item.original_url);
            response.push(BatchResponseItem {
                correlation_id: item.correlation_id,
                short_url: self.short_url(&id),
            });
            records.push(UrlRecord::new(id, item.original_url, owner_id.to_string()));
        }

        let submitted = records.len();
        let conflicts = match self.storage.save_batch(records).await {
            Ok(()) => Vec::new(),
            Err(AppError::Conflict { ids, .. }) => ids,
            Err(e) => {
                return Err(e.with_context("save_batch", json!({ "records": submitted })));
            }
        };

        metrics::counter!("urls_shortened_total").increment((submitted - conflicts.len()) as u64);
        if !conflicts.is_empty() {
            metrics::counter!("url_conflicts_total").increment(conflicts.len() as u64);
        }

        Ok(BatchShortened {
            items: response,
            conflicts,
        })
    }

    /// Looks up the original URL for `id`.
    ///
    /// `Ok(None)` means the identifier was never stored.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Deleted`] if the record exists but was deleted.
    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self, id: &str) -> Result<Option<String>, AppError> {
        let record = self
            .storage
            .get(id)
            .await
            .map_err(|e| e.with_context("get", json!({ "id": id })))?;

        match record {
            Some(r) if r.deleted => Err(AppError::deleted(id)),
            Some(r) => Ok(Some(r.original_url)),
            None => Ok(None),
        }
    }

    /// Active records owned by `owner_id`.
    #[tracing::instrument(skip(self))]
    pub async fn list_for_user(&self, owner_id: &str) -> Result<Vec<UrlRecord>, AppError> {
        let records = self
            .storage
            .get_user_urls(owner_id)
            .await
            .map_err(|e| e.with_context("get_user_urls", json!({ "owner_id": owner_id })))?;

        Ok(records
            .into_iter()
            .filter(|r| !r.deleted && r.is_owned_by(owner_id))
            .collect())
    }

    /// Soft-deletes the records named by `tokens`, waiting for completion.
    ///
    /// Tokens may be bare identifiers or full short URLs.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Timeout`] if `deadline` passes first, or the first
    /// storage error encountered.
    #[tracing::instrument(skip(self, tokens), fields(tokens = tokens.len()))]
    pub async fn delete_batch(
        &self,
        owner_id: &str,
        tokens: Vec<String>,
        deadline: Instant,
    ) -> Result<DeletionReport, AppError> {
        let ids = self.normalize_tokens(tokens);
        run_deletion(
            self.storage.clone(),
            owner_id.to_string(),
            ids,
            self.batch_size,
            deadline,
        )
        .await
    }

    /// Accepts a deletion for background processing.
    ///
    /// The outcome is recorded against the returned ticket and can be read
    /// back with [`Self::deletion_status`] or awaited with
    /// [`Self::wait_for_deletion`].
    #[tracing::instrument(skip(self, tokens), fields(tokens = tokens.len()))]
    pub async fn submit_deletion(&self, owner_id: &str, tokens: Vec<String>) -> DeletionTicket {
        let ids = self.normalize_tokens(tokens);
        let ticket = self.deletions.register(owner_id, ids.len()).await;

        let storage = self.storage.clone();
        let registry = self.deletions.clone();
        let owner_id = owner_id.to_string();
        let batch_size = self.batch_size;
        let deadline = Instant::now() + self.delete_timeout;

        tokio::spawn(async move {
            let outcome = run_deletion(storage, owner_id.clone(), ids, batch_size, deadline).await;

            match &outcome {
                Ok(report) => info!(
                    "Deletion {} for {} finished: {} ids in {} groups",
                    ticket, owner_id, report.submitted, report.groups
                ),
                Err(e) => error!(
                    "Deletion {} for {} failed: {} {}",
                    ticket,
                    owner_id,
                    e,
                    e.details()
                ),
            }

            registry.finish(ticket, &outcome).await;
        });

        ticket
    }

    /// Current status of a background deletion submitted by `owner_id`.
    pub async fn deletion_status(
        &self,
        owner_id: &str,
        ticket: DeletionTicket,
    ) -> Option<DeletionStatus> {
        self.deletions.status(owner_id, ticket).await
    }

    /// Waits for a background deletion submitted by `owner_id` to finish.
    pub async fn wait_for_deletion(
        &self,
        owner_id: &str,
        ticket: DeletionTicket,
    ) -> Option<DeletionStatus> {
        self.deletions.wait(owner_id, ticket).await
    }

    /// Checks that the storage backend is reachable.
    pub async fn ping(&self) -> Result<(), AppError> {
        self.storage.ping().await
    }

    fn normalize_tokens(&self, tokens: Vec<String>) -> Vec<String> {
        tokens
            .iter()
            .map(|t| strip_base_url(&self.base_url, t).to_string())
            .filter(|id| !id.is_empty())
            .collect()
    }
}
