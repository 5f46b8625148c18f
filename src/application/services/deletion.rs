//! Deadline-bounded, batched soft deletion.
//!
//! A producer task streams identifiers into a bounded channel; a consumer
//! task groups them and issues one `delete_user_urls` call per group, in
//! arrival order and never concurrently. Both tasks watch the same deadline
//! and are aborted before [`run_deletion`] returns.

use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, warn};

use crate::domain::repositories::UrlStorage;
use crate::error::AppError;

/// Summary of a finished deletion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeletionReport {
    /// Number of `delete_user_urls` calls issued.
    pub groups: usize,
    /// Number of identifiers submitted to storage.
    pub submitted: usize,
}

enum Stage {
    Produced(usize),
    Consumed(Result<DeletionReport, AppError>),
}

/// Deletes `ids` owned by `owner_id` in groups of `group_size`.
///
/// # Errors
///
/// Returns [`AppError::Timeout`] if `deadline` passes before every group has
/// been accepted by storage; groups not yet issued are never issued.
///
/// Returns the first storage error unchanged in kind; later groups are not
/// attempted.
pub async fn run_deletion<S>(
    storage: Arc<S>,
    owner_id: String,
    ids: Vec<String>,
    group_size: usize,
    deadline: Instant,
) -> Result<DeletionReport, AppError>
where
    S: UrlStorage + ?Sized + 'static,
{
    if ids.is_empty() {
        return Ok(DeletionReport::default());
    }

    let total = ids.len();
    let group_size = group_size.max(1);
    let (tx, rx) = mpsc::channel(total);

    // Dropping the set aborts whichever task is still running.
    let mut tasks = JoinSet::new();
    tasks.spawn(async move { Stage::Produced(produce(ids, tx, deadline).await) });
    tasks.spawn(async move {
        Stage::Consumed(consume(storage, owner_id, rx, group_size, total, deadline).await)
    });

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Stage::Produced(sent)) => debug!("Producer finished after {} of {}", sent, total),
            Ok(Stage::Consumed(result)) => {
                tasks.abort_all();
                return result;
            }
            Err(e) => {
                return Err(AppError::storage_with(
                    "Deletion task failed",
                    json!({ "total": total }),
                    e,
                ));
            }
        }
    }

    Err(AppError::storage(
        "Deletion consumer exited without a result",
        json!({ "total": total }),
    ))
}

/// Sends identifiers one at a time until done, the deadline passes, or the
/// consumer goes away. Returns the number sent.
async fn produce(ids: Vec<String>, tx: mpsc::Sender<String>, deadline: Instant) -> usize {
    let mut sent = 0;

    for id in ids {
        if expired(deadline) {
            break;
        }

        tokio::select! {
            biased;
            _ = sleep_until(deadline) => break,
            result = tx.send(id) => {
                if result.is_err() {
                    break;
                }
                sent += 1;
            }
        }
    }

    sent
}

async fn consume<S>(
    storage: Arc<S>,
    owner_id: String,
    mut rx: mpsc::Receiver<String>,
    group_size: usize,
    total: usize,
    deadline: Instant,
) -> Result<DeletionReport, AppError>
where
    S: UrlStorage + ?Sized,
{
    let mut report = DeletionReport::default();
    let mut group: Vec<String> = Vec::with_capacity(group_size);
    let mut received = 0;

    loop {
        if expired(deadline) {
            return Err(timed_out(&owner_id, &report, total));
        }

        let next = tokio::select! {
            biased;
            _ = sleep_until(deadline) => return Err(timed_out(&owner_id, &report, total)),
            next = rx.recv() => next,
        };

        let Some(id) = next else { break };
        received += 1;
        group.push(id);

        if group.len() == group_size {
            let full = std::mem::replace(&mut group, Vec::with_capacity(group_size));
            issue(storage.as_ref(), &owner_id, full, &mut report, total, deadline).await?;
        }
    }

    // The producer stops early only when the deadline passed.
    if received < total {
        return Err(timed_out(&owner_id, &report, total));
    }

    if !group.is_empty() {
        issue(storage.as_ref(), &owner_id, group, &mut report, total, deadline).await?;
    }

    Ok(report)
}

async fn issue<S>(
    storage: &S,
    owner_id: &str,
    group: Vec<String>,
    report: &mut DeletionReport,
    total: usize,
    deadline: Instant,
) -> Result<(), AppError>
where
    S: UrlStorage + ?Sized,
{
    let start = report.submitted;
    let range = format!("{}..{}", start, start + group.len());

    if expired(deadline) {
        return Err(timed_out(owner_id, report, total));
    }

    tokio::select! {
        biased;
        _ = sleep_until(deadline) => return Err(timed_out(owner_id, report, total)),
        result = storage.delete_user_urls(owner_id, &group) => {
            result.map_err(|e| {
                warn!("Deletion group {} for {} failed: {}", range, owner_id, e);
                e.with_context(
                    "delete_user_urls",
                    json!({ "owner_id": owner_id, "range": range, "total": total }),
                )
            })?;
        }
    }

    metrics::counter!("url_delete_groups_total").increment(1);
    report.groups += 1;
    report.submitted += group.len();
    debug!("Deleted group {} for {}", range, owner_id);

    Ok(())
}

fn expired(deadline: Instant) -> bool {
    Instant::now() >= deadline
}

fn timed_out(owner_id: &str, report: &DeletionReport, total: usize) -> AppError {
    metrics::counter!("url_delete_timeouts_total").increment(1);
    AppError::timeout(
        "Deletion deadline exceeded",
        json!({
            "owner_id": owner_id,
            "submitted": report.submitted,
            "total": total,
        }),
    )
}
