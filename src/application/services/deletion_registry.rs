//! Outcome tracking for deletions accepted for background processing.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use tracing::debug;

use super::deletion::DeletionReport;
use crate::error::AppError;

/// How long a finished job stays queryable.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(600);

/// Handle returned when a deletion is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DeletionTicket(pub u64);

impl fmt::Display for DeletionTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DeletionState {
    Pending,
    Completed {
        groups: usize,
        submitted: usize,
    },
    Failed {
        code: &'static str,
        message: String,
        details: Value,
    },
}

/// Observable status of one background deletion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeletionStatus {
    pub ticket: DeletionTicket,
    pub owner_id: String,
    pub requested: usize,
    pub state: DeletionState,
    pub submitted_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl DeletionStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self.state, DeletionState::Pending)
    }

    fn expired(&self, now: DateTime<Utc>, retention: Duration) -> bool {
        self.finished_at
            .and_then(|at| now.signed_duration_since(at).to_std().ok())
            .is_some_and(|age| age >= retention)
    }
}

/// Registry of background deletions keyed by ticket.
///
/// Each job's status lives in a `watch` channel so callers can both read the
/// latest state and wait for completion. Finished jobs are evicted once they
/// are older than the retention window; pending jobs are never evicted.
pub struct DeletionRegistry {
    next_ticket: AtomicU64,
    retention: Duration,
    jobs: RwLock<HashMap<DeletionTicket, watch::Sender<DeletionStatus>>>,
}

impl Default for DeletionRegistry {
    fn default() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }
}

impl DeletionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            next_ticket: AtomicU64::new(0),
            retention,
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Records a new pending job and returns its ticket.
    ///
    /// Finished jobs past the retention window are dropped first.
    pub async fn register(&self, owner_id: &str, requested: usize) -> DeletionTicket {
        let ticket = DeletionTicket(self.next_ticket.fetch_add(1, Ordering::Relaxed) + 1);
        let status = DeletionStatus {
            ticket,
            owner_id: owner_id.to_string(),
            requested,
            state: DeletionState::Pending,
            submitted_at: Utc::now(),
            finished_at: None,
        };

        let (tx, _rx) = watch::channel(status);
        let now = Utc::now();

        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| !job.borrow().expired(now, self.retention));
        if jobs.len() < before {
            debug!("Evicted {} finished deletion jobs", before - jobs.len());
        }
        jobs.insert(ticket, tx);
        ticket
    }

    /// Stores the outcome of a job.
    pub async fn finish(&self, ticket: DeletionTicket, outcome: &Result<DeletionReport, AppError>) {
        let state = match outcome {
            Ok(report) => DeletionState::Completed {
                groups: report.groups,
                submitted: report.submitted,
            },
            Err(e) => DeletionState::Failed {
                code: e.code(),
                message: e.to_string(),
                details: e.details(),
            },
        };

        if let Some(tx) = self.jobs.read().await.get(&ticket) {
            tx.send_modify(|status| {
                status.state = state;
                status.finished_at = Some(Utc::now());
            });
        }
    }

    /// Latest status of a job, visible only to the owner who submitted it.
    pub async fn status(&self, owner_id: &str, ticket: DeletionTicket) -> Option<DeletionStatus> {
        let jobs = self.jobs.read().await;
        let status = jobs.get(&ticket)?.borrow().clone();
        (status.owner_id == owner_id).then_some(status)
    }

    /// Waits until a job has finished and returns its final status.
    pub async fn wait(&self, owner_id: &str, ticket: DeletionTicket) -> Option<DeletionStatus> {
        let mut rx = {
            let jobs = self.jobs.read().await;
            jobs.get(&ticket)?.subscribe()
        };

        if rx.borrow().owner_id != owner_id {
            return None;
        }

        let status = rx.wait_for(|s| s.is_finished()).await.ok()?.clone();
        Some(status)
    }
}
