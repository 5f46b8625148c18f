//! Error taxonomy shared by storage backends and the URL service.
//!
//! Every variant carries a human-readable message and a JSON `details`
//! payload (operation, identifier, batch range) so that a failure can be
//! diagnosed from the log line alone.

use serde_json::{Value, json};
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Input rejected before touching storage.
    #[error("{message}")]
    Validation { message: String, details: Value },

    /// One or more identifiers already map to a different record.
    ///
    /// `ids` lists the conflicting identifiers; they are still valid short
    /// forms of the URLs the caller submitted.
    #[error("{message}: {}", .ids.join(", "))]
    Conflict { message: String, ids: Vec<String> },

    /// The identifier exists but has been logically removed.
    #[error("{message}")]
    Deleted { message: String, details: Value },

    /// The deletion pipeline deadline elapsed.
    #[error("{message}")]
    Timeout { message: String, details: Value },

    /// Backend I/O or protocol failure.
    #[error("{message}")]
    Storage {
        message: String,
        details: Value,
        #[source]
        source: Option<BoxError>,
    },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }

    pub fn conflict(ids: Vec<String>) -> Self {
        Self::Conflict {
            message: "Short identifier already exists".to_string(),
            ids,
        }
    }

    pub fn deleted(id: &str) -> Self {
        Self::Deleted {
            message: "Short URL was deleted".to_string(),
            details: json!({ "id": id }),
        }
    }

    pub fn timeout(message: impl Into<String>, details: Value) -> Self {
        Self::Timeout {
            message: message.into(),
            details,
        }
    }

    pub fn storage(message: impl Into<String>, details: Value) -> Self {
        Self::Storage {
            message: message.into(),
            details,
            source: None,
        }
    }

    /// Wraps a backend failure, keeping it as the error source.
    pub fn storage_with(
        message: impl Into<String>,
        details: Value,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            details,
            source: Some(source.into()),
        }
    }

    /// Attaches operation context to a storage error; other kinds pass through.
    pub fn with_context(self, operation: &str, details: Value) -> Self {
        match self {
            Self::Storage {
                message, source, ..
            } => Self::Storage {
                message: format!("{operation}: {message}"),
                details,
                source,
            },
            other => other,
        }
    }

    /// Short machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::Conflict { .. } => "conflict",
            Self::Deleted { .. } => "deleted",
            Self::Timeout { .. } => "timeout",
            Self::Storage { .. } => "storage_error",
        }
    }

    pub fn details(&self) -> Value {
        match self {
            Self::Conflict { ids, .. } => json!({ "ids": ids }),
            Self::Validation { details, .. }
            | Self::Deleted { details, .. }
            | Self::Timeout { details, .. }
            | Self::Storage { details, .. } => details.clone(),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::storage_with("Database error", json!({}), e)
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        AppError::storage_with("Migration error", json!({}), e)
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::storage_with("Journal I/O error", json!({}), e)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::storage_with("Journal encoding error", json!({}), e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_conflict_lists_identifiers() {
        let err = AppError::conflict(vec!["abcd1234".to_string(), "0000ffff".to_string()]);

        assert_eq!(err.code(), "conflict");
        assert!(err.to_string().contains("abcd1234, 0000ffff"));
        assert_eq!(err.details()["ids"][1], "0000ffff");
    }

    #[test]
    fn test_storage_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = AppError::from(io);

        assert_eq!(err.code(), "storage_error");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_with_context_only_annotates_storage_errors() {
        let err = AppError::storage("boom", json!({}))
            .with_context("delete_user_urls", json!({ "range": "0..2" }));
        assert!(err.to_string().starts_with("delete_user_urls: boom"));
        assert_eq!(err.details()["range"], "0..2");

        let err = AppError::deleted("abcd1234").with_context("get", json!({}));
        assert!(matches!(err, AppError::Deleted { .. }));
    }
}
