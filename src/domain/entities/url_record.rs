//! Stored URL mapping and batch request/response items.

use serde::{Deserialize, Serialize};

/// A stored mapping from a short identifier to its original URL.
///
/// The serialized form is the journal line format:
/// `{"id": ..., "url": ..., "user_id": ..., "deleted": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    pub id: String,
    #[serde(rename = "url")]
    pub original_url: String,
    #[serde(rename = "user_id")]
    pub owner_id: String,
    #[serde(default)]
    pub deleted: bool,
}

impl UrlRecord {
    /// Creates a live (not deleted) record.
    pub fn new(id: String, original_url: String, owner_id: String) -> Self {
        Self {
            id,
            original_url,
            owner_id,
            deleted: false,
        }
    }

    /// Returns true if `other` may be stored under the same identifier
    /// without being a conflict.
    pub fn is_identical(&self, other: &UrlRecord) -> bool {
        self == other
    }

    /// Returns true if this record belongs to `owner_id`.
    pub fn is_owned_by(&self, owner_id: &str) -> bool {
        self.owner_id == owner_id
    }
}

/// One entry of a batch shorten request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    pub correlation_id: String,
    pub original_url: String,
}

impl BatchItem {
    pub fn new(correlation_id: impl Into<String>, original_url: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            original_url: original_url.into(),
        }
    }
}

/// One entry of a batch shorten response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResponseItem {
    pub correlation_id: String,
    pub short_url: String,
}
