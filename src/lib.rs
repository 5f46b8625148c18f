//! # URL Shortener Core
//!
//! Deterministic URL shortening with interchangeable storage backends.
//!
//! ## Architecture
//!
//! This crate follows Clean Architecture principles with clear layer separation:
//!
//! - **Domain Layer** ([`domain`]) - URL records and the storage capability trait
//! - **Application Layer** ([`application`]) - Shortening, resolution and the deletion pipeline
//! - **Infrastructure Layer** ([`infrastructure`]) - In-memory, journal file and PostgreSQL backends
//!
//! ## Features
//!
//! - 8-character hexadecimal identifiers derived from the URL (MD5 prefix)
//! - Conflict detection by the storage backend, idempotent re-saves
//! - Soft deletion in fixed-size groups bounded by a deadline
//! - Background deletions with an observable outcome per ticket
//!
//! ## Quick Start
//!
//! ```bash
//! export STORAGE_BACKEND=file
//! export FILE_STORAGE_PATH=./data/urls.jsonl
//!
//! cargo run -- shorten https://example.com --user alice
//! ```
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables via [`config::Config`].
//! See [`config`] module for available options.

pub mod application;
pub mod bootstrap;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod utils;

pub use error::AppError;

/// Commonly used types for external consumers.
///
/// Re-exports frequently used types to simplify imports for library users
/// and integration tests.
pub mod prelude {
    pub use crate::application::services::{
        BatchShortened, DeletionReport, DeletionState, DeletionStatus, DeletionTicket, Shortened,
        UrlService,
    };
    pub use crate::domain::entities::{BatchItem, BatchResponseItem, UrlRecord};
    pub use crate::domain::repositories::UrlStorage;
    pub use crate::error::AppError;
    pub use crate::infrastructure::persistence::{FileUrlStorage, MemoryUrlStorage, PgUrlStorage};
}
