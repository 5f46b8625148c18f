//! Application layer services implementing business logic.
//!
//! Services consume the [`UrlStorage`](crate::domain::repositories::UrlStorage)
//! capability trait and never touch backend internals.
//!
//! # Available Services
//!
//! - [`services::url_service::UrlService`] - Shortening, resolution, listing and deletion
//! - [`services::deletion::run_deletion`] - Deadline-bounded grouped soft deletion
//! - [`services::deletion_registry::DeletionRegistry`] - Background deletion outcomes

pub mod services;
