//! Storage trait definitions for the domain layer.
//!
//! Concrete backends live in `crate::infrastructure::persistence` and are
//! selected once at startup (see [`crate::bootstrap::open_storage`]).
//! Mock implementations are generated via `mockall` for unit tests.

pub mod url_storage;

pub use url_storage::UrlStorage;

#[cfg(test)]
pub use url_storage::MockUrlStorage;
