//! Domain layer: entities and the storage contract.
//!
//! - [`entities`] - Core data structures
//! - [`repositories`] - Storage trait implemented by the infrastructure layer
//!
//! The domain layer has no dependencies on infrastructure code.

pub mod entities;
pub mod repositories;
