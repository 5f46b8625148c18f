//! Helper functions used across the crate.
//!
//! - [`id_generator`] - Deterministic short identifier generation
//! - [`short_url`] - Short URL construction and token normalization
//! - [`db_error`] - PostgreSQL error classification

pub mod db_error;
pub mod id_generator;
pub mod short_url;
