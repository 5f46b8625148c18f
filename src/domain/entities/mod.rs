//! Core domain entities.
//!
//! - [`UrlRecord`] - A stored short identifier → URL mapping owned by a user
//! - [`BatchItem`] - A caller-supplied URL paired with a correlation token
//! - [`BatchResponseItem`] - The short URL returned for a [`BatchItem`]

pub mod url_record;

pub use url_record::{BatchItem, BatchResponseItem, UrlRecord};
