//! Infrastructure layer: concrete storage backends.
//!
//! - [`persistence`] - Volatile, journal and PostgreSQL implementations of
//!   [`crate::domain::repositories::UrlStorage`]

pub mod persistence;
