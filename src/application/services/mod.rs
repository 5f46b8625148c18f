//! Business logic services for the application layer.

pub mod deletion;
pub mod deletion_registry;
pub mod url_service;

pub use deletion::{DeletionReport, run_deletion};
pub use deletion_registry::{DeletionRegistry, DeletionState, DeletionStatus, DeletionTicket};
pub use url_service::{BatchShortened, Shortened, UrlService};
