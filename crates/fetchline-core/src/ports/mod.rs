//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the core domain expects from infrastructure.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - No `sqlx` or `reqwest` types in any signature
//! - Repositories are CRUD-focused
//! - Callbacks and indicators are synchronous and must not block

pub mod busy_indicator;
pub mod download_callback;
pub mod download_manager;
pub mod http_transport;
pub mod session_store;

use thiserror::Error;

pub use busy_indicator::{BusyIndicatorFactory, BusyIndicatorPort, NoopIndicator};
pub use download_callback::{DownloadCallback, NoopDownloadCallback};
pub use download_manager::{DownloadManagerConfig, DownloadManagerPort, ResumePolicy};
pub use http_transport::{
    ByteStream, HttpMethod, HttpTransportPort, RequestSpec, TransferResponse, TransportError,
};
pub use session_store::DownloadSessionStorePort;

#[cfg(test)]
pub use busy_indicator::MockBusyIndicatorPort;

/// Domain-specific errors for repository operations.
///
/// This error type abstracts away storage implementation details (e.g., sqlx errors)
/// and provides a clean interface for services to handle storage failures.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The requested entity was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An entity with the same identifier already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Storage backend error (database, filesystem, etc.).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A constraint was violated (e.g., unique constraint).
    #[error("Constraint violation: {0}")]
    Constraint(String),
}
