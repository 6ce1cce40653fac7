//! Core domain types and port definitions for fetchline.
//!
//! This crate owns everything with real state and failure semantics that is
//! independent of a concrete transport or storage engine:
//!
//! - `request` - tag-addressed cancellation ([`RequestRegistry`], [`RequestHandle`])
//!   and the per-request [`ObserverAdapter`]
//! - `download` - the [`DownloadSession`] entity, its state machine and errors
//! - `ports` - trait abstractions implemented by adapter crates
//! - `paths` - data directory and database path resolution

pub mod download;
pub mod paths;
pub mod ports;
pub mod request;

// Re-export commonly used types for convenience
pub use download::{
    DEFAULT_SESSION_KIND, DownloadError, DownloadResult, DownloadSession, SessionId, SessionState,
};
pub use ports::{
    BusyIndicatorFactory, BusyIndicatorPort, ByteStream, DownloadCallback, DownloadManagerConfig,
    DownloadManagerPort, DownloadSessionStorePort, HttpMethod, HttpTransportPort,
    NoopDownloadCallback, NoopIndicator, RepositoryError, RequestSpec, ResumePolicy,
    TransferResponse, TransportError,
};
pub use request::{
    IndicatorConfig, ObserverAdapter, ObserverState, RequestError, RequestHandle, RequestRegistry,
};

// Re-export path utilities
pub use paths::{PathError, data_root, database_path, default_download_dir};

// Silence unused dev-dependency warning
#[cfg(test)]
use tokio_test as _;
