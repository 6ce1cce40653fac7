//! Resumable HTTP downloads for fetchline.
//!
//! [`DownloadManagerImpl`] implements
//! [`DownloadManagerPort`](fetchline_core::DownloadManagerPort) on top of a
//! session store and an HTTP transport:
//!
//! - `manager` - active transfer tracking and the port implementation
//! - `progress` - callback throttling

// Re-export core types for convenience
pub use fetchline_core::{
    DownloadCallback, DownloadError, DownloadManagerConfig, DownloadManagerPort, DownloadResult,
    DownloadSession, DownloadSessionStorePort, ResumePolicy, SessionId, SessionState,
};

mod manager;
pub(crate) mod progress;

pub use manager::{DownloadManagerDeps, DownloadManagerImpl, build_download_manager};
pub use progress::ProgressThrottle;
