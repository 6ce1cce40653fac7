//! Download manager port definition.
//!
//! This port is the public interface of the download subsystem. It hides
//! transfer tasks, cancellation tokens and write buffering behind a small
//! async API.
//!
//! # Design
//!
//! - Only core download domain types in signatures
//! - Stop and remove are fire-and-acknowledge: they never wait for the
//!   transfer task to wind down
//! - Progress is reported through the session's [`DownloadCallback`](super::DownloadCallback)

use std::time::Duration;

use async_trait::async_trait;

use crate::download::{DownloadError, DownloadSession};

/// What to do with bytes already on disk when a session is started again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResumePolicy {
    /// Continue from the persisted offset with a ranged request.
    #[default]
    Resume,
    /// Discard the partial file and start from byte zero.
    Restart,
}

/// Configuration for creating a download manager.
#[derive(Debug, Clone)]
pub struct DownloadManagerConfig {
    /// Write buffer size; progress is persisted every time it is flushed.
    pub buffer_size: usize,
    /// Minimum interval between two `on_progress` calls during a transfer.
    pub progress_interval: Duration,
    pub resume_policy: ResumePolicy,
}

impl Default for DownloadManagerConfig {
    fn default() -> Self {
        Self {
            buffer_size: 64 * 1024,
            progress_interval: Duration::from_millis(100),
            resume_policy: ResumePolicy::Resume,
        }
    }
}

impl DownloadManagerConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the write buffer size. Zero is clamped to one byte.
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    #[must_use]
    pub const fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_resume_policy(mut self, policy: ResumePolicy) -> Self {
        self.resume_policy = policy;
        self
    }
}

/// Port for managing downloads.
///
/// # Usage
///
/// ```ignore
/// let manager: Arc<dyn DownloadManagerPort> = /* ... */;
///
/// let session = DownloadSession::new(url, path).with_callback(callback);
/// manager.start_download(session.clone()).await?;
///
/// // Pause; a later start resumes from the persisted offset
/// manager.stop_download(&session).await?;
///
/// // Forget it entirely
/// manager.remove_download(&session, true).await?;
/// ```
#[async_trait]
pub trait DownloadManagerPort: Send + Sync {
    /// Begin or resume transferring `session`.
    ///
    /// Returns once the transfer task has been spawned. Starting a session
    /// that already has an active transfer is a no-op.
    async fn start_download(&self, session: DownloadSession) -> Result<(), DownloadError>;

    /// Pause the active transfer of `session`, if any.
    async fn stop_download(&self, session: &DownloadSession) -> Result<(), DownloadError>;

    /// Stop `session`, delete its record and optionally its local file.
    async fn remove_download(
        &self,
        session: &DownloadSession,
        delete_file: bool,
    ) -> Result<(), DownloadError>;

    /// Persisted sessions of `kind`, in insertion order.
    async fn get_download_list(&self, kind: &str) -> Result<Vec<DownloadSession>, DownloadError>;

    /// Number of persisted sessions.
    async fn get_download_count(&self) -> Result<u64, DownloadError>;
}
