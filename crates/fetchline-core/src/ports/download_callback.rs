//! Download progress callback port.
//!
//! Callbacks are invoked synchronously on the task that performed the step,
//! so implementations must return quickly and never block.

use crate::download::{DownloadError, DownloadSession};

/// Receives progress, failure and success notifications for a session.
///
/// Every method gets a snapshot of the session as it was at the time of the
/// event.
pub trait DownloadCallback: Send + Sync {
    /// Bytes were flushed, or the session changed state (paused, deleted).
    fn on_progress(&self, session: &DownloadSession);

    /// The transfer stopped because of `error`. The session is `Failed`.
    fn on_error(&self, session: &DownloadSession, error: &DownloadError);

    /// The transfer finished. The session is `Completed`.
    fn on_success(&self, session: &DownloadSession);
}

/// A callback that discards all notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDownloadCallback;

impl DownloadCallback for NoopDownloadCallback {
    fn on_progress(&self, _session: &DownloadSession) {}

    fn on_error(&self, _session: &DownloadSession, _error: &DownloadError) {}

    fn on_success(&self, _session: &DownloadSession) {}
}
