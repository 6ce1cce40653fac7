//! indicatif-backed busy indicator and download progress display.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use fetchline_core::{
    BusyIndicatorFactory, BusyIndicatorPort, DownloadCallback, DownloadError, DownloadSession,
    SessionState,
};

/// Builds a terminal spinner per request.
#[derive(Debug, Clone)]
pub struct SpinnerFactory {
    message: String,
}

impl SpinnerFactory {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl BusyIndicatorFactory for SpinnerFactory {
    fn create(&self, cancelable: bool) -> Box<dyn BusyIndicatorPort> {
        let message = if cancelable {
            format!("{} (Ctrl-C to cancel)", self.message)
        } else {
            self.message.clone()
        };
        Box::new(SpinnerIndicator {
            bar: ProgressBar::hidden(),
            message,
        })
    }
}

struct SpinnerIndicator {
    bar: ProgressBar,
    message: String,
}

impl BusyIndicatorPort for SpinnerIndicator {
    fn show(&self) {
        self.bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        self.bar.set_style(ProgressStyle::default_spinner());
        self.bar.set_message(self.message.clone());
        self.bar.enable_steady_tick(Duration::from_millis(100));
    }

    fn hide(&self) {
        self.bar.finish_and_clear();
    }
}

/// Terminal-relevant outcome of a download, forwarded by
/// [`TerminalDownloadCallback`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadEvent {
    Paused { downloaded: u64 },
    Deleted,
    Failed(DownloadError),
    Completed { downloaded: u64 },
}

/// Renders progress on a bar and forwards terminal events to a channel.
pub struct TerminalDownloadCallback {
    bar: ProgressBar,
    events: mpsc::UnboundedSender<DownloadEvent>,
}

impl TerminalDownloadCallback {
    pub fn new(events: mpsc::UnboundedSender<DownloadEvent>) -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner} [{elapsed_precise}] [{bar:40}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
        ) {
            bar.set_style(style.progress_chars("=> "));
        }
        Self { bar, events }
    }

    /// Callback whose bar never draws, for non-interactive output.
    pub fn hidden(events: mpsc::UnboundedSender<DownloadEvent>) -> Self {
        Self {
            bar: ProgressBar::hidden(),
            events,
        }
    }

    fn sync_bar(&self, session: &DownloadSession) {
        if let Some(total) = session.total_bytes {
            self.bar.set_length(total);
        }
        self.bar.set_position(session.downloaded_bytes);
    }
}

impl DownloadCallback for TerminalDownloadCallback {
    fn on_progress(&self, session: &DownloadSession) {
        self.sync_bar(session);
        let event = match session.state {
            SessionState::Paused => DownloadEvent::Paused {
                downloaded: session.downloaded_bytes,
            },
            SessionState::Deleted => DownloadEvent::Deleted,
            _ => return,
        };
        self.bar.abandon();
        let _ = self.events.send(event);
    }

    fn on_error(&self, session: &DownloadSession, error: &DownloadError) {
        self.sync_bar(session);
        self.bar.abandon();
        let _ = self.events.send(DownloadEvent::Failed(error.clone()));
    }

    fn on_success(&self, session: &DownloadSession) {
        self.sync_bar(session);
        self.bar.finish();
        let _ = self.events.send(DownloadEvent::Completed {
            downloaded: session.downloaded_bytes,
        });
    }
}
