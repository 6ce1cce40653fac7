//! The download session entity.
//!
//! Pure data types with no I/O dependencies.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::ports::DownloadCallback;

/// Record kind used when the caller does not group sessions.
pub const DEFAULT_SESSION_KIND: &str = "default";

/// Stable identifier of a download session.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive an id from a remote URL: the first 16 hex chars of its SHA-256.
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        let digest = Sha256::digest(url.as_bytes());
        let hex: String = digest.iter().take(8).map(|b| format!("{b:02x}")).collect();
        Self(hex)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// State of a download session.
///
/// ```text
/// Pending ─start─▶ Downloading ─stop─▶ Paused ─start─▶ Downloading
///                     │   │
///                     │   └─error─▶ Failed ─start─▶ Downloading
///                     └─done─▶ Completed
/// any ─remove─▶ Deleted
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Pending,
    Downloading,
    Paused,
    Completed,
    Failed,
    /// Removed by the caller. Never persisted; only seen by callbacks.
    Deleted,
}

impl SessionState {
    /// Convert to string representation for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Downloading => "downloading",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Deleted => "deleted",
        }
    }

    /// Parse from string representation.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "downloading" => Self::Downloading,
            "paused" => Self::Paused,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "deleted" => Self::Deleted,
            // "pending" or unknown values default to Pending
            _ => Self::Pending,
        }
    }

    /// Whether `start_download` may (re)start a session in this state.
    #[must_use]
    pub const fn is_startable(&self) -> bool {
        matches!(self, Self::Pending | Self::Paused | Self::Failed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One download: where it comes from, where it goes and how far it got.
#[derive(Clone, Serialize, Deserialize)]
pub struct DownloadSession {
    pub id: SessionId,
    pub kind: String,
    pub remote_url: String,
    pub local_path: PathBuf,
    /// `None` until the server announces a length.
    pub total_bytes: Option<u64>,
    pub downloaded_bytes: u64,
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    callback: Option<Arc<dyn DownloadCallback>>,
}

impl DownloadSession {
    /// New pending session whose id is derived from `remote_url`.
    pub fn new(remote_url: impl Into<String>, local_path: impl Into<PathBuf>) -> Self {
        let remote_url = remote_url.into();
        let now = Utc::now();
        Self {
            id: SessionId::from_url(&remote_url),
            kind: DEFAULT_SESSION_KIND.to_string(),
            remote_url,
            local_path: local_path.into(),
            total_bytes: None,
            downloaded_bytes: 0,
            state: SessionState::Pending,
            error: None,
            created_at: now,
            updated_at: now,
            callback: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<SessionId>) -> Self {
        self.id = id.into();
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    #[must_use]
    pub fn with_callback(mut self, callback: Arc<dyn DownloadCallback>) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn set_callback(&mut self, callback: Option<Arc<dyn DownloadCallback>>) {
        self.callback = callback;
    }

    pub fn callback(&self) -> Option<&Arc<dyn DownloadCallback>> {
        self.callback.as_ref()
    }

    /// Fraction downloaded in `[0, 1]`; `0.0` when the total is unknown or zero.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(&self) -> f64 {
        match self.total_bytes {
            Some(total) if total > 0 => (self.downloaded_bytes as f64 / total as f64).min(1.0),
            _ => 0.0,
        }
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Set the state and bump `updated_at`.
    pub fn transition(&mut self, state: SessionState) {
        self.state = state;
        self.updated_at = Utc::now();
    }

    /// Adopt the persisted record: progress, state and the destination fixed
    /// when the record was first stored. The callback is kept.
    pub fn merge_persisted(&mut self, stored: &Self) {
        self.kind.clone_from(&stored.kind);
        self.remote_url.clone_from(&stored.remote_url);
        self.local_path.clone_from(&stored.local_path);
        self.total_bytes = stored.total_bytes;
        self.downloaded_bytes = stored.downloaded_bytes;
        self.state = stored.state;
        self.error.clone_from(&stored.error);
        self.created_at = stored.created_at;
        self.updated_at = stored.updated_at;
    }
}

impl fmt::Debug for DownloadSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadSession")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("remote_url", &self.remote_url)
            .field("local_path", &self.local_path)
            .field("total_bytes", &self.total_bytes)
            .field("downloaded_bytes", &self.downloaded_bytes)
            .field("state", &self.state)
            .field("error", &self.error)
            .field("has_callback", &self.callback.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::NoopDownloadCallback;

    #[test]
    fn test_id_from_url_is_stable() {
        let a = SessionId::from_url("https://example.com/file.bin");
        let b = SessionId::from_url("https://example.com/file.bin");
        let c = SessionId::from_url("https://example.com/other.bin");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str().len(), 16);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_state_string_roundtrip() {
        for state in [
            SessionState::Pending,
            SessionState::Downloading,
            SessionState::Paused,
            SessionState::Completed,
            SessionState::Failed,
        ] {
            assert_eq!(SessionState::parse(state.as_str()), state);
        }
        assert_eq!(SessionState::parse("garbage"), SessionState::Pending);
    }

    #[test]
    fn test_progress() {
        let mut session = DownloadSession::new("https://example.com/a", "/tmp/a");
        assert!((session.progress() - 0.0).abs() < f64::EPSILON);

        session.total_bytes = Some(0);
        assert!((session.progress() - 0.0).abs() < f64::EPSILON);

        session.total_bytes = Some(1000);
        session.downloaded_bytes = 400;
        assert!((session.progress() - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn test_callback_not_serialized() {
        let session = DownloadSession::new("https://example.com/a", "/tmp/a")
            .with_kind("video")
            .with_callback(Arc::new(NoopDownloadCallback));
        let json = serde_json::to_string(&session).unwrap();
        let parsed: DownloadSession = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.id, session.id);
        assert_eq!(parsed.kind, "video");
        assert!(parsed.callback().is_none());
        assert!(session.callback().is_some());
    }

    #[test]
    fn test_merge_persisted_keeps_callback() {
        let mut stored = DownloadSession::new("https://example.com/a", "/tmp/a");
        stored.total_bytes = Some(10);
        stored.downloaded_bytes = 4;
        stored.state = SessionState::Paused;

        let mut session = DownloadSession::new("https://example.com/a", "/tmp/a")
            .with_callback(Arc::new(NoopDownloadCallback));
        session.merge_persisted(&stored);

        assert_eq!(session.downloaded_bytes, 4);
        assert_eq!(session.state, SessionState::Paused);
        assert!(session.callback().is_some());
    }

    #[test]
    fn test_merge_persisted_adopts_stored_destination() {
        let stored = DownloadSession::new("https://example.com/a", "/data/a.bin").with_kind("video");
        let mut session = DownloadSession::new("https://example.com/a", "/tmp/elsewhere.bin");
        session.merge_persisted(&stored);

        assert_eq!(session.local_path(), Path::new("/data/a.bin"));
        assert_eq!(session.kind, "video");
    }
}
