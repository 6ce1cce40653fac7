//! Download error types.
//!
//! These errors are serializable and do not hold external error types like
//! `std::io::Error`. For I/O errors, we capture the kind and message as
//! strings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ports::{RepositoryError, TransportError};

/// Error type for download operations.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum DownloadError {
    /// I/O error while writing the local file.
    #[error("I/O error ({kind}): {message}")]
    Io {
        /// The kind of I/O error (e.g., "`NotFound`", "`PermissionDenied`").
        kind: String,
        message: String,
    },

    /// Network/HTTP error during transfer.
    #[error("Network error: {message}")]
    Network {
        message: String,
        /// HTTP status code if available.
        #[serde(skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
    },

    /// The session store failed.
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// The session cannot be started or modified in its current form.
    #[error("Invalid session: {message}")]
    InvalidSession { message: String },

    /// The destination path is unusable.
    #[error("Invalid path: {message}")]
    InvalidPath { message: String },

    /// The body ended before the announced length was received.
    #[error("Download interrupted at {bytes_downloaded} bytes")]
    Interrupted { bytes_downloaded: u64 },

    /// Transfer was stopped by the caller.
    #[error("Download cancelled")]
    Cancelled,

    #[error("{message}")]
    Other { message: String },
}

impl DownloadError {
    pub fn io(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Io {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Capture the kind name and message of a `std::io::Error`.
    #[must_use]
    pub fn from_io_error(err: &std::io::Error) -> Self {
        let kind = err.kind();
        Self::Io {
            kind: format!("{kind:?}"),
            message: err.to_string(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            status_code: None,
        }
    }

    pub fn network_with_status(message: impl Into<String>, status_code: u16) -> Self {
        Self::Network {
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn invalid_session(message: impl Into<String>) -> Self {
        Self::InvalidSession {
            message: message.into(),
        }
    }

    pub fn invalid_path(message: impl Into<String>) -> Self {
        Self::InvalidPath {
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable by starting the session again.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::Interrupted { .. } | Self::Io { .. }
        )
    }

    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Convert to a user-friendly message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Io { message, .. } => format!("File operation failed: {message}"),
            Self::Network {
                message,
                status_code: Some(code),
            } => format!("Network error (HTTP {code}): {message}"),
            Self::Network { message, .. } => format!("Network error: {message}"),
            Self::Storage { message } => format!("Could not save download state: {message}"),
            Self::InvalidSession { message } => format!("Cannot start download: {message}"),
            Self::InvalidPath { message } => format!("Cannot write to destination: {message}"),
            Self::Interrupted { bytes_downloaded } => {
                format!("Download interrupted after {bytes_downloaded} bytes. You can resume it.")
            }
            Self::Cancelled => "Download was cancelled.".to_string(),
            Self::Other { message } => message.clone(),
        }
    }
}

impl From<RepositoryError> for DownloadError {
    fn from(err: RepositoryError) -> Self {
        Self::storage(err.to_string())
    }
}

impl From<TransportError> for DownloadError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Status { status, message } => Self::network_with_status(message, status),
            TransportError::Network { message } => Self::network(message),
            TransportError::Decode { message } => Self::other(message),
        }
    }
}

/// Convenience result type for download operations.
pub type DownloadResult<T> = Result<T, DownloadError>;
