//! CLI error type and exit codes.

use fetchline_core::{DownloadError, PathError, RequestError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Core(String),

    #[error("Invalid arguments: {0}")]
    Arguments(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Cancelled")]
    Cancelled,
}

impl CliError {
    /// Exit code for this error, following sysexits.h where one fits.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Core(_) => 1,
            Self::Arguments(_) => 2,
            Self::Io(_) => 74,       // EX_IOERR
            Self::Config(_) => 78,   // EX_CONFIG
            Self::Database(_) => 73, // EX_CANTCREAT
            Self::Network(_) => 69,  // EX_UNAVAILABLE
            Self::Cancelled => 130,
        }
    }
}

impl From<DownloadError> for CliError {
    fn from(err: DownloadError) -> Self {
        match err {
            DownloadError::Io { .. } | DownloadError::InvalidPath { .. } => {
                Self::Io(err.user_message())
            }
            DownloadError::Network { .. } | DownloadError::Interrupted { .. } => {
                Self::Network(err.user_message())
            }
            DownloadError::Storage { message } => Self::Database(message),
            DownloadError::InvalidSession { message } => Self::Arguments(message),
            DownloadError::Cancelled => Self::Cancelled,
            DownloadError::Other { message } => Self::Core(message),
        }
    }
}

impl From<RequestError> for CliError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::Cancelled => Self::Cancelled,
            RequestError::InvalidArgument(msg) => Self::Arguments(msg),
            RequestError::Transport(e) => Self::Network(e.to_string()),
        }
    }
}

impl From<PathError> for CliError {
    fn from(err: PathError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fetchline_core::TransportError;

    #[test]
    fn test_download_errors_map_to_exit_codes() {
        let err: CliError = DownloadError::invalid_session("already completed").into();
        assert_eq!(err.exit_code(), 2);

        let err: CliError = DownloadError::storage("disk full").into();
        assert_eq!(err.exit_code(), 73);

        let err: CliError = DownloadError::Interrupted { bytes_downloaded: 3 }.into();
        assert_eq!(err.exit_code(), 69);
    }

    #[test]
    fn test_request_errors_map_to_exit_codes() {
        let err: CliError = RequestError::Cancelled.into();
        assert_eq!(err.exit_code(), 130);

        let err: CliError = RequestError::from(TransportError::status(500, "boom")).into();
        assert!(matches!(err, CliError::Network(_)));
    }
}
