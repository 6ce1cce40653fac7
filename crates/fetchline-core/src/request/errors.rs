//! Errors returned to callers of observed requests.

use thiserror::Error;

use crate::ports::TransportError;

/// Outcome of a request driven through an [`ObserverAdapter`](super::ObserverAdapter)
/// that did not produce a value.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Invalid request: {0}")]
    InvalidArgument(String),

    /// The request was cancelled by tag, by the indicator or by its
    /// owning lifecycle. This is a normal terminal state.
    #[error("Request was cancelled")]
    Cancelled,
}

impl RequestError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_convert() {
        let err: RequestError = TransportError::network("connection reset").into();
        assert!(!err.is_cancelled());
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn cancelled_is_flagged() {
        assert!(RequestError::Cancelled.is_cancelled());
        assert!(!RequestError::invalid("no url").is_cancelled());
    }
}
