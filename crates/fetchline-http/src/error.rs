//! Internal error types for the HTTP adapter.
//!
//! These errors stay inside `fetchline-http` and are mapped to
//! [`TransportError`] at the port boundary.

use fetchline_core::TransportError;
use thiserror::Error;

pub type HttpResult<T> = Result<T, HttpError>;

#[derive(Debug, Error)]
pub enum HttpError {
    /// The request URL could not be built.
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Invalid header '{name}'")]
    InvalidHeader { name: String },

    /// Network or HTTP client error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}: {reason}")]
    Status {
        status: u16,
        url: String,
        reason: String,
    },
}

impl From<HttpError> for TransportError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Status { status, reason, .. } => Self::status(status, reason),
            HttpError::Network(e) if e.is_decode() => Self::decode(e.to_string()),
            other => Self::network(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_maps_to_status() {
        let err = HttpError::Status {
            status: 404,
            url: "https://example.com/x".to_string(),
            reason: "Not Found".to_string(),
        };
        assert!(err.to_string().contains("404"));
        assert_eq!(TransportError::from(err), TransportError::status(404, "Not Found"));
    }

    #[test]
    fn test_invalid_url_maps_to_network() {
        let source = url::Url::parse("not a url").unwrap_err();
        let err = HttpError::InvalidUrl {
            url: "not a url".to_string(),
            source,
        };
        assert!(matches!(
            TransportError::from(err),
            TransportError::Network { .. }
        ));
    }
}
