//! HTTP transport port.
//!
//! The core never talks HTTP itself. It describes a request as a
//! [`RequestSpec`] and receives a [`TransferResponse`] whose body is a byte
//! stream, so the same port serves small JSON calls and multi-gigabyte
//! downloads.
//!
//! Dropping the body stream cancels the underlying transfer.

use std::fmt;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use thiserror::Error;

/// Streaming response body.
pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

impl HttpMethod {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// Description of one HTTP request.
///
/// `url` is either absolute or a path joined onto the transport's base URL.
///
/// ```ignore
/// let spec = RequestSpec::get("/users")
///     .tag("user-list")
///     .query("page", "2")
///     .header("Accept", "application/json");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestSpec {
    pub method: HttpMethod,
    pub url: String,
    /// Registry tag; empty means untracked.
    pub tag: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub json_body: Option<serde_json::Value>,
    /// Ask for the body starting at this byte offset.
    pub range_start: Option<u64>,
}

impl RequestSpec {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.json_body = Some(body);
        self
    }

    /// Request the body from `offset` onwards. An offset of zero is a plain request.
    #[must_use]
    pub const fn range_from(mut self, offset: u64) -> Self {
        self.range_start = if offset == 0 { None } else { Some(offset) };
        self
    }
}

/// Response head plus a streaming body.
pub struct TransferResponse {
    pub status: u16,
    /// Length of *this* body, when announced.
    pub content_length: Option<u64>,
    /// Whether the server honoured the requested range (`206`).
    pub partial: bool,
    pub body: ByteStream,
}

impl TransferResponse {
    /// Full size of the resource given the offset that was requested.
    ///
    /// Unknown when the announced length would overflow.
    #[must_use]
    pub fn total_length(&self, requested_offset: u64) -> Option<u64> {
        if self.partial {
            self.content_length
                .and_then(|len| len.checked_add(requested_offset))
        } else {
            self.content_length
        }
    }

    /// Collect the whole body into memory.
    pub async fn into_bytes(mut self) -> Result<Bytes, TransportError> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }
}

impl fmt::Debug for TransferResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferResponse")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .field("partial", &self.partial)
            .finish_non_exhaustive()
    }
}

/// Transport-level failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Connection, TLS, timeout or mid-body read failure.
    #[error("Network error: {message}")]
    Network { message: String },

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The body could not be decoded into the expected type.
    #[error("Decode error: {message}")]
    Decode { message: String },
}

impl TransportError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Whether repeating the same request may succeed. Nothing retries
    /// automatically; this is advice for callers.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Status { status, .. } => *status == 408 || *status == 429 || *status >= 500,
            Self::Decode { .. } => false,
        }
    }
}

/// Port for executing HTTP requests.
#[async_trait]
pub trait HttpTransportPort: Send + Sync {
    /// Send `spec` and return once the response head has arrived.
    ///
    /// Non-success statuses are returned as [`TransportError::Status`].
    async fn execute(&self, spec: &RequestSpec) -> Result<TransferResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    #[test]
    fn test_builder_collects_parts() {
        let spec = RequestSpec::post("/login")
            .tag("login")
            .header("X-Client", "cli")
            .query("lang", "en")
            .json(serde_json::json!({ "user": "a" }));

        assert_eq!(spec.method, HttpMethod::Post);
        assert_eq!(spec.tag, "login");
        assert_eq!(spec.headers, vec![("X-Client".into(), "cli".into())]);
        assert_eq!(spec.query, vec![("lang".into(), "en".into())]);
        assert!(spec.json_body.is_some());
    }

    #[test]
    fn test_zero_range_is_plain_request() {
        assert_eq!(RequestSpec::get("/f").range_from(0).range_start, None);
        assert_eq!(RequestSpec::get("/f").range_from(400).range_start, Some(400));
    }

    #[test]
    fn test_total_length() {
        let partial = TransferResponse {
            status: 206,
            content_length: Some(600),
            partial: true,
            body: stream::empty().boxed(),
        };
        assert_eq!(partial.total_length(400), Some(1000));

        let full = TransferResponse {
            status: 200,
            content_length: Some(1000),
            partial: false,
            body: stream::empty().boxed(),
        };
        assert_eq!(full.total_length(400), Some(1000));
    }

    #[test]
    fn test_total_length_overflow_is_unknown() {
        let huge = TransferResponse {
            status: 206,
            content_length: Some(u64::MAX),
            partial: true,
            body: stream::empty().boxed(),
        };
        assert_eq!(huge.total_length(400), None);
        assert_eq!(huge.total_length(0), Some(u64::MAX));
    }

    #[test]
    fn test_retryable() {
        assert!(TransportError::network("reset").is_retryable());
        assert!(TransportError::status(503, "busy").is_retryable());
        assert!(!TransportError::status(404, "missing").is_retryable());
        assert!(!TransportError::decode("bad json").is_retryable());
    }

    #[tokio::test]
    async fn test_into_bytes_concatenates_chunks() {
        let response = TransferResponse {
            status: 200,
            content_length: None,
            partial: false,
            body: stream::iter(vec![Ok(Bytes::from_static(b"ab")), Ok(Bytes::from_static(b"cd"))])
                .boxed(),
        };
        assert_eq!(response.into_bytes().await.unwrap(), Bytes::from_static(b"abcd"));
    }
}
