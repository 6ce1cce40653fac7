//! Public configuration for the HTTP transport.

use std::time::Duration;

/// Configuration for [`ReqwestTransport`](crate::ReqwestTransport).
///
/// # Example
///
/// ```
/// use fetchline_http::HttpConfig;
/// use std::time::Duration;
///
/// let config = HttpConfig::new()
///     .with_base_url("https://api.example.com/v1")
///     .with_timeout(Duration::from_secs(10))
///     .with_header("Accept", "application/json");
/// ```
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Prefix for relative request URLs
    pub(crate) base_url: Option<String>,
    pub(crate) user_agent: String,
    /// Whole-request timeout; `None` leaves long downloads unbounded
    pub(crate) timeout: Option<Duration>,
    pub(crate) connect_timeout: Duration,
    /// Headers added to every request before per-request headers
    pub(crate) default_headers: Vec<(String, String)>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            user_agent: concat!("fetchline/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: None,
            connect_timeout: Duration::from_secs(15),
            default_headers: Vec::new(),
        }
    }
}

impl HttpConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_optional_base_url(mut self, url: Option<String>) -> Self {
        self.base_url = url;
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set a whole-request timeout. Defaults to none.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Defaults to 15 seconds.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HttpConfig::new();
        assert!(config.base_url.is_none());
        assert!(config.user_agent.starts_with("fetchline/"));
        assert!(config.timeout.is_none());
        assert!(config.default_headers.is_empty());
    }

    #[test]
    fn test_builder_pattern() {
        let config = HttpConfig::new()
            .with_base_url("https://api.example.com")
            .with_user_agent("test-agent")
            .with_timeout(Duration::from_secs(5))
            .with_header("X-Api-Key", "k");

        assert_eq!(config.base_url(), Some("https://api.example.com"));
        assert_eq!(config.user_agent, "test-agent");
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.default_headers, vec![("X-Api-Key".into(), "k".into())]);
    }
}
