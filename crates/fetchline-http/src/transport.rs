//! reqwest implementation of the transport port.

use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RANGE};
use reqwest::{Method, StatusCode};
use tracing::debug;
use url::Url;

use fetchline_core::{HttpMethod, HttpTransportPort, RequestSpec, TransferResponse, TransportError};

use crate::config::HttpConfig;
use crate::error::{HttpError, HttpResult};

/// Production transport backed by a shared `reqwest::Client`.
///
/// The response body is streamed; nothing is buffered here.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl ReqwestTransport {
    pub fn new(config: &HttpConfig) -> HttpResult<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout)
            .default_headers(header_map(&config.default_headers)?);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.clone(),
        })
    }

    /// Absolute URLs are used as-is; anything else is appended to the base URL.
    fn resolve_url(&self, url: &str) -> HttpResult<Url> {
        let invalid = |source| HttpError::InvalidUrl {
            url: url.to_string(),
            source,
        };
        match Url::parse(url) {
            Ok(parsed) => Ok(parsed),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = self
                    .base_url
                    .as_deref()
                    .ok_or_else(|| invalid(url::ParseError::RelativeUrlWithoutBase))?;
                let joined = format!(
                    "{}/{}",
                    base.trim_end_matches('/'),
                    url.trim_start_matches('/')
                );
                Url::parse(&joined).map_err(invalid)
            }
            Err(e) => Err(invalid(e)),
        }
    }

    async fn send(&self, spec: &RequestSpec) -> HttpResult<TransferResponse> {
        let url = self.resolve_url(&spec.url)?;
        let method = match spec.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
        };

        let mut request = self
            .client
            .request(method, url.clone())
            .headers(header_map(&spec.headers)?);
        if !spec.query.is_empty() {
            request = request.query(&spec.query);
        }
        if let Some(body) = &spec.json_body {
            request = request.json(body);
        }
        if let Some(offset) = spec.range_start {
            request = request.header(RANGE, format!("bytes={offset}-"));
        }

        debug!(
            target: "fetchline.http",
            tag = %spec.tag,
            method = spec.method.as_str(),
            url = %url,
            range_start = ?spec.range_start,
            "Sending request"
        );

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status {
                status: status.as_u16(),
                url: url.to_string(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let content_length = response.content_length();
        let body = response
            .bytes_stream()
            .map_err(|e| TransportError::network(e.to_string()))
            .boxed();

        Ok(TransferResponse {
            status: status.as_u16(),
            content_length,
            partial: status == StatusCode::PARTIAL_CONTENT,
            body,
        })
    }
}

#[async_trait]
impl HttpTransportPort for ReqwestTransport {
    async fn execute(&self, spec: &RequestSpec) -> Result<TransferResponse, TransportError> {
        Ok(self.send(spec).await?)
    }
}

fn header_map(headers: &[(String, String)]) -> HttpResult<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let invalid = || HttpError::InvalidHeader { name: name.clone() };
        let name_h = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
        let value_h = HeaderValue::from_str(value).map_err(|_| invalid())?;
        map.append(name_h, value_h);
    }
    Ok(map)
}
