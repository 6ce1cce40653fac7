//! Tagged JSON requests over any [`HttpTransportPort`].

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use fetchline_core::{
    HttpTransportPort, IndicatorConfig, ObserverAdapter, RequestError, RequestRegistry,
    RequestSpec, TransportError,
};

/// Executes [`RequestSpec`]s and decodes JSON bodies.
///
/// Every request is driven through an [`ObserverAdapter`] bound to the
/// client's registry, so `registry.cancel(tag)` aborts it from anywhere.
///
/// ```ignore
/// let client = HttpClient::new(transport, Arc::clone(&registry));
/// let spec = RequestSpec::get("/users/42").tag("profile");
/// let user: User = client.request_json(&spec, &client.observer(&spec)).await?;
/// ```
#[derive(Clone)]
pub struct HttpClient {
    transport: Arc<dyn HttpTransportPort>,
    registry: Arc<RequestRegistry>,
}

impl HttpClient {
    pub fn new(transport: Arc<dyn HttpTransportPort>, registry: Arc<RequestRegistry>) -> Self {
        Self {
            transport,
            registry,
        }
    }

    pub const fn registry(&self) -> &Arc<RequestRegistry> {
        &self.registry
    }

    /// A fresh adapter for `spec`, tracked under its tag, without indicator.
    pub fn observer(&self, spec: &RequestSpec) -> ObserverAdapter {
        ObserverAdapter::new(spec.tag.clone(), Arc::clone(&self.registry))
    }

    /// A fresh adapter for `spec` that shows an indicator while in flight.
    pub fn observer_with_indicator(
        &self,
        spec: &RequestSpec,
        indicator: IndicatorConfig,
    ) -> ObserverAdapter {
        self.observer(spec).with_indicator(indicator)
    }

    /// Execute `spec` through `observer` and decode the body as `T`.
    pub async fn request_json<T>(
        &self,
        spec: &RequestSpec,
        observer: &ObserverAdapter,
    ) -> Result<T, RequestError>
    where
        T: DeserializeOwned,
    {
        validate(spec)?;
        observer.observe(self.fetch_json(spec)).await
    }

    /// Like [`request_json`](Self::request_json), cut short when `lifecycle`
    /// is cancelled.
    pub async fn request_json_within<T>(
        &self,
        spec: &RequestSpec,
        observer: &ObserverAdapter,
        lifecycle: &CancellationToken,
    ) -> Result<T, RequestError>
    where
        T: DeserializeOwned,
    {
        validate(spec)?;
        observer
            .observe_within(lifecycle, self.fetch_json(spec))
            .await
    }

    async fn fetch_json<T: DeserializeOwned>(&self, spec: &RequestSpec) -> Result<T, TransportError> {
        let response = self.transport.execute(spec).await?;
        let body = response.into_bytes().await?;
        serde_json::from_slice(&body).map_err(|e| TransportError::decode(e.to_string()))
    }
}

fn validate(spec: &RequestSpec) -> Result<(), RequestError> {
    if spec.url.trim().is_empty() {
        return Err(RequestError::invalid("request URL is empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use fetchline_core::{ObserverState, TransferResponse};
    use futures_util::StreamExt;
    use futures_util::stream;
    use serde::Deserialize;
    use std::time::Duration;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        id: u32,
        name: String,
    }

    /// Transport answering every request with a fixed body after a delay.
    struct FixedTransport {
        body: &'static [u8],
        delay: Duration,
    }

    #[async_trait]
    impl HttpTransportPort for FixedTransport {
        async fn execute(&self, _spec: &RequestSpec) -> Result<TransferResponse, TransportError> {
            tokio::time::sleep(self.delay).await;
            Ok(TransferResponse {
                status: 200,
                content_length: Some(self.body.len() as u64),
                partial: false,
                body: stream::iter(vec![Ok(Bytes::from_static(self.body))]).boxed(),
            })
        }
    }

    fn client(body: &'static [u8], delay: Duration) -> HttpClient {
        HttpClient::new(
            Arc::new(FixedTransport { body, delay }),
            Arc::new(RequestRegistry::new()),
        )
    }

    #[tokio::test]
    async fn test_decodes_json_and_clears_tag() {
        let client = client(br#"{"id":1,"name":"ann"}"#, Duration::ZERO);
        let spec = RequestSpec::get("/users/1").tag("profile");
        let observer = client.observer(&spec);

        let user: User = client.request_json(&spec, &observer).await.unwrap();

        assert_eq!(
            user,
            User {
                id: 1,
                name: "ann".into()
            }
        );
        assert_eq!(observer.state(), ObserverState::Completed);
        assert!(client.registry().is_empty());
    }

    #[tokio::test]
    async fn test_decode_failure_is_error() {
        let client = client(b"not json", Duration::ZERO);
        let spec = RequestSpec::get("/users/1").tag("profile");
        let observer = client.observer(&spec);

        let err = client
            .request_json::<User>(&spec, &observer)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RequestError::Transport(TransportError::Decode { .. })
        ));
        assert_eq!(observer.state(), ObserverState::Errored);
        assert!(client.registry().is_disposed("profile"));
    }

    #[tokio::test]
    async fn test_cancel_by_tag() {
        let client = client(b"{}", Duration::from_secs(60));
        let spec = RequestSpec::get("/slow").tag("slow");

        let task = {
            let client = client.clone();
            let spec = spec.clone();
            tokio::spawn(async move {
                let observer = client.observer(&spec);
                client.request_json::<serde_json::Value>(&spec, &observer).await
            })
        };

        while !client.registry().contains("slow") {
            tokio::task::yield_now().await;
        }
        client.registry().cancel("slow");

        let err = task.await.unwrap().unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_empty_url_is_rejected() {
        let client = client(b"{}", Duration::ZERO);
        let spec = RequestSpec::get("  ");
        let observer = client.observer(&spec);

        let err = client
            .request_json::<serde_json::Value>(&spec, &observer)
            .await
            .unwrap_err();

        assert!(matches!(err, RequestError::InvalidArgument(_)));
        assert_eq!(observer.state(), ObserverState::Created);
    }
}
