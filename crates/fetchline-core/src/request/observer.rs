//! Per-request observer binding lifecycle events to the registry.
//!
//! # Design
//!
//! One [`ObserverAdapter`] serves exactly one logical request. The adapter
//! moves through `Created → Subscribed → {Completed | Errored | Cancelled}`:
//!
//! - `on_subscribe` shows the busy indicator and registers the tag
//! - `on_next` removes the tag (the first value is the success point)
//! - `on_error` hides the indicator and removes the tag
//! - `on_complete` hides the indicator and, when the tag is still live,
//!   treats the completion as a lifecycle truncation and cancels
//!
//! [`ObserverAdapter::observe`] and [`ObserverAdapter::observe_within`] drive a
//! single-value future through these events, so callers never invoke them by
//! hand unless they integrate a custom transport.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::errors::RequestError;
use super::handle::RequestHandle;
use super::registry::RequestRegistry;
use crate::ports::{BusyIndicatorFactory, BusyIndicatorPort};

/// Lifecycle state of an [`ObserverAdapter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverState {
    Created,
    Subscribed,
    Completed,
    Errored,
    Cancelled,
}

impl ObserverState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Errored | Self::Cancelled)
    }
}

/// Busy indicator settings for one request.
#[derive(Clone, Default)]
pub struct IndicatorConfig {
    pub show_indicator: bool,
    /// Whether the user may dismiss the indicator to cancel the request.
    pub cancelable: bool,
    pub factory: Option<Arc<dyn BusyIndicatorFactory>>,
}

impl IndicatorConfig {
    /// No indicator.
    pub fn none() -> Self {
        Self::default()
    }

    /// Show a non-cancelable indicator built by `factory`.
    pub fn new(factory: Arc<dyn BusyIndicatorFactory>) -> Self {
        Self {
            show_indicator: true,
            cancelable: false,
            factory: Some(factory),
        }
    }

    #[must_use]
    pub const fn with_cancelable(mut self, cancelable: bool) -> Self {
        self.cancelable = cancelable;
        self
    }
}

impl fmt::Debug for IndicatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndicatorConfig")
            .field("show_indicator", &self.show_indicator)
            .field("cancelable", &self.cancelable)
            .field("factory", &self.factory.is_some())
            .finish()
    }
}

/// Callback shim tying one request to its tag and busy indicator.
pub struct ObserverAdapter {
    tag: String,
    registry: Arc<RequestRegistry>,
    config: IndicatorConfig,
    indicator: Mutex<Option<Box<dyn BusyIndicatorPort>>>,
    handle: Mutex<Option<Arc<RequestHandle>>>,
    state: Mutex<ObserverState>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ObserverAdapter {
    /// Create an adapter for a request tracked under `tag`.
    ///
    /// An empty tag makes the request untracked: it can still be cancelled
    /// from its indicator but never by tag.
    pub fn new(tag: impl Into<String>, registry: Arc<RequestRegistry>) -> Self {
        Self {
            tag: tag.into(),
            registry,
            config: IndicatorConfig::none(),
            indicator: Mutex::new(None),
            handle: Mutex::new(None),
            state: Mutex::new(ObserverState::Created),
        }
    }

    #[must_use]
    pub fn with_indicator(mut self, config: IndicatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn state(&self) -> ObserverState {
        *lock(&self.state)
    }

    pub fn registry(&self) -> &Arc<RequestRegistry> {
        &self.registry
    }

    /// Move to `next` unless a terminal state has already been reached.
    fn transition(&self, next: ObserverState) -> bool {
        let mut state = lock(&self.state);
        if state.is_terminal() {
            return false;
        }
        *state = next;
        true
    }

    fn show_indicator(&self) {
        if !self.config.show_indicator {
            return;
        }
        let Some(factory) = self.config.factory.as_ref() else {
            return;
        };
        let indicator = factory.create(self.config.cancelable);
        indicator.show();
        *lock(&self.indicator) = Some(indicator);
    }

    /// Hide the indicator. Only the first call has an effect.
    fn hide_indicator(&self) {
        let indicator = lock(&self.indicator).take();
        if let Some(indicator) = indicator {
            indicator.hide();
        }
    }

    /// The request started; `cancel` aborts the in-flight work.
    pub fn on_subscribe(&self, cancel: impl FnOnce() + Send + 'static) {
        if !self.transition(ObserverState::Subscribed) {
            return;
        }
        let handle = Arc::new(RequestHandle::new(self.tag.clone(), cancel));
        *lock(&self.handle) = Some(Arc::clone(&handle));
        self.show_indicator();
        self.registry.add(&self.tag, handle);
        trace!(target: "fetchline.request", tag = %self.tag, "Request subscribed");
    }

    /// The request produced its value.
    pub fn on_next(&self) {
        self.registry.remove(&self.tag);
        if let Some(handle) = lock(&self.handle).as_ref() {
            handle.mark_disposed();
        }
    }

    /// The request failed.
    pub fn on_error(&self, error: &dyn std::error::Error) {
        self.hide_indicator();
        self.registry.remove(&self.tag);
        if let Some(handle) = lock(&self.handle).as_ref() {
            handle.mark_disposed();
        }
        if self.transition(ObserverState::Errored) {
            debug!(target: "fetchline.request", tag = %self.tag, error = %error, "Request failed");
        }
    }

    /// The request stream ended.
    ///
    /// Completion while the tag is still registered means the stream was cut
    /// short by its owning lifecycle, so the request is cancelled.
    pub fn on_complete(&self) {
        self.hide_indicator();
        if self.registry.is_disposed(&self.tag) {
            self.transition(ObserverState::Completed);
        } else {
            self.cancel();
        }
    }

    /// Cancel the request by tag.
    ///
    /// Untracked requests (empty tag) are not affected.
    pub fn cancel(&self) {
        if self.tag.is_empty() {
            return;
        }
        self.registry.cancel(&self.tag);
        self.hide_indicator();
        self.transition(ObserverState::Cancelled);
    }

    /// The user dismissed a cancelable indicator.
    pub fn on_indicator_dismissed(&self) {
        if !self.config.cancelable {
            return;
        }
        let handle = lock(&self.handle).clone();
        if let Some(handle) = handle {
            if handle.dispose() {
                debug!(target: "fetchline.request", tag = %self.tag, "Request dismissed from indicator");
            }
        }
        self.hide_indicator();
        self.transition(ObserverState::Cancelled);
    }

    /// Drive a single-value request through the adapter.
    pub async fn observe<T, E, F>(&self, request: F) -> Result<T, RequestError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<RequestError> + std::error::Error,
    {
        self.drive(None, request).await
    }

    /// Like [`observe`](Self::observe), but the request is cut short when
    /// `lifecycle` is cancelled (its owner went away).
    pub async fn observe_within<T, E, F>(
        &self,
        lifecycle: &CancellationToken,
        request: F,
    ) -> Result<T, RequestError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<RequestError> + std::error::Error,
    {
        self.drive(Some(lifecycle), request).await
    }

    async fn drive<T, E, F>(
        &self,
        lifecycle: Option<&CancellationToken>,
        request: F,
    ) -> Result<T, RequestError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<RequestError> + std::error::Error,
    {
        let token = CancellationToken::new();
        let cancel = token.clone();
        self.on_subscribe(move || cancel.cancel());

        let lifecycle_ended = async {
            match lifecycle {
                Some(lifecycle) => lifecycle.cancelled().await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            () = token.cancelled() => {
                self.hide_indicator();
                self.transition(ObserverState::Cancelled);
                Err(RequestError::Cancelled)
            }
            () = lifecycle_ended => {
                // Truncated stream: completes without a value.
                if self.tag.is_empty() {
                    self.hide_indicator();
                    self.transition(ObserverState::Cancelled);
                } else {
                    self.on_complete();
                }
                Err(RequestError::Cancelled)
            }
            result = request => match result {
                Ok(value) => {
                    self.on_next();
                    self.on_complete();
                    Ok(value)
                }
                Err(error) => {
                    self.on_error(&error);
                    Err(error.into())
                }
            },
        }
    }
}

impl fmt::Debug for ObserverAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverAdapter")
            .field("tag", &self.tag)
            .field("state", &self.state())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
