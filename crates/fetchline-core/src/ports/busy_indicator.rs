//! Busy indicator port.
//!
//! A busy indicator is whatever the embedding application shows while a
//! request is in flight (a modal, a spinner, a status line). The core only
//! asks it to appear and disappear.

/// A visible "request in progress" indicator.
#[cfg_attr(test, mockall::automock)]
pub trait BusyIndicatorPort: Send {
    fn show(&self);
    fn hide(&self);
}

/// Builds a fresh indicator for each request.
pub trait BusyIndicatorFactory: Send + Sync {
    /// `cancelable` tells the indicator whether user dismissal should be offered.
    fn create(&self, cancelable: bool) -> Box<dyn BusyIndicatorPort>;
}

/// Indicator that shows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopIndicator;

impl BusyIndicatorPort for NoopIndicator {
    fn show(&self) {}

    fn hide(&self) {}
}

impl BusyIndicatorFactory for NoopIndicator {
    fn create(&self, _cancelable: bool) -> Box<dyn BusyIndicatorPort> {
        Box::new(Self)
    }
}
