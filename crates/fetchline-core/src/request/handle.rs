//! Cancellable handle for a single in-flight operation.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;

/// Boxed cancel capability. Consumed on first use.
type CancelFn = Box<dyn FnOnce() + Send + 'static>;

/// The live, cancellable representation of an in-flight operation.
///
/// A handle is created when a request subscribes and is either disposed
/// by an explicit cancel or marked disposed when the request finishes on
/// its own. The cancel capability runs at most once no matter how many
/// threads race on [`RequestHandle::dispose`].
pub struct RequestHandle {
    tag: String,
    cancel_fn: Mutex<Option<CancelFn>>,
    disposed: AtomicBool,
}

impl RequestHandle {
    /// Create a handle from an arbitrary cancel capability.
    pub fn new(tag: impl Into<String>, cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            tag: tag.into(),
            cancel_fn: Mutex::new(Some(Box::new(cancel))),
            disposed: AtomicBool::new(false),
        }
    }

    /// Create a handle that cancels a [`CancellationToken`].
    pub fn from_token(tag: impl Into<String>, token: CancellationToken) -> Self {
        Self::new(tag, move || token.cancel())
    }

    /// Create a handle that aborts a spawned tokio task.
    pub fn from_abort_handle(tag: impl Into<String>, handle: AbortHandle) -> Self {
        Self::new(tag, move || handle.abort())
    }

    /// The tag this handle was registered under.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Whether the handle has been cancelled or marked finished.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Cancel the underlying operation.
    ///
    /// Returns `true` if this call performed the cancellation, `false` if the
    /// handle was already disposed.
    pub fn dispose(&self) -> bool {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return false;
        }
        let cancel = self
            .cancel_fn
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(cancel) = cancel {
            cancel();
        }
        true
    }

    /// Mark the handle finished without cancelling anything.
    ///
    /// Drops the cancel capability so a later `dispose` is a no-op.
    pub fn mark_disposed(&self) {
        self.disposed.store(true, Ordering::Release);
        self.cancel_fn
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

impl fmt::Debug for RequestHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHandle")
            .field("tag", &self.tag)
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}
