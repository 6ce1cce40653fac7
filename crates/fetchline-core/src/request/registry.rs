//! Tag-addressed registry of in-flight requests.
//!
//! # Design
//!
//! The registry is the single source of truth for "is this tag active".
//! It is an explicit, injectable value shared as `Arc<RequestRegistry>`;
//! there is no process-wide instance.
//!
//! All critical sections are short. The cancel capability of a handle is
//! always invoked after the map lock has been released, so a cancel
//! callback may safely call back into the registry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::handle::RequestHandle;

/// Concurrency-safe map from request tag to its cancellable handle.
#[derive(Debug, Default)]
pub struct RequestRegistry {
    entries: Mutex<HashMap<String, Arc<RequestHandle>>>,
}

impl RequestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<RequestHandle>>> {
        // A panic elsewhere must not make cancellation fail.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Track `handle` under `tag`.
    ///
    /// An empty tag means the request is untracked and this is a no-op.
    /// An existing entry is overwritten: the previous handle is dropped
    /// without being cancelled and can no longer be reached by tag.
    pub fn add(&self, tag: &str, handle: impl Into<Arc<RequestHandle>>) {
        if tag.is_empty() {
            return;
        }
        let previous = self.lock().insert(tag.to_owned(), handle.into());
        if let Some(previous) = previous {
            debug!(
                target: "fetchline.request",
                tag = %tag,
                orphan_disposed = previous.is_disposed(),
                "Overwrote registered request; previous handle is no longer cancellable by tag"
            );
        }
    }

    /// Forget the handle for `tag` without cancelling it.
    pub fn remove(&self, tag: &str) {
        if tag.is_empty() {
            return;
        }
        if let Some(handle) = self.lock().remove(tag) {
            handle.mark_disposed();
        }
    }

    /// Cancel the request tracked under `tag`.
    ///
    /// Absent or already-disposed tags are silently ignored.
    pub fn cancel(&self, tag: &str) {
        if tag.is_empty() {
            return;
        }
        let handle = self.lock().remove(tag);
        if let Some(handle) = handle {
            if handle.dispose() {
                debug!(target: "fetchline.request", tag = %tag, "Cancelled request");
            }
        }
    }

    /// Cancel every tracked request. Returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<_> = self.lock().drain().map(|(_, handle)| handle).collect();
        let cancelled = drained.iter().filter(|handle| handle.dispose()).count();
        if cancelled > 0 {
            debug!(target: "fetchline.request", cancelled, "Cancelled all requests");
        }
        cancelled
    }

    /// True when `tag` is not tracked or its handle is disposed.
    pub fn is_disposed(&self, tag: &str) -> bool {
        self.lock()
            .get(tag)
            .is_none_or(|handle| handle.is_disposed())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.lock().contains_key(tag)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counted(tag: &str, calls: &Arc<AtomicUsize>) -> RequestHandle {
        let calls = Arc::clone(calls);
        RequestHandle::new(tag, move || {
            calls.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn add_then_cancel_invokes_once_and_disposes() {
        let registry = RequestRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        registry.add("a", counted("a", &calls));

        assert!(!registry.is_disposed("a"));
        registry.cancel("a");

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(registry.is_disposed("a"));
        assert!(!registry.contains("a"));
    }

    #[test]
    fn cancel_twice_is_silent() {
        let registry = RequestRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        registry.add("a", counted("a", &calls));

        registry.cancel("a");
        registry.cancel("a");

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancel_unknown_tag_is_noop() {
        let registry = RequestRegistry::new();
        registry.cancel("missing");
        registry.cancel("");
        assert!(registry.is_empty());
        assert!(registry.is_disposed("missing"));
    }

    #[test]
    fn empty_tag_is_never_tracked() {
        let registry = RequestRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        registry.add("", counted("", &calls));

        assert!(registry.is_empty());
        registry.cancel("");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn overwrite_orphans_previous_handle() {
        let registry = RequestRegistry::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        registry.add("a", counted("a", &first));
        registry.add("a", counted("a", &second));
        assert_eq!(registry.len(), 1);

        registry.cancel("a");

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn remove_forgets_without_cancelling() {
        let registry = RequestRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        registry.add("a", counted("a", &calls));

        registry.remove("a");
        registry.cancel("a");

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(registry.is_disposed("a"));
    }

    #[test]
    fn cancel_all_reports_count() {
        let registry = RequestRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        for tag in ["a", "b", "c"] {
            registry.add(tag, counted(tag, &calls));
        }

        assert_eq!(registry.cancel_all(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(registry.is_empty());
        assert_eq!(registry.cancel_all(), 0);
    }

    #[test]
    fn cancel_callback_may_reenter_registry() {
        let registry = Arc::new(RequestRegistry::new());
        let inner = Arc::clone(&registry);
        registry.add(
            "outer",
            RequestHandle::new("outer", move || {
                // Would deadlock if invoked under the map lock.
                inner.cancel("other");
                assert!(inner.is_disposed("outer"));
            }),
        );

        registry.cancel("outer");
        assert!(registry.is_empty());
    }
}
