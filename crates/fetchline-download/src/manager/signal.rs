//! Per-transfer stop signal and per-session coordination slot.

use std::sync::{Mutex, PoisonError};

use tokio_util::sync::CancellationToken;

/// Why a transfer was asked to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StopIntent {
    /// Keep the partial file and persisted offset.
    Pause,
    /// The session is being removed; persist nothing.
    Remove { delete_file: bool },
}

/// Cancellation token plus the reason it was cancelled.
#[derive(Debug, Default)]
pub(crate) struct StopSignal {
    token: CancellationToken,
    intent: Mutex<Option<StopIntent>>,
}

impl StopSignal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Ask the transfer to stop. A removal is never downgraded to a pause.
    pub(crate) fn stop(&self, intent: StopIntent) {
        {
            let mut current = self.intent.lock().unwrap_or_else(PoisonError::into_inner);
            if !matches!(*current, Some(StopIntent::Remove { .. })) {
                *current = Some(intent);
            }
        }
        self.token.cancel();
    }

    pub(crate) fn intent(&self) -> Option<StopIntent> {
        *self.intent.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    pub(crate) async fn stopped(&self) {
        self.token.cancelled().await;
    }
}

/// Coordination state shared by every transfer of one session id.
///
/// `transfer` serializes file writers. `generation` gates persistence:
/// removing a session bumps it, and a transfer only writes to the store
/// while the generation it started with is still current.
#[derive(Debug, Default)]
pub(crate) struct SessionSlot {
    pub(crate) transfer: tokio::sync::Mutex<()>,
    pub(crate) generation: tokio::sync::Mutex<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_is_not_downgraded() {
        let signal = StopSignal::new();
        signal.stop(StopIntent::Remove { delete_file: true });
        signal.stop(StopIntent::Pause);

        assert!(signal.is_stopped());
        assert_eq!(signal.intent(), Some(StopIntent::Remove { delete_file: true }));
    }

    #[test]
    fn pause_upgrades_to_remove() {
        let signal = StopSignal::new();
        assert_eq!(signal.intent(), None);

        signal.stop(StopIntent::Pause);
        signal.stop(StopIntent::Remove { delete_file: false });

        assert_eq!(signal.intent(), Some(StopIntent::Remove { delete_file: false }));
    }
}
