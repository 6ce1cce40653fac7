//! Progress throttling.
//!
//! Rate-limits `on_progress` callbacks so a fast transfer with a small write
//! buffer does not flood the caller.

use std::time::{Duration, Instant};

/// Rate-limiter for progress callbacks.
///
/// A callback is allowed when the byte count moved forward and either
/// nothing was emitted yet or `min_interval` has elapsed since the last one.
#[derive(Debug)]
pub struct ProgressThrottle {
    last_emit: Option<Instant>,
    last_bytes: Option<u64>,
    min_interval: Duration,
}

impl ProgressThrottle {
    pub const fn new(min_interval: Duration) -> Self {
        Self {
            last_emit: None,
            last_bytes: None,
            min_interval,
        }
    }

    /// Whether progress at `downloaded` bytes should be reported now.
    pub fn should_emit(&mut self, downloaded: u64) -> bool {
        if self.last_bytes.is_some_and(|last| downloaded <= last) {
            return false;
        }
        let now = Instant::now();
        match self.last_emit {
            Some(last) if now.duration_since(last) < self.min_interval => false,
            _ => {
                self.last_emit = Some(now);
                self.last_bytes = Some(downloaded);
                true
            }
        }
    }

    /// Record an unthrottled emission (state changes are always reported).
    pub fn mark_emitted(&mut self, downloaded: u64) {
        self.last_emit = Some(Instant::now());
        self.last_bytes = Some(downloaded);
    }
}

impl Default for ProgressThrottle {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_progress_is_emitted() {
        let mut throttle = ProgressThrottle::new(Duration::from_secs(60));
        assert!(throttle.should_emit(10));
    }

    #[test]
    fn test_interval_is_respected() {
        let mut throttle = ProgressThrottle::new(Duration::from_millis(50));
        assert!(throttle.should_emit(10));
        assert!(!throttle.should_emit(20));

        std::thread::sleep(Duration::from_millis(60));
        assert!(throttle.should_emit(30));
    }

    #[test]
    fn test_no_progress_is_never_emitted() {
        let mut throttle = ProgressThrottle::new(Duration::ZERO);
        assert!(throttle.should_emit(10));
        assert!(!throttle.should_emit(10));
        assert!(!throttle.should_emit(5));
        assert!(throttle.should_emit(11));
    }

    #[test]
    fn test_mark_emitted_starts_new_interval() {
        let mut throttle = ProgressThrottle::new(Duration::from_secs(60));
        throttle.mark_emitted(0);
        assert!(!throttle.should_emit(100));
    }
}
