//! Wall-clock time and expiry arithmetic.
//!
//! Store timestamps are epoch milliseconds written by whichever context
//! last revalidated, so ages are computed against wall-clock time rather
//! than a monotonic `Instant`.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of the current time in epoch milliseconds.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now_millis(&self) -> i64;
}

/// Shared clock handle.
pub type SharedClock = Arc<dyn Clock>;

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(now_millis),
        }
    }

    pub fn set(&self, now_millis: i64) {
        self.now.store(now_millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Age of `timestamp` at `now`. Negative when the timestamp lies in the
/// future (clock skew between contexts).
pub fn age(now: i64, timestamp: i64) -> i64 {
    now.saturating_sub(timestamp)
}

/// Whether a record established at `timestamp` has outlived `timeout_ms`.
pub fn is_expired(now: i64, timestamp: i64, timeout_ms: i64) -> bool {
    age(now, timestamp) > timeout_ms
}

/// Whether `timestamp` is still inside the `window_ms` ending at `now`.
pub fn within_window(now: i64, timestamp: i64, window_ms: i64) -> bool {
    !is_expired(now, timestamp, window_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_is_not_expired() {
        assert!(!is_expired(181_000, 1_000, 180_000));
        assert!(is_expired(181_001, 1_000, 180_000));
        assert!(within_window(181_000, 1_000, 180_000));
    }

    #[test]
    fn test_never_established_timestamp_is_expired() {
        assert!(is_expired(1_700_000_000_000, 0, 180_000));
    }

    #[test]
    fn test_future_timestamp_is_fresh() {
        assert!(age(1_000, 5_000) < 0);
        assert!(!is_expired(1_000, 5_000, 180_000));
    }

    #[test]
    fn test_age_saturates() {
        assert_eq!(age(i64::MIN, 1), i64::MIN);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(1_000);
        clock.advance(500);
        assert_eq!(clock.now_millis(), 1_500);
        clock.set(42);
        assert_eq!(clock.now_millis(), 42);
    }

    #[test]
    fn test_system_clock_is_epoch_millis() {
        // 2020-01-01T00:00:00Z
        assert!(SystemClock.now_millis() > 1_577_836_800_000);
    }
}
