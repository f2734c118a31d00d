//! Cross-context revalidation lock.
//!
//! Contexts share no memory, only the store, so the lock is a flag in the
//! store plus the time it was taken. There is no compare-and-swap: two
//! contexts may both see the lock free and both revalidate. That race is
//! harmless because both write the same kind of outcome.
//!
//! A context that takes the lock and disappears mid round trip would block
//! everyone forever, so a lock older than `stale_after` is reclaimed. The
//! same holds for a lock dated more than `stale_after` ahead of the local
//! clock, otherwise a skewed or rewound clock could pin it indefinitely.

use std::time::Duration;

use crate::config::duration_millis;
use crate::expiry;
use crate::record::SessionRecord;

/// What a context should do about the lock it observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStatus {
    /// Nobody is revalidating.
    Free,

    /// Another context is revalidating; back off and retry.
    Held {
        /// When the lock was taken, if the writer recorded it.
        since: Option<i64>,
    },

    /// The lock outlived `stale_after`; its owner is presumed gone.
    Stale { since: i64 },
}

impl LockStatus {
    /// Whether this context may go ahead with its own round trip.
    pub fn may_proceed(&self) -> bool {
        !matches!(self, LockStatus::Held { .. })
    }
}

/// Timing rules for the lock.
#[derive(Debug, Clone, Copy)]
pub struct LockPolicy {
    /// Delay before re-evaluating while the lock is held.
    pub backoff: Duration,

    /// Age after which a held lock is reclaimed.
    pub stale_after: Duration,
}

impl LockPolicy {
    pub fn new(backoff: Duration, stale_after: Duration) -> Self {
        Self {
            backoff,
            stale_after,
        }
    }

    /// Classify the lock in `record` at time `now`.
    pub fn inspect(&self, record: &SessionRecord, now: i64) -> LockStatus {
        if !record.locked {
            return LockStatus::Free;
        }

        let stale_after = duration_millis(self.stale_after);
        match record.locked_at {
            Some(since)
                if expiry::is_expired(now, since, stale_after)
                    || expiry::is_expired(since, now, stale_after) =>
            {
                LockStatus::Stale { since }
            }
            since => LockStatus::Held { since },
        }
    }
}
