//! Session states derived from the stored record.
//!
//! The state is never stored; it is recomputed from the record, the
//! current location and the clock at every evaluation.

use crate::expiry;
use crate::record::SessionRecord;

/// Where an evaluation starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// The current location says a session was just created server-side.
    FreshIntent,

    /// No completed identity check is cached.
    Unestablished,

    /// The cached check is recent enough to trust.
    Valid,

    /// The cached check has outlived the timeout.
    Expired,
}

impl SessionState {
    /// Derive the state. The fresh-intent marker wins over anything stored.
    pub fn classify(record: &SessionRecord, now: i64, timeout_ms: i64, fresh_intent: bool) -> Self {
        if fresh_intent {
            SessionState::FreshIntent
        } else if !record.established {
            SessionState::Unestablished
        } else if expiry::is_expired(now, record.timestamp, timeout_ms) {
            SessionState::Expired
        } else {
            SessionState::Valid
        }
    }

    /// Whether the cached record must be flushed before revalidating.
    pub fn needs_flush(&self) -> bool {
        matches!(self, SessionState::FreshIntent | SessionState::Expired)
    }

    /// Whether the identity server must be asked.
    pub fn needs_revalidation(&self) -> bool {
        !matches!(self, SessionState::Valid)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::FreshIntent => "fresh-intent",
            SessionState::Unestablished => "unestablished",
            SessionState::Valid => "valid",
            SessionState::Expired => "expired",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: i64 = 180_000;

    fn established(timestamp: i64) -> SessionRecord {
        SessionRecord {
            established: true,
            timestamp,
            username: Some("bob".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_fresh_intent_overrides_valid_cache() {
        let state = SessionState::classify(&established(1_000), 2_000, TIMEOUT, true);
        assert_eq!(state, SessionState::FreshIntent);
        assert!(state.needs_flush());
        assert!(state.needs_revalidation());
    }

    #[test]
    fn test_unestablished() {
        let state = SessionState::classify(&SessionRecord::default(), 2_000, TIMEOUT, false);
        assert_eq!(state, SessionState::Unestablished);
        assert!(!state.needs_flush());
        assert!(state.needs_revalidation());
    }

    #[test]
    fn test_valid_and_expired() {
        let now = 1_000_000;
        let valid = SessionState::classify(&established(now - TIMEOUT), now, TIMEOUT, false);
        assert_eq!(valid, SessionState::Valid);
        assert!(!valid.needs_revalidation());

        let expired = SessionState::classify(&established(now - 200_000), now, TIMEOUT, false);
        assert_eq!(expired, SessionState::Expired);
        assert!(expired.needs_flush());
    }
}
