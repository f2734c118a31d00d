//! Establishment notifications and the presentation-side capabilities.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::expiry;

/// In-memory view of the established session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    /// When the session was last established (epoch millis).
    pub timestamp: i64,

    /// Confirmed identity, if any.
    pub username: Option<String>,
}

impl SessionSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.username.is_some()
    }
}

/// How an evaluation reached the established state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EstablishedFrom {
    /// A still-valid record in the store.
    Cache,
    /// A completed identity round trip.
    Server,
}

/// Event delivered once per evaluation that ends established.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Established {
    pub snapshot: SessionSnapshot,
    pub source: EstablishedFrom,

    /// Where the user should be sent back to after a fresh sign-in.
    pub resume_to: Option<String>,
}

/// Decide whether a fresh sign-in should return the user to the location
/// saved when sign-in was initiated.
///
/// Only a fresh-intent evaluation that ends authenticated qualifies, and
/// only while the saved intent is no older than the timeout.
pub fn resume_target(
    fresh_intent: bool,
    snapshot: &SessionSnapshot,
    signin_location: Option<&str>,
    signin_timestamp: Option<i64>,
    now: i64,
    timeout_ms: i64,
) -> Option<String> {
    if !fresh_intent || !snapshot.is_authenticated() {
        return None;
    }
    let location = signin_location.filter(|l| !l.is_empty())?;
    let saved_at = signin_timestamp?;
    expiry::within_window(now, saved_at, timeout_ms).then(|| location.to_string())
}

/// Receives establishment events. This is where a presentation adapter
/// toggles authenticated and unauthenticated UI.
pub trait SessionObserver: Send + Sync {
    fn on_established(&self, event: &Established);
}

impl<F> SessionObserver for F
where
    F: Fn(&Established) + Send + Sync,
{
    fn on_established(&self, event: &Established) {
        self(event)
    }
}

/// Shared observer handle.
pub type SharedObserver = Arc<dyn SessionObserver>;

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {
    fn on_established(&self, _event: &Established) {}
}

/// The current navigation location and the ability to move away from it.
pub trait Navigator: Send + Sync {
    /// Location of the current navigation.
    fn current_location(&self) -> String;

    /// Instruct the presentation layer to navigate to `location`.
    fn navigate(&self, location: &str);
}

/// Shared navigator handle.
pub type SharedNavigator = Arc<dyn Navigator>;

/// Navigator with a settable location. Navigation replaces the location.
#[derive(Debug, Default)]
pub struct FixedLocation {
    location: RwLock<String>,
}

impl FixedLocation {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: RwLock::new(location.into()),
        }
    }

    pub fn set(&self, location: impl Into<String>) {
        *self.location.write() = location.into();
    }
}

impl Navigator for FixedLocation {
    fn current_location(&self) -> String {
        self.location.read().clone()
    }

    fn navigate(&self, location: &str) {
        self.set(location);
    }
}
